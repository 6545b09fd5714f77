//! World and chunk serialization and disk I/O
//!
//! Both file kinds are a 4-byte magic followed by an LZ4 block (size
//! prepended) holding an rkyv archive. The archive carries a format version
//! and the grid dimensions next to the flat voxel buffer, which is stored in
//! [`VoxelGrid`] index order.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rkyv::{Archive, Deserialize, Serialize};
use rkyv::util::AlignedVec;
use thiserror::Error;

use crate::voxel::chunk::{Chunk, ChunkCoord};
use crate::voxel::grid::{BlockId, VoxelGrid};
use crate::voxel::world::{MonolithicWorld, MAX_WORLD_SIZE};

/// Magic prefix of monolithic world saves
pub const WORLD_MAGIC: [u8; 4] = *b"CBXW";

/// Magic prefix of single-chunk files
pub const CHUNK_MAGIC: [u8; 4] = *b"CBXC";

/// Current on-disk format version
pub const FORMAT_VERSION: u32 = 1;

/// File extension for chunk files
pub const CHUNK_FILE_EXTENSION: &str = "cbc";

/// Upper bound on a decompressed archive; larger declared sizes are corrupt
const MAX_ARCHIVE_BYTES: usize = MAX_WORLD_SIZE * MAX_WORLD_SIZE * MAX_WORLD_SIZE + 4096;

/// Errors raised when a save is missing, damaged or does not fit the target world
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("save file {0} not found")]
    Missing(PathBuf),

    #[error("save file is truncated")]
    Truncated,

    #[error("not a save file of the expected kind")]
    BadMagic,

    #[error("unsupported save format version {0}")]
    UnsupportedVersion(u32),

    #[error("save data is corrupt: {0}")]
    Corrupt(String),

    #[error("save holds {found} voxels, expected {expected}")]
    SizeMismatch { expected: usize, found: usize },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Metadata stored alongside a monolithic world
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldHeader {
    pub version: u32,
    pub world_size: usize,
    pub chunk_size: usize,
}

/// Serializable world data
#[derive(Archive, Deserialize, Serialize)]
struct WorldFileData {
    version: u32,
    world_size: u32,
    chunk_size: u32,
    voxels: Vec<BlockId>,
}

/// Serializable chunk data
#[derive(Archive, Deserialize, Serialize)]
struct ChunkFileData {
    version: u32,
    x: i32,
    y: i32,
    z: i32,
    size: u32,
    voxels: Vec<BlockId>,
}

/// Prefix an rkyv archive with `magic` and LZ4-compress it
fn frame(magic: [u8; 4], archive: &[u8]) -> Vec<u8> {
    let compressed = lz4_flex::compress_prepend_size(archive);
    let mut out = Vec::with_capacity(magic.len() + compressed.len());
    out.extend_from_slice(&magic);
    out.extend_from_slice(&compressed);
    out
}

fn encode_world(data: &WorldFileData) -> Result<Vec<u8>, PersistenceError> {
    let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(data)
        .map_err(|e| PersistenceError::Corrupt(e.to_string()))?;
    Ok(frame(WORLD_MAGIC, &bytes))
}

fn encode_chunk(data: &ChunkFileData) -> Result<Vec<u8>, PersistenceError> {
    let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(data)
        .map_err(|e| PersistenceError::Corrupt(e.to_string()))?;
    Ok(frame(CHUNK_MAGIC, &bytes))
}

/// Check the magic and decompress into an aligned buffer ready for rkyv access
fn unpack(magic: [u8; 4], data: &[u8]) -> Result<AlignedVec, PersistenceError> {
    if data.len() < magic.len() + 4 {
        return Err(PersistenceError::Truncated);
    }
    let (head, body) = data.split_at(magic.len());
    if head != magic {
        return Err(PersistenceError::BadMagic);
    }

    let declared = u32::from_le_bytes([body[0], body[1], body[2], body[3]]) as usize;
    if declared > MAX_ARCHIVE_BYTES {
        return Err(PersistenceError::Corrupt(format!("declared size {} is too large", declared)));
    }

    let decompressed = lz4_flex::decompress_size_prepended(body)
        .map_err(|e| PersistenceError::Corrupt(format!("LZ4 decompression failed: {}", e)))?;

    let mut aligned: AlignedVec = AlignedVec::with_capacity(decompressed.len());
    aligned.extend_from_slice(&decompressed);
    Ok(aligned)
}

/// Compress a monolithic world into the on-disk byte format
pub fn compress_world(world: &MonolithicWorld, chunk_size: usize) -> Result<Vec<u8>, PersistenceError> {
    let data = WorldFileData {
        version: FORMAT_VERSION,
        world_size: world.size() as u32,
        chunk_size: chunk_size as u32,
        voxels: world.grid().as_slice().to_vec(),
    };
    encode_world(&data)
}

/// Decode bytes produced by [`compress_world`]
pub fn decompress_world(data: &[u8]) -> Result<(MonolithicWorld, WorldHeader), PersistenceError> {
    let aligned = unpack(WORLD_MAGIC, data)?;
    let archived = rkyv::access::<ArchivedWorldFileData, rkyv::rancor::Error>(&aligned)
        .map_err(|e| PersistenceError::Corrupt(e.to_string()))?;
    let file: WorldFileData = rkyv::deserialize::<WorldFileData, rkyv::rancor::Error>(archived)
        .map_err(|e| PersistenceError::Corrupt(e.to_string()))?;

    if file.version != FORMAT_VERSION {
        return Err(PersistenceError::UnsupportedVersion(file.version));
    }

    let world_size = file.world_size as usize;
    let expected = world_size.checked_pow(3).unwrap_or(usize::MAX);
    let found = file.voxels.len();
    if found != expected {
        return Err(PersistenceError::SizeMismatch { expected, found });
    }
    let grid = VoxelGrid::from_voxels(world_size, file.voxels)
        .ok_or(PersistenceError::SizeMismatch { expected, found })?;

    let header = WorldHeader {
        version: file.version,
        world_size,
        chunk_size: file.chunk_size as usize,
    };
    Ok((MonolithicWorld::from_grid(grid), header))
}

/// Save a monolithic world (compressed), creating parent directories
pub fn save_world(path: &Path, world: &MonolithicWorld, chunk_size: usize) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let compressed = compress_world(world, chunk_size)?;
    fs::write(path, &compressed)?;

    log::info!(
        "Saved {}³ world to {} ({} bytes)",
        world.size(),
        path.display(),
        compressed.len()
    );
    Ok(())
}

/// Load a monolithic world from disk
pub fn load_world(path: &Path) -> Result<(MonolithicWorld, WorldHeader), PersistenceError> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(PersistenceError::Missing(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    let (world, header) = decompress_world(&data)?;
    log::info!("Loaded {}³ world from {}", header.world_size, path.display());
    Ok((world, header))
}

/// Replace `world`'s voxel buffer with the save at `path`.
///
/// The save must hold exactly `world.size()³` voxels; on any error `world` is
/// left unchanged.
pub fn load_world_into(world: &mut MonolithicWorld, path: &Path) -> Result<WorldHeader, PersistenceError> {
    let (loaded, header) = load_world(path)?;
    let expected = world.grid().len();
    let found = loaded.grid().len();
    if loaded.size() != world.size() {
        return Err(PersistenceError::SizeMismatch { expected, found });
    }

    world.replace_grid(loaded.into_grid());
    Ok(header)
}

/// Compress a single chunk
pub fn compress_chunk(chunk: &Chunk) -> Result<Vec<u8>, PersistenceError> {
    let position = chunk.position();
    let data = ChunkFileData {
        version: FORMAT_VERSION,
        x: position.x,
        y: position.y,
        z: position.z,
        size: chunk.size() as u32,
        voxels: chunk.voxels().as_slice().to_vec(),
    };
    encode_chunk(&data)
}

/// Decode bytes produced by [`compress_chunk`]
pub fn decompress_chunk(data: &[u8]) -> Result<Chunk, PersistenceError> {
    let aligned = unpack(CHUNK_MAGIC, data)?;
    let archived = rkyv::access::<ArchivedChunkFileData, rkyv::rancor::Error>(&aligned)
        .map_err(|e| PersistenceError::Corrupt(e.to_string()))?;
    let file: ChunkFileData = rkyv::deserialize::<ChunkFileData, rkyv::rancor::Error>(archived)
        .map_err(|e| PersistenceError::Corrupt(e.to_string()))?;

    if file.version != FORMAT_VERSION {
        return Err(PersistenceError::UnsupportedVersion(file.version));
    }

    let size = file.size as usize;
    let expected = size.checked_pow(3).unwrap_or(usize::MAX);
    let found = file.voxels.len();
    if found != expected {
        return Err(PersistenceError::SizeMismatch { expected, found });
    }
    let grid = VoxelGrid::from_voxels(size, file.voxels)
        .ok_or(PersistenceError::SizeMismatch { expected, found })?;

    Ok(Chunk::from_grid(ChunkCoord::new(file.x, file.y, file.z), grid))
}

/// Get the file path for a chunk
pub fn chunk_path(base_dir: &Path, coord: ChunkCoord) -> PathBuf {
    // Group by the vertical axis to keep directories small.
    // Format: base_dir/z_{z}/chunk_{x}_{y}_{z}.cbc
    base_dir
        .join(format!("z_{}", coord.z))
        .join(format!("chunk_{}_{}_{}.{}", coord.x, coord.y, coord.z, CHUNK_FILE_EXTENSION))
}

/// Save a chunk to disk (compressed)
pub fn save_chunk(base_dir: &Path, chunk: &Chunk) -> Result<(), PersistenceError> {
    let path = chunk_path(base_dir, chunk.position());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, compress_chunk(chunk)?)?;
    log::trace!("Saved chunk {:?} to {}", chunk.position(), path.display());
    Ok(())
}

/// Load a chunk from disk; `Ok(None)` if no file exists for `coord`
pub fn load_chunk(base_dir: &Path, coord: ChunkCoord) -> Result<Option<Chunk>, PersistenceError> {
    let path = chunk_path(base_dir, coord);
    let data = match fs::read(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let chunk = decompress_chunk(&data)?;
    if chunk.position() != coord {
        return Err(PersistenceError::Corrupt(format!(
            "{} holds chunk {:?}",
            path.display(),
            chunk.position()
        )));
    }
    Ok(Some(chunk))
}

/// Delete a chunk file if present
pub fn delete_chunk(base_dir: &Path, coord: ChunkCoord) -> Result<(), PersistenceError> {
    match fs::remove_file(chunk_path(base_dir, coord)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Check if a chunk exists on disk
pub fn chunk_exists(base_dir: &Path, coord: ChunkCoord) -> bool {
    chunk_path(base_dir, coord).exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{GenerationConfig, GenerationMode, GenerationPipeline};
    use tempfile::TempDir;

    fn landscape(size: usize) -> MonolithicWorld {
        let config = GenerationConfig {
            mode: GenerationMode::Landscape,
            seed: 2024,
            ..GenerationConfig::for_world_size(size)
        };
        let pipeline = GenerationPipeline::new(config).expect("valid config");
        pipeline.generate_landscape(size).expect("generation failed").0
    }

    #[test]
    fn test_chunk_path() {
        let base = Path::new("/tmp/chunks");
        let path = chunk_path(base, ChunkCoord::new(5, 10, 3));
        assert_eq!(path, PathBuf::from("/tmp/chunks/z_3/chunk_5_10_3.cbc"));
    }

    #[test]
    fn test_compress_decompress_world() {
        let world = landscape(32);
        let compressed = compress_world(&world, 16).expect("compression failed");
        assert_eq!(&compressed[..4], &WORLD_MAGIC);

        let (restored, header) = decompress_world(&compressed).expect("decompression failed");
        assert_eq!(header, WorldHeader { version: FORMAT_VERSION, world_size: 32, chunk_size: 16 });
        assert_eq!(restored.grid().as_slice(), world.grid().as_slice());
    }

    #[test]
    fn test_compression_ratio() {
        let world = landscape(64);
        let compressed = compress_world(&world, 32).expect("compression failed");

        // Terrain is mostly runs of solid and air
        assert!(compressed.len() < world.grid().len() / 4);
    }

    #[test]
    fn test_save_and_load_world() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("saves").join("alpha.cbw");
        let world = landscape(32);

        save_world(&path, &world, 16).expect("save failed");
        let (loaded, header) = load_world(&path).expect("load failed");

        assert_eq!(header.world_size, 32);
        assert_eq!(loaded.grid(), world.grid());
    }

    #[test]
    fn test_load_world_into_replaces_buffer() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("beta.cbw");
        let world = landscape(32);
        save_world(&path, &world, 16).unwrap();

        let mut target = MonolithicWorld::new(32);
        target.set(0, 0, 31, 9);
        load_world_into(&mut target, &path).expect("load failed");
        assert_eq!(target.grid(), world.grid());
    }

    #[test]
    fn test_load_world_into_rejects_other_size() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("gamma.cbw");
        save_world(&path, &MonolithicWorld::new(8), 4).unwrap();

        let mut target = MonolithicWorld::new(16);
        target.set(1, 1, 1, 3);
        let result = load_world_into(&mut target, &path);
        assert!(matches!(result, Err(PersistenceError::SizeMismatch { expected: 4096, found: 512 })));
        assert_eq!(target.get(1, 1, 1), 3);
    }

    #[test]
    fn test_load_missing_world() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("nope.cbw");
        assert!(matches!(load_world(&path), Err(PersistenceError::Missing(p)) if p == path));
    }

    #[test]
    fn test_corrupt_world_files() {
        let world = MonolithicWorld::new(8);
        let good = compress_world(&world, 4).unwrap();

        assert!(matches!(decompress_world(&good[..3]), Err(PersistenceError::Truncated)));
        assert!(matches!(decompress_world(&good[..good.len() / 2]), Err(PersistenceError::Corrupt(_))));

        let mut wrong_magic = good.clone();
        wrong_magic[0] = b'X';
        assert!(matches!(decompress_world(&wrong_magic), Err(PersistenceError::BadMagic)));

        // A chunk file is not a world file
        let chunk = Chunk::new(ChunkCoord::new(0, 0, 0), 4);
        let chunk_bytes = compress_chunk(&chunk).unwrap();
        assert!(matches!(decompress_world(&chunk_bytes), Err(PersistenceError::BadMagic)));

        let mut huge = good.clone();
        huge[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(decompress_world(&huge), Err(PersistenceError::Corrupt(_))));
    }

    #[test]
    fn test_element_count_mismatch() {
        let data = WorldFileData {
            version: FORMAT_VERSION,
            world_size: 8,
            chunk_size: 4,
            voxels: vec![0; 100],
        };
        let bytes = encode_world(&data).unwrap();
        assert!(matches!(
            decompress_world(&bytes),
            Err(PersistenceError::SizeMismatch { expected: 512, found: 100 })
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let data = WorldFileData {
            version: FORMAT_VERSION + 1,
            world_size: 2,
            chunk_size: 2,
            voxels: vec![0; 8],
        };
        let bytes = encode_world(&data).unwrap();
        assert!(matches!(decompress_world(&bytes), Err(PersistenceError::UnsupportedVersion(2))));
    }

    #[test]
    fn test_save_load_delete_chunk() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let coord = ChunkCoord::new(3, 1, 2);
        let mut chunk = Chunk::new(coord, 8);
        chunk.set(7, 0, 5, 4);

        save_chunk(temp_dir.path(), &chunk).expect("save failed");
        assert!(chunk_exists(temp_dir.path(), coord));

        let loaded = load_chunk(temp_dir.path(), coord)
            .expect("load failed")
            .expect("chunk not found");
        assert_eq!(loaded.position(), coord);
        assert_eq!(loaded.voxels(), chunk.voxels());

        delete_chunk(temp_dir.path(), coord).expect("delete failed");
        assert!(!chunk_exists(temp_dir.path(), coord));
        delete_chunk(temp_dir.path(), coord).expect("second delete should be a no-op");
    }

    #[test]
    fn test_load_nonexistent_chunk() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let result = load_chunk(temp_dir.path(), ChunkCoord::new(9, 9, 9)).expect("load should not error");
        assert!(result.is_none());
    }

    #[test]
    fn test_misplaced_chunk_file_is_corrupt() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let chunk = Chunk::new(ChunkCoord::new(1, 1, 1), 4);
        let wrong_path = chunk_path(temp_dir.path(), ChunkCoord::new(2, 2, 2));
        fs::create_dir_all(wrong_path.parent().unwrap()).unwrap();
        fs::write(&wrong_path, compress_chunk(&chunk).unwrap()).unwrap();

        let result = load_chunk(temp_dir.path(), ChunkCoord::new(2, 2, 2));
        assert!(matches!(result, Err(PersistenceError::Corrupt(_))));
    }
}
