//! World containers: a single monolithic grid or a sparse store of chunks

use std::collections::HashMap;

use glam::Vec3;

use crate::core::{Error, Result};
use crate::voxel::chunk::{Chunk, ChunkCoord, ChunkKey};
use crate::voxel::grid::{BlockId, VoxelGrid};

/// Default monolithic world side length in voxels
pub const DEFAULT_WORLD_SIZE: usize = 256;

/// Largest supported monolithic world side length
pub const MAX_WORLD_SIZE: usize = 512;

/// Fixed vector the sun direction is derived from (z is up)
const SUN_VECTOR: Vec3 = Vec3::new(0.4, 0.6, 1.0);

/// Unit-length sun direction shared by every world
pub fn sun_direction() -> Vec3 {
    SUN_VECTOR.normalize()
}

/// Whole playable volume held in one grid. Used for smaller worlds and disk saves.
#[derive(Clone, Debug)]
pub struct MonolithicWorld {
    grid: VoxelGrid,
    sun_direction: Vec3,
}

impl MonolithicWorld {
    /// Create an empty world of side `size`
    pub fn new(size: usize) -> Self {
        Self::from_grid(VoxelGrid::new(size))
    }

    pub fn from_grid(grid: VoxelGrid) -> Self {
        Self {
            grid,
            sun_direction: sun_direction(),
        }
    }

    /// Side length (`WORLD_SIZE`)
    pub fn size(&self) -> usize {
        self.grid.size()
    }

    pub fn sun_direction(&self) -> Vec3 {
        self.sun_direction
    }

    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut VoxelGrid {
        &mut self.grid
    }

    /// Give up the voxel buffer
    pub fn into_grid(self) -> VoxelGrid {
        self.grid
    }

    /// Swap in a new voxel buffer, returning the old one
    pub fn replace_grid(&mut self, grid: VoxelGrid) -> VoxelGrid {
        std::mem::replace(&mut self.grid, grid)
    }

    /// Bounds-checked read; `-1` outside the world
    pub fn get(&self, x: i32, y: i32, z: i32) -> i16 {
        self.grid.get(x, y, z)
    }

    /// Bounds-checked write; `false` outside the world
    pub fn set(&mut self, x: i32, y: i32, z: i32, id: BlockId) -> bool {
        self.grid.set(x, y, z, id)
    }

    /// # Safety
    /// Each coordinate must be `< size`.
    pub unsafe fn get_unchecked(&self, x: usize, y: usize, z: usize) -> BlockId {
        // SAFETY: forwarded caller contract.
        unsafe { self.grid.get_unchecked(x, y, z) }
    }

    /// # Safety
    /// Each coordinate must be `< size`.
    pub unsafe fn set_unchecked(&mut self, x: usize, y: usize, z: usize, id: BlockId) {
        // SAFETY: forwarded caller contract.
        unsafe { self.grid.set_unchecked(x, y, z, id) }
    }
}

/// Sparse collection of equally sized chunks keyed by [`ChunkKey`]
pub struct ChunkStore {
    chunk_size: usize,
    chunks: HashMap<ChunkKey, Chunk>,
    sun_direction: Vec3,
}

impl ChunkStore {
    /// Create an empty store for chunks of side `chunk_size`; zero is rejected
    pub fn new(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk size must be non-zero".to_string()));
        }
        Ok(Self {
            chunk_size,
            chunks: HashMap::new(),
            sun_direction: sun_direction(),
        })
    }

    /// Split a monolithic world into chunks of side `chunk_size`.
    ///
    /// The world size must be a multiple of `chunk_size`. Chunks that contain only
    /// air are skipped.
    pub fn from_monolithic(world: &MonolithicWorld, chunk_size: usize) -> Result<Self> {
        let mut store = Self::new(chunk_size)?;
        if world.size() % chunk_size != 0 {
            return Err(Error::Config(format!(
                "world size {} is not a multiple of chunk size {}",
                world.size(),
                chunk_size
            )));
        }

        let per_axis = (world.size() / chunk_size) as i32;
        for cx in 0..per_axis {
            for cy in 0..per_axis {
                for cz in 0..per_axis {
                    let coord = ChunkCoord::new(cx, cy, cz);
                    let origin = (
                        cx as usize * chunk_size,
                        cy as usize * chunk_size,
                        cz as usize * chunk_size,
                    );
                    let grid = world.grid().extract(origin, chunk_size);
                    if grid.count_solid() > 0 {
                        store.add_chunk(Chunk::from_grid(coord, grid))?;
                    }
                }
            }
        }
        log::debug!(
            "Split {}³ world into {} non-empty chunks of {}³",
            world.size(),
            store.len(),
            chunk_size
        );
        Ok(store)
    }

    /// Side length every chunk in this store has
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn sun_direction(&self) -> Vec3 {
        self.sun_direction
    }

    fn check_insertable(&self, chunk: &Chunk) -> Result<ChunkKey> {
        let key = ChunkKey::pack(chunk.position())?;
        if chunk.size() != self.chunk_size {
            return Err(Error::ChunkSizeMismatch {
                coord: chunk.position(),
                expected: self.chunk_size,
                found: chunk.size(),
            });
        }
        Ok(key)
    }

    /// Insert a chunk into an empty slot.
    ///
    /// Fails with [`Error::ChunkOccupied`] if a chunk already lives at the same
    /// coordinate, [`Error::ChunkOutOfRange`] if the coordinate cannot be packed and
    /// [`Error::ChunkSizeMismatch`] if the chunk's size differs from the store's.
    pub fn add_chunk(&mut self, chunk: Chunk) -> Result<ChunkKey> {
        let key = self.check_insertable(&chunk)?;
        if self.chunks.contains_key(&key) {
            log::warn!("Rejected chunk at {:?}: slot occupied", chunk.position());
            return Err(Error::ChunkOccupied(chunk.position()));
        }
        self.chunks.insert(key, chunk);
        Ok(key)
    }

    /// Insert a chunk, returning whatever previously lived at its coordinate
    pub fn replace_chunk(&mut self, chunk: Chunk) -> Result<Option<Chunk>> {
        let key = self.check_insertable(&chunk)?;
        Ok(self.chunks.insert(key, chunk))
    }

    /// Get a chunk by coordinate
    pub fn get_chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        ChunkKey::pack(coord).ok().and_then(|key| self.chunks.get(&key))
    }

    /// Get a mutable chunk by coordinate
    pub fn get_chunk_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk> {
        let key = ChunkKey::pack(coord).ok()?;
        self.chunks.get_mut(&key)
    }

    pub fn get_by_key(&self, key: ChunkKey) -> Option<&Chunk> {
        self.chunks.get(&key)
    }

    /// Remove a chunk and return it
    pub fn remove_chunk(&mut self, coord: ChunkCoord) -> Option<Chunk> {
        let key = ChunkKey::pack(coord).ok()?;
        self.chunks.remove(&key)
    }

    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.get_chunk(coord).is_some()
    }

    /// Number of stored chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Iterate over `(key, chunk)` pairs in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (ChunkKey, &Chunk)> {
        self.chunks.iter().map(|(&key, chunk)| (key, chunk))
    }

    /// Iterate over stored chunk coordinates
    pub fn coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.chunks.values().map(Chunk::position)
    }

    /// Read a voxel by world voxel coordinate; `-1` when outside every stored chunk
    pub fn get_voxel(&self, x: i64, y: i64, z: i64) -> i16 {
        let cs = self.chunk_size as i64;
        let axis = |v: i64| i32::try_from(v.div_euclid(cs)).ok();
        let (Some(cx), Some(cy), Some(cz)) = (axis(x), axis(y), axis(z)) else {
            return crate::voxel::grid::OUT_OF_BOUNDS;
        };
        match self.get_chunk(ChunkCoord::new(cx, cy, cz)) {
            Some(chunk) => chunk.get(
                x.rem_euclid(cs) as i32,
                y.rem_euclid(cs) as i32,
                z.rem_euclid(cs) as i32,
            ),
            None => crate::voxel::grid::OUT_OF_BOUNDS,
        }
    }
}
