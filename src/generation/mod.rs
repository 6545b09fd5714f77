//! World generation pipeline: fills monolithic worlds and chunk sets from a
//! seeded random source.
//!
//! The pipeline supports three modes:
//! 1. Flat fill below a fixed level
//! 2. Random debug infill (rendering stress tests)
//! 3. Layered landscape from a blended noise heightmap
//!
//! Chunk generation is parallelized with rayon. Chunks share only a read-only
//! heightmap, and random modes derive one RNG per chunk so output is the same
//! regardless of thread scheduling.

pub mod config;
pub mod heightmap;
pub mod terrain_gen;

pub use config::{GenerationConfig, GenerationMode, Octave, DEFAULT_OCTAVES};
pub use heightmap::HeightMap;
pub use terrain_gen::{fill_flat, fill_from_heightmap, generate_debug, generate_flat, SOLID};

use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use thiserror::Error;

use crate::voxel::chunk::{Chunk, ChunkCoord, ChunkKey};
use crate::voxel::grid::VoxelGrid;
use crate::voxel::world::{ChunkStore, MonolithicWorld};

/// Errors raised while generating terrain
#[derive(Debug, Error)]
pub enum GenerationError {
    /// An octave's coarse grid does not upsample to the requested resolution.
    /// This means the world size and octave table are incompatible.
    #[error("octave {octave} upsamples to {found}, expected {expected}")]
    ResolutionMismatch {
        octave: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid generation parameters: {0}")]
    InvalidParams(String),
}

/// Derive a per-chunk seed from the world seed and the chunk key
fn chunk_seed(seed: u64, key: ChunkKey) -> u64 {
    seed ^ key.raw().wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

/// Orchestrates terrain generation for worlds and chunk sets.
pub struct GenerationPipeline {
    config: GenerationConfig,
}

impl GenerationPipeline {
    /// Create a pipeline, rejecting invalid parameters up front
    pub fn new(config: GenerationConfig) -> Result<Self, GenerationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Fresh RNG seeded from the configured seed
    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.config.seed)
    }

    /// Blended heightmap covering a `size`×`size` world
    pub fn heightmap(&self, size: usize) -> Result<HeightMap, GenerationError> {
        HeightMap::layered(size, &self.config.octaves, &mut self.rng())
    }

    /// Flat world: solid below `level`
    pub fn generate_flat(&self, size: usize) -> MonolithicWorld {
        let mut world = MonolithicWorld::new(size);
        generate_flat(world.grid_mut(), self.config.level);
        world
    }

    /// Random infill world at the configured density
    pub fn generate_debug(&self, size: usize) -> Result<MonolithicWorld, GenerationError> {
        let mut world = MonolithicWorld::new(size);
        generate_debug(world.grid_mut(), self.config.infill, &mut self.rng())?;
        Ok(world)
    }

    /// Landscape world plus the heightmap it was built from
    pub fn generate_landscape(&self, size: usize) -> Result<(MonolithicWorld, HeightMap), GenerationError> {
        let start = Instant::now();
        let heightmap = self.heightmap(size)?;

        let mut world = MonolithicWorld::new(size);
        fill_from_heightmap(
            world.grid_mut(),
            &heightmap,
            (0, 0, 0),
            self.config.level,
            self.config.magnitude,
        );

        log::info!(
            "Generated {}³ landscape ({} solid voxels) in {:.2}s",
            size,
            world.grid().count_solid(),
            start.elapsed().as_secs_f64()
        );
        Ok((world, heightmap))
    }

    /// Generate a monolithic world with the configured mode
    pub fn generate_world(&self, size: usize) -> Result<MonolithicWorld, GenerationError> {
        match self.config.mode {
            GenerationMode::Flat => Ok(self.generate_flat(size)),
            GenerationMode::Debug => self.generate_debug(size),
            GenerationMode::Landscape => self.generate_landscape(size).map(|(world, _)| world),
        }
    }

    /// Generate chunks of side `chunk_size` at `coords` in parallel.
    ///
    /// `world_size` is the horizontal extent the landscape heightmap covers;
    /// columns beyond it stay empty. Coordinates that cannot be packed into a
    /// chunk key are skipped with a warning.
    pub fn generate_chunks(
        &self,
        coords: &[ChunkCoord],
        chunk_size: usize,
        world_size: usize,
    ) -> Result<Vec<Chunk>, GenerationError> {
        let start = Instant::now();
        let heightmap = match self.config.mode {
            GenerationMode::Landscape => Some(self.heightmap(world_size)?),
            _ => None,
        };

        log::info!("Generating {} {:?} chunks of {}³...", coords.len(), self.config.mode, chunk_size);

        let chunks: Vec<Chunk> = coords
            .par_iter()
            .filter_map(|&coord| {
                let key = match ChunkKey::pack(coord) {
                    Ok(key) => key,
                    Err(e) => {
                        log::warn!("Skipping chunk: {}", e);
                        return None;
                    }
                };
                Some(self.generate_chunk(coord, key, chunk_size, heightmap.as_ref()))
            })
            .collect::<Result<_, _>>()?;

        let elapsed = start.elapsed().as_secs_f64();
        log::info!(
            "Generated {} chunks in {:.2}s ({:.0} chunks/sec)",
            chunks.len(),
            elapsed,
            chunks.len() as f64 / elapsed.max(1e-9)
        );
        Ok(chunks)
    }

    fn generate_chunk(
        &self,
        coord: ChunkCoord,
        key: ChunkKey,
        chunk_size: usize,
        heightmap: Option<&HeightMap>,
    ) -> Result<Chunk, GenerationError> {
        let origin = coord.voxel_origin(chunk_size);
        let mut grid = VoxelGrid::new(chunk_size);
        match self.config.mode {
            GenerationMode::Landscape => {
                let map = heightmap.ok_or_else(|| {
                    GenerationError::InvalidParams("landscape chunk without heightmap".to_string())
                })?;
                fill_from_heightmap(&mut grid, map, origin, self.config.level, self.config.magnitude);
            }
            GenerationMode::Debug => {
                let mut rng = ChaCha8Rng::seed_from_u64(chunk_seed(self.config.seed, key));
                generate_debug(&mut grid, self.config.infill, &mut rng)?;
            }
            GenerationMode::Flat => fill_flat(&mut grid, origin.2, self.config.level),
        }
        Ok(Chunk::from_grid(coord, grid))
    }

    /// Generate every chunk of a `world_size` cube and insert the non-empty ones
    /// into `store`. Returns the number of chunks inserted.
    pub fn populate(&self, store: &mut ChunkStore, world_size: usize) -> crate::core::Result<usize> {
        let chunk_size = store.chunk_size();
        let per_axis = (world_size / chunk_size) as i32;
        let coords: Vec<ChunkCoord> = (0..per_axis)
            .flat_map(|x| (0..per_axis).flat_map(move |y| (0..per_axis).map(move |z| ChunkCoord::new(x, y, z))))
            .filter(|&coord| !store.contains(coord))
            .collect();

        let mut inserted = 0;
        for chunk in self.generate_chunks(&coords, chunk_size, world_size)? {
            if chunk.voxels().count_solid() == 0 {
                continue;
            }
            store.add_chunk(chunk)?;
            inserted += 1;
        }
        Ok(inserted)
    }
}
