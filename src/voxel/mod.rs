//! Voxel data structures: grids, chunks and world containers

pub mod grid;
pub mod chunk;
pub mod world;

pub use grid::{BlockId, VoxelGrid, AIR, OUT_OF_BOUNDS};
pub use chunk::{Chunk, ChunkCoord, ChunkKey, DEFAULT_CHUNK_SIZE, MAX_CHUNK_AXIS};
pub use world::{ChunkStore, MonolithicWorld, DEFAULT_WORLD_SIZE, MAX_WORLD_SIZE};
