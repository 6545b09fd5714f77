//! Error types for the Cubix voxel core

use thiserror::Error;

use crate::generation::GenerationError;
use crate::streaming::disk_io::PersistenceError;
use crate::voxel::chunk::ChunkCoord;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Chunk coordinate {0:?} is outside the packable range [0, {max}]", max = crate::voxel::chunk::MAX_CHUNK_AXIS)]
    ChunkOutOfRange(ChunkCoord),

    #[error("Chunk slot {0:?} is already occupied")]
    ChunkOccupied(ChunkCoord),

    #[error("Chunk {coord:?} has size {found}, store expects {expected}")]
    ChunkSizeMismatch {
        coord: ChunkCoord,
        expected: usize,
        found: usize,
    },
}
