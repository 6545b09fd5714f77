//! Chunk persistence and streaming to the renderer

pub mod disk_io;
pub mod priority;
pub mod cache;
pub mod budget;
pub mod streamer;

pub use disk_io::{
    PersistenceError, WorldHeader,
    compress_world, decompress_world, save_world, load_world, load_world_into,
    compress_chunk, decompress_chunk,
    save_chunk, load_chunk, delete_chunk, chunk_exists,
    chunk_path,
};
pub use priority::{ChunkDistance, DrawItem, DrawOrder};
pub use cache::{BufferCache, CachedBuffer};
pub use budget::ResidencyBudget;
pub use streamer::{ChunkStreamer, SyncStats};
