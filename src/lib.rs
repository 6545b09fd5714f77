//! Cubix - voxel world core
//!
//! Stores block ids in a dense grid or a sparse set of cubic chunks, generates
//! terrain, persists worlds to compressed files and streams chunks to a
//! renderer in back-to-front order.

pub mod core;
pub mod math;
pub mod voxel;
pub mod render;
pub mod streaming;
pub mod generation;

pub use crate::core::{EngineConfig, Error, Result};
