//! GPU-side data layouts

pub mod uniforms;

pub use uniforms::{GpuChunkInfo, WorldUniform};
