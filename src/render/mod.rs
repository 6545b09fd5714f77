//! Renderer-facing interfaces
//!
//! The core never talks to a graphics API. It asks the renderer for GPU buffers
//! through [`GpuBufferFactory`] and hands back ordered `(chunk, handle)` pairs
//! plus the plain-old-data uniforms in [`buffer`].

pub mod buffer;

pub use buffer::{GpuChunkInfo, WorldUniform};

/// The one operation the core needs from the rendering backend.
pub trait GpuBufferFactory {
    /// Backend handle for an uploaded buffer
    type Handle;

    /// Upload `bytes` and return a handle the renderer can bind later
    fn create_gpu_buffer(&mut self, bytes: &[u8]) -> Self::Handle;
}

impl<F: GpuBufferFactory + ?Sized> GpuBufferFactory for &mut F {
    type Handle = F::Handle;

    fn create_gpu_buffer(&mut self, bytes: &[u8]) -> Self::Handle {
        (**self).create_gpu_buffer(bytes)
    }
}
