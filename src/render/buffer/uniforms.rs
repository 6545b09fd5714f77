//! Uniform layouts shared with the renderer's shaders

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::voxel::chunk::ChunkCoord;

/// Per-world constants (must match shader struct exactly)
/// WGSL vec3 has 16-byte alignment, so the direction is padded
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct WorldUniform {
    /// Unit sun direction (12 bytes, offset 0)
    pub sun_direction: [f32; 3],
    /// Padding after sun_direction (4 bytes, offset 12)
    pub _sun_pad: f32,
    /// Monolithic world side length in voxels (offset 16)
    pub world_size: u32,
    /// Chunk side length in voxels (offset 20)
    pub chunk_size: u32,
    /// Padding to 32 bytes
    pub _pad: [u32; 2],
}

impl WorldUniform {
    pub fn new(sun_direction: Vec3, world_size: usize, chunk_size: usize) -> Self {
        Self {
            sun_direction: sun_direction.to_array(),
            _sun_pad: 0.0,
            world_size: world_size as u32,
            chunk_size: chunk_size as u32,
            _pad: [0; 2],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Per-chunk draw data: where the chunk's voxel buffer sits in the world
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct GpuChunkInfo {
    /// Chunk coordinate
    pub position: [i32; 3],
    /// Chunk side length in voxels
    pub size: u32,
}

impl GpuChunkInfo {
    pub fn new(position: ChunkCoord, size: usize) -> Self {
        Self {
            position: [position.x, position.y, position.z],
            size: size as u32,
        }
    }
}
