//! Chunk system for cubic partitions of the world grid

use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;

use crate::core::{Error, Result};
use crate::math::morton;
use crate::voxel::grid::{BlockId, VoxelGrid};

/// Default chunk side length in voxels
pub const DEFAULT_CHUNK_SIZE: usize = 128;

/// Largest value a chunk coordinate axis may take and still pack into a [`ChunkKey`]
pub const MAX_CHUNK_AXIS: i32 = morton::AXIS_MAX as i32;

/// Source of chunk revisions. Global so that no two distinct voxel states share one.
static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

fn next_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}

/// Integer coordinate identifying a chunk in the world grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkCoord {
    /// Create a new chunk coordinate
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Whether every axis is in `[0, MAX_CHUNK_AXIS]`
    pub fn is_packable(&self) -> bool {
        let range = 0..=MAX_CHUNK_AXIS;
        range.contains(&self.x) && range.contains(&self.y) && range.contains(&self.z)
    }

    /// Chunk containing the voxel at world position `pos`
    pub fn from_world_pos(pos: Vec3, chunk_size: usize) -> Self {
        let cs = chunk_size as f32;
        Self {
            x: (pos.x / cs).floor() as i32,
            y: (pos.y / cs).floor() as i32,
            z: (pos.z / cs).floor() as i32,
        }
    }

    /// World-space origin (minimum corner) of this chunk
    pub fn world_origin(&self, chunk_size: usize) -> Vec3 {
        let cs = chunk_size as f32;
        Vec3::new(self.x as f32 * cs, self.y as f32 * cs, self.z as f32 * cs)
    }

    /// World-space centre of this chunk
    pub fn world_center(&self, chunk_size: usize) -> Vec3 {
        self.world_origin(chunk_size) + Vec3::splat(chunk_size as f32 * 0.5)
    }

    /// Voxel origin of this chunk in world voxel coordinates
    pub fn voxel_origin(&self, chunk_size: usize) -> (i64, i64, i64) {
        let cs = chunk_size as i64;
        (self.x as i64 * cs, self.y as i64 * cs, self.z as i64 * cs)
    }
}

/// Collision-free packed chunk identifier (3D Morton code).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey(u64);

impl ChunkKey {
    /// Pack a coordinate, rejecting axes outside `[0, MAX_CHUNK_AXIS]`
    pub fn pack(coord: ChunkCoord) -> Result<Self> {
        if !coord.is_packable() {
            return Err(Error::ChunkOutOfRange(coord));
        }
        morton::encode(coord.x as u32, coord.y as u32, coord.z as u32)
            .map(ChunkKey)
            .ok_or(Error::ChunkOutOfRange(coord))
    }

    /// Recover the coordinate this key was packed from
    pub fn unpack(self) -> ChunkCoord {
        let (x, y, z) = morton::decode(self.0);
        ChunkCoord::new(x as i32, y as i32, z as i32)
    }

    /// Raw 64-bit value
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// A cubic partition of the world: a voxel grid plus its chunk coordinate.
///
/// Every mutation made through the chunk assigns a fresh
/// [`revision`](Self::revision); the streamer compares it against the revision
/// it last uploaded. Revisions are unique across chunks, so a chunk removed and
/// replaced at the same coordinate never matches a stale upload.
#[derive(Clone, Debug)]
pub struct Chunk {
    position: ChunkCoord,
    voxels: VoxelGrid,
    revision: u64,
}

impl Chunk {
    /// Create an empty (all air) chunk
    pub fn new(position: ChunkCoord, size: usize) -> Self {
        Self::from_grid(position, VoxelGrid::new(size))
    }

    /// Create a chunk from an existing grid
    pub fn from_grid(position: ChunkCoord, voxels: VoxelGrid) -> Self {
        Self {
            position,
            voxels,
            revision: next_revision(),
        }
    }

    pub fn position(&self) -> ChunkCoord {
        self.position
    }

    /// Side length in voxels
    pub fn size(&self) -> usize {
        self.voxels.size()
    }

    /// Read-only voxel data
    pub fn voxels(&self) -> &VoxelGrid {
        &self.voxels
    }

    /// Mutable voxel data. Marks the chunk dirty.
    pub fn voxels_mut(&mut self) -> &mut VoxelGrid {
        self.touch();
        &mut self.voxels
    }

    /// Current revision; changes whenever the voxel data may have changed
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Mark the voxel data as changed
    pub fn touch(&mut self) {
        self.revision = next_revision();
    }

    /// Bounds-checked read in chunk-local coordinates; `-1` outside
    pub fn get(&self, x: i32, y: i32, z: i32) -> i16 {
        self.voxels.get(x, y, z)
    }

    /// Bounds-checked write in chunk-local coordinates
    pub fn set(&mut self, x: i32, y: i32, z: i32, id: BlockId) -> bool {
        let written = self.voxels.set(x, y, z, id);
        if written {
            self.touch();
        }
        written
    }

    /// World-space centre, used for distance ordering
    pub fn world_center(&self) -> Vec3 {
        self.position.world_center(self.size())
    }

    /// Voxel bytes handed to the renderer
    pub fn as_bytes(&self) -> &[u8] {
        self.voxels.as_bytes()
    }

    pub fn into_grid(self) -> VoxelGrid {
        self.voxels
    }
}
