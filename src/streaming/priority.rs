//! Back-to-front draw ordering
//!
//! Chunks are drawn farthest first so that translucent geometry composites
//! correctly. Distance is measured from the viewer to the chunk centre.

use std::cmp::Ordering;

use glam::Vec3;

use crate::render::GpuChunkInfo;
use crate::voxel::chunk::{Chunk, ChunkCoord};

/// Distance of one chunk from the viewer
#[derive(Clone, Copy, Debug)]
pub struct ChunkDistance {
    pub coord: ChunkCoord,
    pub distance: f32,
}

impl ChunkDistance {
    pub fn calculate(chunk: &Chunk, viewer: Vec3) -> Self {
        Self {
            coord: chunk.position(),
            distance: viewer.distance(chunk.world_center()),
        }
    }
}

/// Farthest-first comparison. Ties fall back to the coordinate so the order is stable
/// across frames.
pub fn far_to_near(a: f32, a_coord: ChunkCoord, b: f32, b_coord: ChunkCoord) -> Ordering {
    b.total_cmp(&a).then_with(|| a_coord.cmp(&b_coord))
}

/// Sort distances farthest first
pub fn sort_far_to_near(entries: &mut [ChunkDistance]) {
    entries.sort_by(|a, b| far_to_near(a.distance, a.coord, b.distance, b.coord));
}

/// One drawable chunk: its data, its renderer handle and its distance to the viewer
#[derive(Debug)]
pub struct DrawItem<'a, H> {
    chunk: &'a Chunk,
    handle: &'a H,
    distance: f32,
}

impl<'a, H> Clone for DrawItem<'a, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, H> Copy for DrawItem<'a, H> {}

impl<'a, H> DrawItem<'a, H> {
    pub fn new(chunk: &'a Chunk, handle: &'a H, distance: f32) -> Self {
        Self {
            chunk,
            handle,
            distance,
        }
    }

    pub fn position(&self) -> ChunkCoord {
        self.chunk.position()
    }

    pub fn chunk(&self) -> &'a Chunk {
        self.chunk
    }

    pub fn handle(&self) -> &'a H {
        self.handle
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }
}

/// Chunks in back-to-front order for one frame.
///
/// Borrowed from the streamer; iterate it as many times as needed.
#[derive(Debug)]
pub struct DrawOrder<'a, H> {
    items: Vec<DrawItem<'a, H>>,
}

impl<'a, H> DrawOrder<'a, H> {
    /// Build an ordering from unsorted items
    pub fn new(mut items: Vec<DrawItem<'a, H>>) -> Self {
        items.sort_by(|a, b| far_to_near(a.distance, a.position(), b.distance, b.position()));
        Self { items }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DrawItem<'a, H>> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[DrawItem<'a, H>] {
        &self.items
    }

    /// Per-chunk uniform data in draw order
    pub fn chunk_infos(&self) -> Vec<GpuChunkInfo> {
        self.items
            .iter()
            .map(|item| GpuChunkInfo::new(item.position(), item.chunk.size()))
            .collect()
    }
}

impl<'o, 'a, H> IntoIterator for &'o DrawOrder<'a, H> {
    type Item = &'o DrawItem<'a, H>;
    type IntoIter = std::slice::Iter<'o, DrawItem<'a, H>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<'a, H> IntoIterator for DrawOrder<'a, H> {
    type Item = DrawItem<'a, H>;
    type IntoIter = std::vec::IntoIter<DrawItem<'a, H>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
