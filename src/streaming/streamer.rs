//! Chunk streaming to the renderer
//!
//! [`ChunkStreamer`] owns the chunk store and keeps exactly one renderer buffer
//! per resident chunk. Buffers are created on first use, rebuilt when a chunk's
//! revision moves on, and released when the chunk leaves the store.

use std::time::Instant;

use glam::Vec3;

use crate::core::Result;
use crate::render::{GpuBufferFactory, WorldUniform};
use crate::streaming::budget::ResidencyBudget;
use crate::streaming::cache::{BufferCache, CachedBuffer};
use crate::streaming::priority::{ChunkDistance, DrawItem, DrawOrder, sort_far_to_near};
use crate::voxel::chunk::{Chunk, ChunkCoord, ChunkKey};
use crate::voxel::world::ChunkStore;

/// Outcome of one [`ChunkStreamer::sync`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Buffers built for chunks seen for the first time
    pub created: usize,
    /// Buffers rebuilt because the chunk changed
    pub refreshed: usize,
    /// Buffers reused unchanged
    pub reused: usize,
    /// Buffers released because their chunk left the store
    pub dropped: usize,
}

impl SyncStats {
    /// Number of calls made to the buffer factory
    pub fn uploads(&self) -> usize {
        self.created + self.refreshed
    }
}

/// Owns resident chunks and their renderer buffers
pub struct ChunkStreamer<F: GpuBufferFactory> {
    store: ChunkStore,
    factory: F,
    cache: BufferCache<F::Handle>,
    budget: ResidencyBudget,
}

impl<F: GpuBufferFactory> ChunkStreamer<F> {
    /// Create a streamer with no residency limits
    pub fn new(store: ChunkStore, factory: F) -> Self {
        Self::with_budget(store, factory, ResidencyBudget::unlimited())
    }

    pub fn with_budget(store: ChunkStore, factory: F, budget: ResidencyBudget) -> Self {
        Self {
            store,
            factory,
            cache: BufferCache::new(),
            budget,
        }
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// Mutable access to the chunks. Changes are picked up by the next sync.
    pub fn store_mut(&mut self) -> &mut ChunkStore {
        &mut self.store
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn budget(&self) -> &ResidencyBudget {
        &self.budget
    }

    pub fn set_budget(&mut self, budget: ResidencyBudget) {
        self.budget = budget;
    }

    /// Insert a chunk; fails if its coordinate is already occupied
    pub fn add_chunk(&mut self, chunk: Chunk) -> Result<ChunkKey> {
        self.store.add_chunk(chunk)
    }

    /// Remove a chunk together with its buffer
    pub fn remove_chunk(&mut self, coord: ChunkCoord) -> Option<Chunk> {
        let chunk = self.store.remove_chunk(coord)?;
        if let Ok(key) = ChunkKey::pack(coord) {
            self.cache.remove(key);
        }
        Some(chunk)
    }

    /// Buffer handle for a chunk, if one has been built
    pub fn handle(&self, coord: ChunkCoord) -> Option<&F::Handle> {
        let key = ChunkKey::pack(coord).ok()?;
        self.cache.handle(key)
    }

    /// Number of live renderer buffers
    pub fn buffer_count(&self) -> usize {
        self.cache.len()
    }

    /// Bytes uploaded across all live buffers
    pub fn gpu_bytes(&self) -> usize {
        self.cache.total_bytes()
    }

    /// Bring the buffer cache in line with the store
    pub fn sync(&mut self) -> SyncStats {
        let start = Instant::now();
        let mut stats = SyncStats::default();

        for (key, chunk) in self.store.iter() {
            let previous = match self.cache.get(key) {
                Some(entry) if entry.revision == chunk.revision() => {
                    stats.reused += 1;
                    continue;
                }
                Some(_) => true,
                None => false,
            };

            let bytes = chunk.as_bytes();
            let handle = self.factory.create_gpu_buffer(bytes);
            self.cache.insert(
                key,
                CachedBuffer {
                    handle,
                    revision: chunk.revision(),
                    bytes: bytes.len(),
                },
            );

            if previous {
                log::trace!("Rebuilt buffer for chunk {:?}", chunk.position());
                stats.refreshed += 1;
            } else {
                log::trace!("Built buffer for chunk {:?}", chunk.position());
                stats.created += 1;
            }
        }

        let store = &self.store;
        stats.dropped = self.cache.retain_keys(|key| store.get_by_key(key).is_some()).len();

        if stats.uploads() > 0 || stats.dropped > 0 {
            log::debug!(
                "Synced {} chunks in {:.2?}: {} created, {} refreshed, {} reused, {} dropped",
                self.store.len(),
                start.elapsed(),
                stats.created,
                stats.refreshed,
                stats.reused,
                stats.dropped
            );
        }
        stats
    }

    /// Sync, then return every resident chunk with its buffer, farthest from
    /// `viewer` first.
    pub fn ordered(&mut self, viewer: Vec3) -> DrawOrder<'_, F::Handle> {
        self.sync();

        let cache = &self.cache;
        let items = self
            .store
            .iter()
            .filter_map(|(key, chunk)| {
                let handle = cache.handle(key)?;
                Some(DrawItem::new(chunk, handle, viewer.distance(chunk.world_center())))
            })
            .collect();
        DrawOrder::new(items)
    }

    /// Remove chunks that break the residency budget.
    ///
    /// Syncs first so GPU bytes reflect the current store. Chunks beyond the
    /// distance limit go first; then the farthest remaining chunks are removed
    /// until the chunk count and GPU bytes fit. Evicted chunks are returned so
    /// the caller can persist them.
    pub fn evict(&mut self, viewer: Vec3) -> Vec<Chunk> {
        self.sync();

        let mut distances: Vec<ChunkDistance> = self
            .store
            .iter()
            .map(|(_, chunk)| ChunkDistance::calculate(chunk, viewer))
            .collect();
        sort_far_to_near(&mut distances);

        let mut evicted = Vec::new();
        for entry in distances {
            let over = self
                .budget
                .is_over(self.store.len(), self.cache.total_bytes());
            if !over && self.budget.within_distance(entry.distance) {
                // Sorted far to near, so everything after this fits too
                break;
            }
            if let Some(chunk) = self.remove_chunk(entry.coord) {
                evicted.push(chunk);
            }
        }

        if !evicted.is_empty() {
            log::debug!(
                "Evicted {} chunks ({} resident, {} GPU bytes)",
                evicted.len(),
                self.store.len(),
                self.cache.total_bytes()
            );
        }
        evicted
    }

    /// World constants for the renderer
    pub fn world_uniform(&self, world_size: usize) -> WorldUniform {
        WorldUniform::new(self.store.sun_direction(), world_size, self.store.chunk_size())
    }

    /// Release every buffer and return the store
    pub fn into_store(self) -> ChunkStore {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::chunk::ChunkCoord;

    /// Factory that hands out sequential ids and records upload sizes
    #[derive(Default)]
    struct CountingFactory {
        uploads: Vec<usize>,
    }

    impl GpuBufferFactory for CountingFactory {
        type Handle = usize;

        fn create_gpu_buffer(&mut self, bytes: &[u8]) -> usize {
            self.uploads.push(bytes.len());
            self.uploads.len() - 1
        }
    }

    fn store_with(coords: &[(i32, i32, i32)]) -> ChunkStore {
        let mut store = ChunkStore::new(4).unwrap();
        for &(x, y, z) in coords {
            store.add_chunk(Chunk::new(ChunkCoord::new(x, y, z), 4)).unwrap();
        }
        store
    }

    #[test]
    fn test_buffers_created_once() {
        let store = store_with(&[(0, 0, 0), (1, 0, 0), (2, 0, 0)]);
        let mut streamer = ChunkStreamer::new(store, CountingFactory::default());

        let stats = streamer.sync();
        assert_eq!(stats.created, 3);
        assert_eq!(streamer.factory().uploads, vec![64, 64, 64]);

        let stats = streamer.sync();
        assert_eq!(stats, SyncStats { reused: 3, ..Default::default() });

        assert_eq!(streamer.ordered(Vec3::ZERO).len(), 3);
        assert_eq!(streamer.factory().uploads.len(), 3);
        assert_eq!(streamer.buffer_count(), 3);
        assert_eq!(streamer.gpu_bytes(), 192);
    }

    #[test]
    fn test_modified_chunk_is_reuploaded() {
        let store = store_with(&[(0, 0, 0), (1, 0, 0)]);
        let mut streamer = ChunkStreamer::new(store, CountingFactory::default());
        streamer.sync();
        let old = *streamer.handle(ChunkCoord::new(1, 0, 0)).unwrap();

        let chunk = streamer.store_mut().get_chunk_mut(ChunkCoord::new(1, 0, 0)).unwrap();
        assert!(chunk.set(0, 0, 0, 5));

        let stats = streamer.sync();
        assert_eq!(stats.refreshed, 1);
        assert_eq!(stats.reused, 1);
        assert_eq!(streamer.buffer_count(), 2);
        assert_ne!(*streamer.handle(ChunkCoord::new(1, 0, 0)).unwrap(), old);
    }

    #[test]
    fn test_replaced_chunk_is_reuploaded() {
        let store = store_with(&[(0, 0, 0)]);
        let mut streamer = ChunkStreamer::new(store, CountingFactory::default());
        streamer.sync();

        streamer.store_mut().remove_chunk(ChunkCoord::new(0, 0, 0));
        streamer
            .store_mut()
            .add_chunk(Chunk::new(ChunkCoord::new(0, 0, 0), 4))
            .unwrap();

        let stats = streamer.sync();
        assert_eq!(stats.refreshed, 1);
        assert_eq!(streamer.factory().uploads.len(), 2);
    }

    #[test]
    fn test_removed_chunk_buffer_dropped() {
        let store = store_with(&[(0, 0, 0), (1, 0, 0)]);
        let mut streamer = ChunkStreamer::new(store, CountingFactory::default());
        streamer.sync();

        streamer.store_mut().remove_chunk(ChunkCoord::new(0, 0, 0));
        let stats = streamer.sync();
        assert_eq!(stats.dropped, 1);
        assert_eq!(streamer.buffer_count(), 1);
        assert!(streamer.handle(ChunkCoord::new(0, 0, 0)).is_none());
    }

    #[test]
    fn test_ordered_is_far_to_near() {
        let coords: Vec<(i32, i32, i32)> = (0..4)
            .flat_map(|x| (0..3).map(move |y| (x, y, x % 2)))
            .collect();
        let mut streamer = ChunkStreamer::new(store_with(&coords), CountingFactory::default());

        let viewer = Vec3::new(1.0, 1.0, 1.0);
        let order = streamer.ordered(viewer);
        assert_eq!(order.len(), coords.len());
        for pair in order.as_slice().windows(2) {
            assert!(pair[0].distance() >= pair[1].distance());
        }
        let nearest = order.as_slice().last().unwrap();
        assert_eq!(nearest.position(), ChunkCoord::new(0, 0, 0));
    }

    #[test]
    fn test_ordering_follows_viewer() {
        let store = store_with(&[(0, 0, 0), (5, 0, 0)]);
        let mut streamer = ChunkStreamer::new(store, CountingFactory::default());

        let first: Vec<ChunkCoord> = streamer
            .ordered(Vec3::ZERO)
            .iter()
            .map(|item| item.position())
            .collect();
        assert_eq!(first, vec![ChunkCoord::new(5, 0, 0), ChunkCoord::new(0, 0, 0)]);

        let second: Vec<ChunkCoord> = streamer
            .ordered(Vec3::new(22.0, 2.0, 2.0))
            .iter()
            .map(|item| item.position())
            .collect();
        assert_eq!(second, vec![ChunkCoord::new(0, 0, 0), ChunkCoord::new(5, 0, 0)]);

        // Moving the viewer never re-uploads
        assert_eq!(streamer.factory().uploads.len(), 2);
    }

    #[test]
    fn test_order_pairs_chunk_with_its_handle() {
        let store = store_with(&[(0, 0, 0), (3, 0, 0)]);
        let mut streamer = ChunkStreamer::new(store, CountingFactory::default());
        streamer.sync();
        let far = *streamer.handle(ChunkCoord::new(3, 0, 0)).unwrap();

        let order = streamer.ordered(Vec3::ZERO);
        let first = order.iter().next().unwrap();
        assert_eq!(first.chunk().position(), ChunkCoord::new(3, 0, 0));
        assert_eq!(*first.handle(), far);
    }

    #[test]
    fn test_evict_by_distance() {
        let store = store_with(&[(0, 0, 0), (1, 0, 0), (10, 0, 0)]);
        let budget = ResidencyBudget::unlimited().with_max_distance(16.0);
        let mut streamer = ChunkStreamer::with_budget(store, CountingFactory::default(), budget);
        streamer.sync();

        let evicted = streamer.evict(Vec3::ZERO);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].position(), ChunkCoord::new(10, 0, 0));
        assert_eq!(streamer.store().len(), 2);
        assert_eq!(streamer.buffer_count(), 2);
    }

    #[test]
    fn test_evict_by_count_removes_farthest() {
        let store = store_with(&[(0, 0, 0), (1, 0, 0), (2, 0, 0), (3, 0, 0)]);
        let budget = ResidencyBudget::unlimited().with_max_chunks(2);
        let mut streamer = ChunkStreamer::with_budget(store, CountingFactory::default(), budget);

        let evicted: Vec<i32> = streamer
            .evict(Vec3::ZERO)
            .iter()
            .map(|c| c.position().x)
            .collect();
        assert_eq!(evicted, vec![3, 2]);
        assert!(streamer.store().contains(ChunkCoord::new(0, 0, 0)));
        assert!(streamer.store().contains(ChunkCoord::new(1, 0, 0)));
    }

    #[test]
    fn test_evict_by_gpu_bytes() {
        let store = store_with(&[(0, 0, 0), (1, 0, 0), (2, 0, 0)]);
        let budget = ResidencyBudget::unlimited().with_gpu_budget_bytes(64);
        let mut streamer = ChunkStreamer::with_budget(store, CountingFactory::default(), budget);
        streamer.sync();
        assert_eq!(streamer.gpu_bytes(), 192);

        let evicted = streamer.evict(Vec3::ZERO);
        assert_eq!(evicted.len(), 2);
        assert_eq!(streamer.gpu_bytes(), 64);
        assert!(streamer.store().contains(ChunkCoord::new(0, 0, 0)));
    }

    #[test]
    fn test_evict_ignores_buffers_of_removed_chunks() {
        let store = store_with(&[(0, 0, 0), (1, 0, 0), (2, 0, 0)]);
        let budget = ResidencyBudget::unlimited().with_gpu_budget_bytes(128);
        let mut streamer = ChunkStreamer::with_budget(store, CountingFactory::default(), budget);
        streamer.sync();
        streamer.store_mut().remove_chunk(ChunkCoord::new(2, 0, 0));

        assert!(streamer.evict(Vec3::ZERO).is_empty());
        assert_eq!(streamer.store().len(), 2);
        assert_eq!(streamer.gpu_bytes(), 128);
    }

    #[test]
    fn test_evict_counts_chunks_added_since_sync() {
        let store = store_with(&[(0, 0, 0)]);
        let budget = ResidencyBudget::unlimited().with_gpu_budget_bytes(64);
        let mut streamer = ChunkStreamer::with_budget(store, CountingFactory::default(), budget);
        streamer.sync();
        streamer
            .add_chunk(Chunk::new(ChunkCoord::new(3, 0, 0), 4))
            .unwrap();

        let evicted = streamer.evict(Vec3::ZERO);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].position(), ChunkCoord::new(3, 0, 0));
        assert_eq!(streamer.gpu_bytes(), 64);
    }

    #[test]
    fn test_evict_within_budget_is_noop() {
        let store = store_with(&[(0, 0, 0), (1, 0, 0)]);
        let mut streamer = ChunkStreamer::new(store, CountingFactory::default());
        assert!(streamer.evict(Vec3::splat(1000.0)).is_empty());
        assert_eq!(streamer.store().len(), 2);
    }

    #[test]
    fn test_world_uniform() {
        let streamer = ChunkStreamer::new(ChunkStore::new(4).unwrap(), CountingFactory::default());
        let uniform = streamer.world_uniform(16);
        assert_eq!(uniform.world_size, 16);
        assert_eq!(uniform.chunk_size, 4);
        let sun = Vec3::from_array(uniform.sun_direction);
        assert!((sun.length() - 1.0).abs() < 1e-5);
    }
}
