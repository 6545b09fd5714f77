//! GPU buffer cache keyed by chunk
//!
//! Holds one renderer handle per chunk together with the chunk revision it was
//! built from. A cached entry is fresh while the revisions match; once the chunk
//! changes the entry is stale and the streamer rebuilds it.

use std::collections::HashMap;

use crate::voxel::chunk::ChunkKey;

/// A renderer buffer built from one chunk
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedBuffer<H> {
    /// Opaque handle returned by the buffer factory
    pub handle: H,
    /// Chunk revision the buffer was built from
    pub revision: u64,
    /// Size of the uploaded voxel data
    pub bytes: usize,
}

/// Map of chunk keys to cached renderer buffers
pub struct BufferCache<H> {
    entries: HashMap<ChunkKey, CachedBuffer<H>>,
    /// Running total of `bytes` across all entries
    total_bytes: usize,
}

impl<H> Default for BufferCache<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> BufferCache<H> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            total_bytes: 0,
        }
    }

    /// Cached entry for a chunk, fresh or stale
    pub fn get(&self, key: ChunkKey) -> Option<&CachedBuffer<H>> {
        self.entries.get(&key)
    }

    /// Handle for a chunk, whatever its freshness
    pub fn handle(&self, key: ChunkKey) -> Option<&H> {
        self.entries.get(&key).map(|entry| &entry.handle)
    }

    /// Whether the chunk has an entry built from `revision`
    pub fn is_fresh(&self, key: ChunkKey, revision: u64) -> bool {
        self.entries
            .get(&key)
            .is_some_and(|entry| entry.revision == revision)
    }

    /// Insert or replace the entry for a chunk
    ///
    /// # Returns
    /// The previous entry, if the chunk had one
    pub fn insert(&mut self, key: ChunkKey, entry: CachedBuffer<H>) -> Option<CachedBuffer<H>> {
        self.total_bytes = self.total_bytes.saturating_add(entry.bytes);
        let old = self.entries.insert(key, entry);
        if let Some(old) = &old {
            self.total_bytes = self.total_bytes.saturating_sub(old.bytes);
        }
        old
    }

    /// Remove the entry for a chunk
    pub fn remove(&mut self, key: ChunkKey) -> Option<CachedBuffer<H>> {
        let old = self.entries.remove(&key)?;
        self.total_bytes = self.total_bytes.saturating_sub(old.bytes);
        Some(old)
    }

    /// Drop every entry for which `keep` returns false, returning the dropped entries
    pub fn retain_keys<F>(&mut self, mut keep: F) -> Vec<(ChunkKey, CachedBuffer<H>)>
    where
        F: FnMut(ChunkKey) -> bool,
    {
        let doomed: Vec<ChunkKey> = self.entries.keys().copied().filter(|&k| !keep(k)).collect();
        doomed
            .into_iter()
            .filter_map(|key| self.remove(key).map(|entry| (key, entry)))
            .collect()
    }

    pub fn contains(&self, key: ChunkKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes uploaded across all cached buffers
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn keys(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.entries.keys().copied()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::chunk::ChunkCoord;

    fn key(x: i32, y: i32, z: i32) -> ChunkKey {
        ChunkKey::pack(ChunkCoord::new(x, y, z)).unwrap()
    }

    fn entry(handle: u32, revision: u64) -> CachedBuffer<u32> {
        CachedBuffer {
            handle,
            revision,
            bytes: 64,
        }
    }

    #[test]
    fn test_cache_new() {
        let cache: BufferCache<u32> = BufferCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.total_bytes(), 0);
    }

    #[test]
    fn test_cache_insert_and_get() {
        let mut cache = BufferCache::new();
        assert!(cache.insert(key(0, 0, 0), entry(7, 3)).is_none());

        assert!(cache.contains(key(0, 0, 0)));
        assert_eq!(cache.handle(key(0, 0, 0)), Some(&7));
        assert_eq!(cache.get(key(0, 0, 0)).map(|e| e.revision), Some(3));
        assert!(cache.get(key(1, 0, 0)).is_none());
        assert_eq!(cache.total_bytes(), 64);
    }

    #[test]
    fn test_cache_insert_replace() {
        let mut cache = BufferCache::new();
        cache.insert(key(1, 2, 3), entry(1, 1));
        let old = cache.insert(key(1, 2, 3), entry(2, 5));

        assert_eq!(old, Some(entry(1, 1)));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.handle(key(1, 2, 3)), Some(&2));
        assert_eq!(cache.total_bytes(), 64);
    }

    #[test]
    fn test_cache_freshness() {
        let mut cache = BufferCache::new();
        cache.insert(key(0, 0, 0), entry(1, 10));

        assert!(cache.is_fresh(key(0, 0, 0), 10));
        assert!(!cache.is_fresh(key(0, 0, 0), 11));
        assert!(!cache.is_fresh(key(0, 1, 0), 10));
    }

    #[test]
    fn test_cache_remove() {
        let mut cache = BufferCache::new();
        cache.insert(key(0, 0, 0), entry(1, 1));
        cache.insert(key(1, 0, 0), entry(2, 1));

        assert_eq!(cache.remove(key(0, 0, 0)).map(|e| e.handle), Some(1));
        assert!(cache.remove(key(0, 0, 0)).is_none());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total_bytes(), 64);
    }

    #[test]
    fn test_cache_retain_keys() {
        let mut cache = BufferCache::new();
        for x in 0..4 {
            cache.insert(key(x, 0, 0), entry(x as u32, 1));
        }

        let mut dropped = cache.retain_keys(|k| k.unpack().x % 2 == 0);
        dropped.sort_by_key(|(k, _)| *k);

        assert_eq!(dropped.len(), 2);
        assert_eq!(dropped[0].0, key(1, 0, 0));
        assert_eq!(dropped[1].1.handle, 3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.total_bytes(), 128);
    }

    #[test]
    fn test_cache_clear() {
        let mut cache = BufferCache::new();
        cache.insert(key(0, 0, 0), entry(1, 1));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.total_bytes(), 0);
        assert_eq!(cache.keys().count(), 0);
    }
}
