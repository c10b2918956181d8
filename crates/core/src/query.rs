//! Cached name/tag lookups over a point-in-time snapshot of the store.
//!
//! The snapshot is tagged with the store revision it was read at. `sync`
//! reloads it, and drops every cached result, whenever the store has been
//! written since.

use std::collections::{HashMap, VecDeque};
use storage::{RecordStore, TrackedFile};
use tracing::debug;

/// Fixed-capacity map that evicts the least recently used key.
#[derive(Debug)]
pub struct LruCache<V> {
    entries: HashMap<String, V>,
    access_order: VecDeque<String>,
    capacity: usize,
}

impl<V: Clone> LruCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            access_order: VecDeque::new(),
            capacity,
        }
    }

    pub fn get(&mut self, key: &str) -> Option<V> {
        let value = self.entries.get(key)?.clone();
        self.touch(key);
        Some(value)
    }

    pub fn insert(&mut self, key: &str, value: V) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity && !self.entries.contains_key(key) {
            match self.access_order.pop_front() {
                Some(evicted) => {
                    self.entries.remove(&evicted);
                }
                None => break,
            }
        }
        self.entries.insert(key.to_string(), value);
        self.touch(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.access_order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn touch(&mut self, key: &str) {
        self.access_order.retain(|k| k != key);
        self.access_order.push_back(key.to_string());
    }
}

#[derive(Debug)]
pub struct QueryEngine {
    snapshot: Vec<TrackedFile>,
    revision: Option<u64>,
    name_cache: LruCache<Vec<TrackedFile>>,
    tag_cache: LruCache<Vec<TrackedFile>>,
}

impl QueryEngine {
    pub fn new(capacity: usize) -> Self {
        Self {
            snapshot: Vec::new(),
            revision: None,
            name_cache: LruCache::new(capacity),
            tag_cache: LruCache::new(capacity),
        }
    }

    /// Builds an engine over a fixed set of records, detached from any store.
    pub fn with_snapshot(snapshot: Vec<TrackedFile>, capacity: usize) -> Self {
        let mut engine = Self::new(capacity);
        engine.snapshot = snapshot;
        engine
    }

    /// Reloads the snapshot if `store` changed since it was taken.
    pub fn sync(&mut self, store: &RecordStore) {
        let current = store.revision();
        if self.revision == Some(current) {
            return;
        }
        self.snapshot = store.list();
        self.revision = Some(current);
        self.clear_cache();
        debug!(revision = current, records = self.snapshot.len(), "query snapshot reloaded");
    }

    /// Forces the next `sync` to reload.
    pub fn invalidate(&mut self) {
        self.revision = None;
        self.clear_cache();
    }

    pub fn clear_cache(&mut self) {
        self.name_cache.clear();
        self.tag_cache.clear();
    }

    /// Records whose filename contains `query`, ignoring case.
    pub fn by_name(&mut self, query: &str) -> Vec<TrackedFile> {
        if let Some(hit) = self.name_cache.get(query) {
            return hit;
        }
        let needle = query.to_lowercase();
        let found: Vec<TrackedFile> = self
            .snapshot
            .iter()
            .filter(|f| f.record.filename.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        self.name_cache.insert(query, found.clone());
        found
    }

    /// Records carrying exactly `tag`.
    pub fn by_tag(&mut self, tag: &str) -> Vec<TrackedFile> {
        if let Some(hit) = self.tag_cache.get(tag) {
            return hit;
        }
        let found: Vec<TrackedFile> = self
            .snapshot
            .iter()
            .filter(|f| f.record.has_tag(tag))
            .cloned()
            .collect();
        self.tag_cache.insert(tag, found.clone());
        found
    }

    /// Cached entries as `(by_name, by_tag)`.
    pub fn cache_len(&self) -> (usize, usize) {
        (self.name_cache.len(), self.tag_cache.len())
    }
}
