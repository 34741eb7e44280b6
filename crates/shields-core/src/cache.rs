//! Bounded recency cache
//!
//! Backs both the third-party host cache and the HTTPS upgrade result cache.
//! Callers wrap it in their own lock; nothing here is synchronized.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Fixed-size LRU cache.
///
/// Each entry carries a recency stamp; `order` maps stamps back to keys so the
/// oldest entry is the first one in the map and promotion is a re-stamp.
#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: usize,
    entries: HashMap<K, (V, u64)>,
    order: BTreeMap<u64, K>,
    tick: u64,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a new LRU cache with the given capacity (at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: BTreeMap::new(),
            tick: 0,
        }
    }

    /// Get a value from the cache, promoting it to most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let newest = self.tick;
        let entry = self.entries.get_mut(key)?;

        // Already the most recently used entry
        if entry.1 != newest {
            self.tick += 1;
            if let Some(key) = self.order.remove(&entry.1) {
                self.order.insert(self.tick, key);
            }
            entry.1 = self.tick;
        }

        Some(&entry.0)
    }

    /// Insert a value, evicting the least recently used entry when full.
    pub fn insert(&mut self, key: K, value: V) {
        self.tick += 1;
        let stamp = self.tick;

        if let Some(entry) = self.entries.get_mut(&key) {
            let previous = std::mem::replace(&mut entry.1, stamp);
            entry.0 = value;
            if let Some(key) = self.order.remove(&previous) {
                self.order.insert(stamp, key);
            }
            return;
        }

        if self.entries.len() >= self.capacity {
            if let Some((_, oldest)) = self.order.pop_first() {
                self.entries.remove(&oldest);
            }
        }

        self.order.insert(stamp, key.clone());
        self.entries.insert(key, (value, stamp));
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clear the cache.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
