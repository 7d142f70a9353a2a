//! Bounded least-recently-used cache
//!
//! Capacity is either a number of entries or an approximate byte budget
//! computed by a caller-supplied size function. Evicted entries are handed
//! to an optional callback.

use lru::LruCache;
use std::hash::Hash;

/// How the cache bounds its contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCapacity {
    /// At most this many entries
    Entries(usize),
    /// At most this many bytes, as reported by the size function
    Bytes(usize),
}

type SizeFn<V> = Box<dyn Fn(&V) -> usize + Send + Sync>;
type EvictFn<K, V> = Box<dyn Fn(&K, &V) + Send + Sync>;

pub struct BoundedCache<K: Hash + Eq, V> {
    entries: LruCache<K, V>,
    capacity: CacheCapacity,
    size_of: SizeFn<V>,
    on_evict: Option<EvictFn<K, V>>,
    total_bytes: usize,
}

impl<K: Hash + Eq, V> BoundedCache<K, V> {
    /// Cache bounded by entry count
    pub fn with_entries(max_entries: usize) -> Self {
        Self::new(CacheCapacity::Entries(max_entries), |_| 0)
    }

    /// Cache bounded by `capacity`; `size_of` reports an entry's bytes
    pub fn new(capacity: CacheCapacity, size_of: impl Fn(&V) -> usize + Send + Sync + 'static) -> Self {
        Self {
            entries: LruCache::unbounded(),
            capacity,
            size_of: Box::new(size_of),
            on_evict: None,
            total_bytes: 0,
        }
    }

    /// Install a callback invoked for every evicted entry
    pub fn with_evict_callback(mut self, on_evict: impl Fn(&K, &V) + Send + Sync + 'static) -> Self {
        self.on_evict = Some(Box::new(on_evict));
        self
    }

    /// Insert (or replace) an entry and evict least-recently-used entries
    /// until the cache is within capacity. The newest entry is never
    /// evicted by its own insertion.
    pub fn insert(&mut self, key: K, value: V) {
        self.total_bytes += (self.size_of)(&value);
        if let Some(old) = self.entries.put(key, value) {
            self.total_bytes -= (self.size_of)(&old);
        }
        while self.entries.len() > 1 && self.over_capacity() {
            match self.entries.pop_lru() {
                Some((k, v)) => {
                    self.total_bytes -= (self.size_of)(&v);
                    if let Some(cb) = &self.on_evict {
                        cb(&k, &v);
                    }
                }
                None => break,
            }
        }
    }

    fn over_capacity(&self) -> bool {
        match self.capacity {
            CacheCapacity::Entries(n) => self.entries.len() > n,
            CacheCapacity::Bytes(n) => self.total_bytes > n,
        }
    }

    /// Look up an entry, marking it most recently used
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Look up an entry without touching recency
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.peek(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains(key)
    }

    /// Remove an entry without invoking the eviction callback
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let value = self.entries.pop(key)?;
        self.total_bytes -= (self.size_of)(&value);
        Some(value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_bytes = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of entry sizes
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Entries from most to least recently used
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_entry_capacity_evicts_lru() {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let sink = evicted.clone();
        let mut cache = BoundedCache::with_entries(2).with_evict_callback(move |k: &u32, _: &&str| {
            sink.lock().unwrap().push(*k);
        });

        cache.insert(1, "a");
        cache.insert(2, "b");
        assert_eq!(cache.get(&1), Some(&"a"));
        cache.insert(3, "c");

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&1));
        assert!(!cache.contains(&2));
        assert_eq!(*evicted.lock().unwrap(), vec![2]);
    }

    #[test]
    fn test_byte_capacity() {
        let mut cache = BoundedCache::new(CacheCapacity::Bytes(10), |v: &Vec<u8>| v.len());
        cache.insert("a", vec![0; 4]);
        cache.insert("b", vec![0; 4]);
        assert_eq!(cache.total_bytes(), 8);
        cache.insert("c", vec![0; 4]);
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&"a"));

        // oversized entry still admitted on its own
        cache.insert("big", vec![0; 50]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total_bytes(), 50);
    }

    #[test]
    fn test_replace_and_remove_track_bytes() {
        let mut cache = BoundedCache::new(CacheCapacity::Bytes(100), |v: &String| v.len());
        cache.insert(1, "abc".to_string());
        cache.insert(1, "abcdef".to_string());
        assert_eq!(cache.total_bytes(), 6);
        assert_eq!(cache.remove(&1), Some("abcdef".to_string()));
        assert_eq!(cache.total_bytes(), 0);
        assert!(cache.is_empty());
    }
}
