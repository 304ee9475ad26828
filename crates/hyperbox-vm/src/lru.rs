// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bounded least-recently-used cache

use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::hash::Hash;

/// A key-value store that evicts the least recently used entry once it
/// holds more than `capacity` entries.
///
/// Every `get`, `has` and `set` counts as a use. A capacity of `None`
/// never evicts.
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    capacity: Option<usize>,
    entries: FxHashMap<K, (V, u64)>,
    /// Use tick -> key, oldest first
    order: BTreeMap<u64, K>,
    tick: u64,
}

impl<K: Hash + Eq + Clone, V: Clone> BoundedCache<K, V> {
    /// Create a cache holding at most `capacity` entries.
    ///
    /// A capacity of zero is treated as unbounded.
    pub fn new(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity).filter(|&c| c > 0))
    }

    /// Create a cache that never evicts
    pub fn unbounded() -> Self {
        Self::with_capacity(None)
    }

    /// Create a cache with an optional bound
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            entries: FxHashMap::default(),
            order: BTreeMap::new(),
            tick: 0,
        }
    }

    /// Get a value, marking it as recently used
    pub fn get(&mut self, key: &K) -> Option<V> {
        self.touch(key)?;
        self.entries.get(key).map(|(value, _)| value.clone())
    }

    /// Get a value without touching its recency
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|(value, _)| value)
    }

    /// Check if a key is cached, marking it as recently used
    pub fn has(&mut self, key: &K) -> bool {
        self.touch(key).is_some()
    }

    /// Insert or replace a value, evicting the oldest entries if the
    /// cache is over capacity
    pub fn set(&mut self, key: K, value: V) {
        let tick = self.next_tick();
        if let Some((_, old)) = self.entries.insert(key.clone(), (value, tick)) {
            self.order.remove(&old);
        }
        self.order.insert(tick, key);

        if let Some(capacity) = self.capacity {
            while self.entries.len() > capacity {
                let Some((_, oldest)) = self.order.pop_first() else {
                    break;
                };
                self.entries.remove(&oldest);
            }
        }
    }

    /// Remove an entry
    pub fn delete(&mut self, key: &K) -> Option<V> {
        let (value, tick) = self.entries.remove(key)?;
        self.order.remove(&tick);
        Some(value)
    }

    /// Remove every entry
    pub fn reset(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Number of cached entries
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The configured bound, if any
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    fn touch(&mut self, key: &K) -> Option<()> {
        let tick = self.next_tick();
        let (_, used) = self.entries.get_mut(key)?;
        let old = std::mem::replace(used, tick);
        if let Some(key) = self.order.remove(&old) {
            self.order.insert(tick, key);
        }
        Some(())
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = BoundedCache::new(2);
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.get(&"a"), Some(1));

        cache.set("c", 3);
        assert_eq!(cache.size(), 2);
        assert!(cache.peek(&"b").is_none());
        assert_eq!(cache.peek(&"a"), Some(&1));
        assert_eq!(cache.peek(&"c"), Some(&3));
    }

    #[test]
    fn test_has_refreshes_without_evicting() {
        let mut cache = BoundedCache::new(2);
        cache.set("a", 1);
        cache.set("b", 2);
        assert!(cache.has(&"a"));
        assert!(!cache.has(&"z"));
        assert_eq!(cache.size(), 2);

        cache.set("c", 3);
        assert!(cache.peek(&"a").is_some());
        assert!(cache.peek(&"b").is_none());
    }

    #[test]
    fn test_replace_keeps_single_entry() {
        let mut cache = BoundedCache::new(2);
        cache.set("a", 1);
        cache.set("a", 2);
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.get(&"a"), Some(2));
    }

    #[test]
    fn test_reset_and_delete() {
        let mut cache = BoundedCache::unbounded();
        for i in 0..100 {
            cache.set(i, i * 2);
        }
        assert_eq!(cache.size(), 100);
        assert_eq!(cache.delete(&10), Some(20));
        assert_eq!(cache.size(), 99);

        cache.reset();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn test_zero_capacity_is_unbounded() {
        let mut cache = BoundedCache::new(0);
        cache.set(1, 1);
        cache.set(2, 2);
        assert_eq!(cache.size(), 2);
        assert_eq!(cache.capacity(), None);
    }
}
