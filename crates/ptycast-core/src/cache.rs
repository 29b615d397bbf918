//! Bounded insertion-ordered cache.
//!
//! Prompt classification is re-run constantly against a slowly growing
//! buffer, so results are memoized. The cache is explicitly bounded:
//! capacity and eviction are parameters, and ownership sits with whichever
//! layer wants sharing instead of ambient module state.

use std::collections::{HashMap, VecDeque};

/// Fraction of entries evicted when the cache overflows (1/5 = 20%).
const EVICT_DIVISOR: usize = 5;

/// A string-keyed cache that evicts the oldest entries on overflow.
#[derive(Debug)]
pub struct BoundedCache<V> {
    map: HashMap<String, V>,
    order: VecDeque<String>,
    capacity: usize,
}

impl<V: Clone> BoundedCache<V> {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.map.get(key).cloned()
    }

    /// Insert a value, evicting the oldest ~20% of entries if full.
    pub fn insert(&mut self, key: String, value: V) {
        if self.map.insert(key.clone(), value).is_some() {
            return; // refreshed an existing entry, order unchanged
        }
        self.order.push_back(key);

        if self.order.len() > self.capacity {
            let evict = (self.capacity / EVICT_DIVISOR).max(1);
            for _ in 0..evict {
                if let Some(old) = self.order.pop_front() {
                    self.map.remove(&old);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_insert() {
        let mut cache = BoundedCache::new(10);
        assert_eq!(cache.get("a"), None);
        cache.insert("a".into(), true);
        assert_eq!(cache.get("a"), Some(true));
    }

    #[test]
    fn test_evicts_oldest_on_overflow() {
        let mut cache = BoundedCache::new(10);
        for i in 0..11 {
            cache.insert(format!("k{i}"), i);
        }
        // 10/5 = 2 oldest entries evicted when the 11th arrived.
        assert_eq!(cache.len(), 9);
        assert_eq!(cache.get("k0"), None);
        assert_eq!(cache.get("k1"), None);
        assert_eq!(cache.get("k2"), Some(2));
        assert_eq!(cache.get("k10"), Some(10));
    }

    #[test]
    fn test_reinsert_does_not_duplicate_order() {
        let mut cache = BoundedCache::new(5);
        cache.insert("a".into(), 1);
        cache.insert("a".into(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a"), Some(2));
    }
}
