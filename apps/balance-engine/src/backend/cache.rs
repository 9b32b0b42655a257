//! Bounded TTL cache for backend responses.
//!
//! An explicit, injected cache object: bounded capacity with LRU eviction,
//! per-cache TTL, and a [`Clock`] seam so tests drive expiry with a manual
//! clock. Expired entries are dropped on access; there is no background
//! cleanup task.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Time source for cache expiry.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Wall-clock time source used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// Bounded TTL cache with LRU eviction.
pub struct TtlCache<K, V> {
    capacity: usize,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: HashMap<K, Entry<V>>,
    // Recency order, least recent at the front.
    order: VecDeque<K>,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create a cache with the given capacity and TTL.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            clock,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Look up a fresh entry, refreshing its recency.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let now = self.clock.now();
        match self.entries.get(key) {
            Some(entry) if now.duration_since(entry.inserted_at) < self.ttl => {
                let value = entry.value.clone();
                self.touch(key);
                Some(value)
            }
            Some(_) => {
                self.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert a value, evicting the least recently used entry when full.
    pub fn insert(&mut self, key: K, value: V) {
        if self.entries.contains_key(&key) {
            self.remove(&key);
        }

        while self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(
            key,
            Entry {
                value,
                inserted_at: self.clock.now(),
            },
        );
    }

    /// Number of live entries (including any not-yet-collected expired ones).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }

    fn remove(&mut self, key: &K) {
        self.entries.remove(key);
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }
}
