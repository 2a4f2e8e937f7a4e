//! Bounded least-recently-used map
//!
//! Backs the in-process fallback client. Recency is tracked with a
//! monotonically increasing access tick: every hit or insert stamps the entry
//! with a fresh tick, and the entry holding the smallest tick is the one
//! evicted when the map is full.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

use crate::constants::DEFAULT_FALLBACK_CAPACITY;

struct Slot<V> {
    value: V,
    tick: u64,
}

/// Fixed-capacity map that evicts the least recently used entry
///
/// `get`, `contains` and `insert` all count as a use. `peek` does not.
/// Operations never fail; a missing key is reported as `None`.
pub struct BoundedLruCache<K, V> {
    capacity: usize,
    entries: HashMap<K, Slot<V>>,
    /// tick -> key, smallest tick first
    order: BTreeMap<u64, K>,
    clock: u64,
}

impl<K, V> BoundedLruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a cache holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity.min(DEFAULT_FALLBACK_CAPACITY)),
            order: BTreeMap::new(),
            clock: 0,
        }
    }

    /// Create a cache with the fallback default of 5000 entries
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_FALLBACK_CAPACITY)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a key, promoting it to most recently used on a hit
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.touch(key) {
            self.entries.get(key).map(|slot| &slot.value)
        } else {
            None
        }
    }

    /// Membership test; a present key is promoted like on `get`
    pub fn contains<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.touch(key)
    }

    /// Look up a key without changing its recency
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).map(|slot| &slot.value)
    }

    /// Insert or update a key and make it the most recently used entry.
    ///
    /// When a new key would push the map past capacity, the least recently
    /// used entry is evicted first and returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        let tick = self.next_tick();

        if let Some(slot) = self.entries.get_mut(&key) {
            self.order.remove(&slot.tick);
            slot.value = value;
            slot.tick = tick;
            self.order.insert(tick, key);
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.pop_lru()
        } else {
            None
        };

        self.order.insert(tick, key.clone());
        self.entries.insert(key, Slot { value, tick });
        evicted
    }

    /// Remove a key; absent keys are a no-op
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = self.entries.remove(key)?;
        self.order.remove(&slot.tick);
        Some(slot.value)
    }

    /// Fetch every present key from `keys`.
    ///
    /// Hits are promoted in request order; misses leave the order untouched.
    pub fn get_many<'a, I>(&mut self, keys: I) -> HashMap<K, V>
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
        V: Clone,
    {
        let mut found = HashMap::new();
        for key in keys {
            if let Some(value) = self.get(key) {
                let value = value.clone();
                found.insert(key.clone(), value);
            }
        }
        found
    }

    /// Evict and return the least recently used entry
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let (_, key) = self.order.pop_first()?;
        let slot = self.entries.remove(&key)?;
        Some((key, slot.value))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Keys from least to most recently used
    pub fn keys_lru_order(&self) -> impl Iterator<Item = &K> {
        self.order.values()
    }

    fn next_tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn touch<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let tick = self.next_tick();
        match self.entries.get_mut(key) {
            Some(slot) => {
                if let Some(owned) = self.order.remove(&slot.tick) {
                    self.order.insert(tick, owned);
                }
                slot.tick = tick;
                true
            }
            None => false,
        }
    }
}

impl<K, V> Default for BoundedLruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl<K, V> fmt::Debug for BoundedLruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedLruCache")
            .field("capacity", &self.capacity)
            .field("len", &self.entries.len())
            .finish()
    }
}
