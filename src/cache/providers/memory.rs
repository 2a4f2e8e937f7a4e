//! In-process fallback cache client
//!
//! Stands in for a memcached client when no cache service is configured.
//! Backed by a single [`BoundedLruCache`] behind a mutex.
//!
//! **TTL is ignored.** Entries leave the cache only through capacity-based
//! LRU eviction or an explicit delete, never by age. Callers that need
//! time-based expiry get weaker guarantees here than with a networked backend.

use crate::cache::errors::CacheResult;
use crate::cache::lru::BoundedLruCache;
use crate::cache::traits::CacheClient;
use crate::cache::types::{BackendOptions, CacheKey, CacheValue};
use crate::constants::{options, DEFAULT_FALLBACK_CAPACITY};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, warn};

/// In-memory client with a fixed entry limit
pub struct FallbackClient {
    cache: Mutex<BoundedLruCache<CacheKey, CacheValue>>,
}

impl std::fmt::Debug for FallbackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cache = self.cache.lock();
        f.debug_struct("FallbackClient")
            .field("capacity", &cache.capacity())
            .field("entry_count", &cache.len())
            .finish()
    }
}

impl FallbackClient {
    /// Create a fallback client holding up to 5000 entries
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FALLBACK_CAPACITY)
    }

    /// Create a fallback client with an explicit entry limit
    pub fn with_capacity(capacity: usize) -> Self {
        debug!(capacity = capacity, "Fallback in-memory cache client created");
        Self {
            cache: Mutex::new(BoundedLruCache::new(capacity)),
        }
    }

    /// Build from backend options. Server addresses are meaningless here and
    /// ignored; only `max_entries` is read.
    pub fn from_options(servers: &[String], opts: &BackendOptions) -> Self {
        if !servers.is_empty() {
            debug!(servers = ?servers, "Fallback cache ignores server addresses");
        }

        let capacity = match opts.get(options::MAX_ENTRIES) {
            None => DEFAULT_FALLBACK_CAPACITY,
            Some(value) => match value.as_u64().and_then(|n| usize::try_from(n).ok()) {
                Some(n) if n > 0 => n,
                _ => {
                    warn!(
                        value = %value,
                        "Invalid max_entries for fallback cache, using default"
                    );
                    DEFAULT_FALLBACK_CAPACITY
                }
            },
        };

        Self::with_capacity(capacity)
    }

    pub fn capacity(&self) -> usize {
        self.cache.lock().capacity()
    }

    /// Number of entries currently held
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}

impl Default for FallbackClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheClient for FallbackClient {
    fn get(&self, key: &[u8]) -> CacheResult<Option<CacheValue>> {
        let result = self.cache.lock().get(key).cloned();

        if result.is_some() {
            debug!(key = %String::from_utf8_lossy(key), "Cache HIT (memory)");
        } else {
            debug!(key = %String::from_utf8_lossy(key), "Cache MISS (memory)");
        }

        Ok(result)
    }

    fn get_multi(&self, keys: &[CacheKey]) -> CacheResult<HashMap<CacheKey, CacheValue>> {
        let found = self.cache.lock().get_many(keys);
        debug!(
            requested = keys.len(),
            found = found.len(),
            "Cache MGET (memory)"
        );
        Ok(found)
    }

    fn set(&self, key: &[u8], value: &[u8], _ttl_seconds: u32) -> CacheResult<()> {
        // Capacity-bounded only; TTL is not applied
        let evicted = self
            .cache
            .lock()
            .insert(key.to_vec(), value.to_vec());

        if let Some((evicted_key, _)) = evicted {
            debug!(
                evicted = %String::from_utf8_lossy(&evicted_key),
                "Evicted least recently used entry (memory)"
            );
        }
        debug!(key = %String::from_utf8_lossy(key), "Cache SET (memory)");
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> CacheResult<()> {
        self.cache.lock().remove(key);
        debug!(key = %String::from_utf8_lossy(key), "Cache DEL (memory)");
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
