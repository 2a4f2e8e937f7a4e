//! Cache client trait definition

use super::errors::CacheResult;
use super::types::{CacheKey, CacheValue};
use std::collections::HashMap;

/// The capability surface every cache client provides
///
/// Implemented by the in-process fallback client and by both networked
/// memcached clients. All operations are blocking.
pub trait CacheClient: Send + Sync {
    /// Get a value by key
    ///
    /// Returns `Ok(Some(value))` on a hit, `Ok(None)` on a miss.
    fn get(&self, key: &[u8]) -> CacheResult<Option<CacheValue>>;

    /// Get several keys at once; keys that are not found are absent from the map
    fn get_multi(&self, keys: &[CacheKey]) -> CacheResult<HashMap<CacheKey, CacheValue>>;

    /// Store a value with a time-to-live in whole seconds
    fn set(&self, key: &[u8], value: &[u8], ttl_seconds: u32) -> CacheResult<()>;

    /// Remove a key; succeeds whether or not the key existed
    fn delete(&self, key: &[u8]) -> CacheResult<()>;

    /// Name of the client implementation, for logs and diagnostics
    fn provider_name(&self) -> &'static str;
}
