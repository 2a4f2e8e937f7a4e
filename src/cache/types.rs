//! Core type definitions for the cache layer

use std::collections::BTreeMap;

/// Namespaced cache key, opaque to clients
pub type CacheKey = Vec<u8>;

/// Already-encoded cache value; never interpreted here
pub type CacheValue = Vec<u8>;

/// Backend-specific tuning parameters, passed through to the client constructor.
///
/// Ordered so that equal option sets compare and serialize identically.
pub type BackendOptions = BTreeMap<String, serde_json::Value>;
