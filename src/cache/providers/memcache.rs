//! Memcached client backed by the `memcache` crate
//!
//! Preferred client library. Supports multiple servers (keys are hashed
//! across them by the crate) and post-construction tuning through the
//! `behaviors` option. Requires the `cache-memcache` feature.

use crate::cache::errors::{CacheError, CacheResult};
use crate::cache::traits::CacheClient;
use crate::cache::types::{BackendOptions, CacheKey, CacheValue};
use crate::constants::options;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Blocking memcached client over one or more servers
pub struct MemcacheClient {
    client: memcache::Client,
    servers: Vec<String>,
}

impl std::fmt::Debug for MemcacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemcacheClient")
            .field("servers", &self.servers)
            .finish()
    }
}

impl MemcacheClient {
    /// Connect to the given `host:port` servers.
    ///
    /// Options other than `behaviors` have no counterpart in this client and
    /// are logged and ignored.
    pub fn connect(servers: &[String], opts: &BackendOptions) -> CacheResult<Self> {
        if servers.is_empty() {
            return Err(CacheError::configuration(
                "Memcached backend requires at least one server address",
            ));
        }

        for name in opts.keys() {
            debug!(option = %name, "Option not used by memcache client");
        }

        let urls: Vec<String> = servers.iter().map(|s| to_memcache_url(s)).collect();
        let client = memcache::Client::connect(urls).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to memcached: {}", e))
        })?;

        debug!(servers = ?servers, "Memcache client connected");

        Ok(Self {
            client,
            servers: servers.to_vec(),
        })
    }

    /// Apply tuning behaviors after construction
    pub fn apply_behaviors(&self, behaviors: &serde_json::Value) -> CacheResult<()> {
        let Some(behaviors) = behaviors.as_object() else {
            return Err(CacheError::configuration(format!(
                "behaviors must be a mapping, got {}",
                behaviors
            )));
        };

        for (name, value) in behaviors {
            match name.as_str() {
                options::READ_TIMEOUT_MS => {
                    let timeout = timeout_from(name, value)?;
                    self.client.set_read_timeout(timeout).map_err(|e| {
                        CacheError::BackendError(format!("Failed to set read timeout: {}", e))
                    })?;
                }
                options::WRITE_TIMEOUT_MS => {
                    let timeout = timeout_from(name, value)?;
                    self.client.set_write_timeout(timeout).map_err(|e| {
                        CacheError::BackendError(format!("Failed to set write timeout: {}", e))
                    })?;
                }
                other => {
                    warn!(behavior = other, "Unknown memcache behavior, skipping");
                    continue;
                }
            }
            debug!(behavior = %name, value = %value, "Applied memcache behavior");
        }

        Ok(())
    }
}

impl CacheClient for MemcacheClient {
    fn get(&self, key: &[u8]) -> CacheResult<Option<CacheValue>> {
        let key = key_str(key)?;
        let result: Option<Vec<u8>> = self
            .client
            .get(key)
            .map_err(|e| CacheError::BackendError(format!("Memcached GET failed: {}", e)))?;

        if result.is_some() {
            debug!(key = key, "Cache HIT (memcache)");
        } else {
            debug!(key = key, "Cache MISS (memcache)");
        }
        Ok(result)
    }

    fn get_multi(&self, keys: &[CacheKey]) -> CacheResult<HashMap<CacheKey, CacheValue>> {
        let keys = keys
            .iter()
            .map(|k| key_str(k))
            .collect::<CacheResult<Vec<&str>>>()?;

        let found: HashMap<String, Vec<u8>> = self
            .client
            .gets(&keys)
            .map_err(|e| CacheError::BackendError(format!("Memcached GETS failed: {}", e)))?;

        debug!(
            requested = keys.len(),
            found = found.len(),
            "Cache MGET (memcache)"
        );
        Ok(found
            .into_iter()
            .map(|(k, v)| (k.into_bytes(), v))
            .collect())
    }

    fn set(&self, key: &[u8], value: &[u8], ttl_seconds: u32) -> CacheResult<()> {
        let key = key_str(key)?;
        self.client
            .set(key, value, ttl_seconds)
            .map_err(|e| CacheError::BackendError(format!("Memcached SET failed: {}", e)))?;

        debug!(key = key, ttl_seconds = ttl_seconds, "Cache SET (memcache)");
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> CacheResult<()> {
        let key = key_str(key)?;
        // Returns false when the key did not exist, which is fine
        self.client
            .delete(key)
            .map_err(|e| CacheError::BackendError(format!("Memcached DELETE failed: {}", e)))?;

        debug!(key = key, "Cache DEL (memcache)");
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "memcache"
    }
}

/// `host:port` -> `memcache://host:port`; full URLs pass through
fn to_memcache_url(server: &str) -> String {
    if server.contains("://") {
        server.to_string()
    } else {
        format!("memcache://{}", server)
    }
}

fn key_str(key: &[u8]) -> CacheResult<&str> {
    std::str::from_utf8(key)
        .map_err(|e| CacheError::BackendError(format!("Memcached keys must be UTF-8: {}", e)))
}

fn timeout_from(name: &str, value: &serde_json::Value) -> CacheResult<Option<Duration>> {
    match value {
        serde_json::Value::Null => Ok(None),
        v => v
            .as_u64()
            .map(|ms| Some(Duration::from_millis(ms)))
            .ok_or_else(|| {
                CacheError::configuration(format!(
                    "behavior {} expects milliseconds, got {}",
                    name, v
                ))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_memcache_url() {
        assert_eq!(to_memcache_url("127.0.0.1:11211"), "memcache://127.0.0.1:11211");
        assert_eq!(
            to_memcache_url("memcache://cache:11211?timeout=2"),
            "memcache://cache:11211?timeout=2"
        );
    }

    #[test]
    fn test_timeout_from() {
        assert_eq!(
            timeout_from("read_timeout_ms", &serde_json::json!(250)).unwrap(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(
            timeout_from("read_timeout_ms", &serde_json::Value::Null).unwrap(),
            None
        );
        assert!(timeout_from("read_timeout_ms", &serde_json::json!("fast")).is_err());
    }

    #[test]
    fn test_connect_requires_servers() {
        let err = MemcacheClient::connect(&[], &BackendOptions::new()).unwrap_err();
        assert!(err.is_configuration());
    }

    // Requires a running memcached (MEMCACHED_URL, default 127.0.0.1:11211)
    #[cfg(feature = "test-services")]
    mod integration {
        use super::*;

        fn test_servers() -> Vec<String> {
            vec![std::env::var("MEMCACHED_URL").unwrap_or_else(|_| "127.0.0.1:11211".to_string())]
        }

        #[test]
        fn test_memcache_crud_operations() {
            let client = match MemcacheClient::connect(&test_servers(), &BackendOptions::new()) {
                Ok(client) => client,
                Err(e) => {
                    warn!("Skipping memcache test (not available): {}", e);
                    return;
                }
            };

            let key = format!("test:crud:{}", uuid::Uuid::new_v4());
            client.set(key.as_bytes(), b"payload", 60).unwrap();
            assert_eq!(client.get(key.as_bytes()).unwrap(), Some(b"payload".to_vec()));

            let found = client
                .get_multi(&[key.clone().into_bytes(), b"test:absent".to_vec()])
                .unwrap();
            assert_eq!(found.len(), 1);

            client.delete(key.as_bytes()).unwrap();
            client.delete(key.as_bytes()).unwrap();
            assert_eq!(client.get(key.as_bytes()).unwrap(), None);
        }

        #[test]
        fn test_memcache_behaviors() {
            let client = match MemcacheClient::connect(&test_servers(), &BackendOptions::new()) {
                Ok(client) => client,
                Err(e) => {
                    warn!("Skipping memcache test (not available): {}", e);
                    return;
                }
            };

            client
                .apply_behaviors(&serde_json::json!({"read_timeout_ms": 500, "tcp_nodelay": true}))
                .unwrap();
        }
    }
}
