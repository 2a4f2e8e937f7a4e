//! Memcached client backed by the `async-memcached` crate
//!
//! Alternate client library, used when the preferred `memcache` client is not
//! compiled in. The async client is driven by a private current-thread tokio
//! runtime so it can sit behind the blocking [`CacheClient`] surface; do not
//! call it from inside another tokio runtime.
//!
//! One connection is opened per server and keys are spread across them with a
//! stable FNV-1a hash. This client has no tuning behaviors.
//! Requires the `cache-async-memcached` feature.

use crate::cache::errors::{CacheError, CacheResult};
use crate::cache::traits::CacheClient;
use crate::cache::types::{BackendOptions, CacheKey, CacheValue};
use async_memcached::{AsciiProtocol, Client, Status};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::runtime::Runtime;
use tracing::debug;

/// Blocking facade over per-server async memcached connections
pub struct AsyncMemcachedClient {
    runtime: Runtime,
    connections: Vec<Mutex<Client>>,
    servers: Vec<String>,
}

impl std::fmt::Debug for AsyncMemcachedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncMemcachedClient")
            .field("servers", &self.servers)
            .field("connections", &self.connections.len())
            .finish()
    }
}

impl AsyncMemcachedClient {
    /// Open one connection per `host:port` server
    pub fn connect(servers: &[String], opts: &BackendOptions) -> CacheResult<Self> {
        if servers.is_empty() {
            return Err(CacheError::configuration(
                "Memcached backend requires at least one server address",
            ));
        }

        for name in opts.keys() {
            debug!(option = %name, "Option not used by async-memcached client");
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                CacheError::ConnectionError(format!("Failed to start memcached runtime: {}", e))
            })?;

        let mut connections = Vec::with_capacity(servers.len());
        for server in servers {
            let dsn = to_dsn(server);
            let client = runtime.block_on(Client::new(&dsn)).map_err(|e| {
                CacheError::ConnectionError(format!(
                    "Failed to connect to memcached at {}: {}",
                    server, e
                ))
            })?;
            connections.push(Mutex::new(client));
        }

        debug!(servers = ?servers, "Async memcached client connected");

        Ok(Self {
            runtime,
            connections,
            servers: servers.to_vec(),
        })
    }

    fn connection_for(&self, key: &[u8]) -> &Mutex<Client> {
        let index = (fnv1a(key) % self.connections.len() as u64) as usize;
        &self.connections[index]
    }
}

impl CacheClient for AsyncMemcachedClient {
    fn get(&self, key: &[u8]) -> CacheResult<Option<CacheValue>> {
        let mut client = self.connection_for(key).lock();

        let result = self
            .runtime
            .block_on(client.get(key))
            .map_err(|e| CacheError::BackendError(format!("Memcached GET failed: {}", e)))?;

        match result {
            Some(value) => {
                debug!(key = %String::from_utf8_lossy(key), "Cache HIT (async-memcached)");
                Ok(Some(value.data.unwrap_or_default()))
            }
            None => {
                debug!(key = %String::from_utf8_lossy(key), "Cache MISS (async-memcached)");
                Ok(None)
            }
        }
    }

    fn get_multi(&self, keys: &[CacheKey]) -> CacheResult<HashMap<CacheKey, CacheValue>> {
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.get(key)? {
                found.insert(key.clone(), value);
            }
        }
        Ok(found)
    }

    fn set(&self, key: &[u8], value: &[u8], ttl_seconds: u32) -> CacheResult<()> {
        let mut client = self.connection_for(key).lock();

        self.runtime
            .block_on(client.set(key, value, Some(i64::from(ttl_seconds)), None))
            .map_err(|e| CacheError::BackendError(format!("Memcached SET failed: {}", e)))?;

        debug!(
            key = %String::from_utf8_lossy(key),
            ttl_seconds = ttl_seconds,
            "Cache SET (async-memcached)"
        );
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> CacheResult<()> {
        let mut client = self.connection_for(key).lock();

        delete_outcome(self.runtime.block_on(client.delete(key)))?;

        debug!(key = %String::from_utf8_lossy(key), "Cache DEL (async-memcached)");
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "async-memcached"
    }
}

/// NOT_FOUND counts as a successful delete; anything else is a failure
fn delete_outcome(result: Result<(), async_memcached::Error>) -> CacheResult<()> {
    match result {
        Ok(()) | Err(async_memcached::Error::Protocol(Status::NotFound)) => Ok(()),
        Err(e) => Err(CacheError::BackendError(format!(
            "Memcached DELETE failed: {}",
            e
        ))),
    }
}

fn to_dsn(server: &str) -> String {
    if server.contains("://") {
        server.to_string()
    } else {
        format!("tcp://{}", server)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_dsn() {
        assert_eq!(to_dsn("localhost:11211"), "tcp://localhost:11211");
        assert_eq!(to_dsn("tcp://localhost:11211"), "tcp://localhost:11211");
    }

    #[test]
    fn test_fnv1a_is_stable() {
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"task-meta-1"), fnv1a(b"task-meta-1"));
        assert_ne!(fnv1a(b"task-meta-1"), fnv1a(b"task-meta-2"));
    }

    #[test]
    fn test_connect_requires_servers() {
        let err = AsyncMemcachedClient::connect(&[], &BackendOptions::new()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unreachable_server_is_connection_error() {
        // Nothing listens on the discard port locally
        let err = AsyncMemcachedClient::connect(&["127.0.0.1:9".to_string()], &BackendOptions::new())
            .unwrap_err();
        assert!(matches!(err, CacheError::ConnectionError(_)), "got {:?}", err);
    }

    #[test]
    fn test_delete_outcome() {
        assert!(delete_outcome(Ok(())).is_ok());
        assert!(delete_outcome(Err(async_memcached::Error::Protocol(Status::NotFound))).is_ok());

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "connection reset");
        let err = delete_outcome(Err(async_memcached::Error::Io(io))).unwrap_err();
        assert!(matches!(err, CacheError::BackendError(_)));
        assert!(err.to_string().contains("DELETE failed"));

        let err = delete_outcome(Err(async_memcached::Error::Protocol(Status::NotStored)));
        assert!(err.is_err());
    }

    #[cfg(feature = "test-services")]
    mod integration {
        use super::*;
        use tracing::warn;

        #[test]
        fn test_async_memcached_crud_operations() {
            let server =
                std::env::var("MEMCACHED_URL").unwrap_or_else(|_| "127.0.0.1:11211".to_string());
            let client = match AsyncMemcachedClient::connect(&[server], &BackendOptions::new()) {
                Ok(client) => client,
                Err(e) => {
                    warn!("Skipping async-memcached test (not available): {}", e);
                    return;
                }
            };

            let key = format!("test:crud:{}", uuid::Uuid::new_v4());
            client.set(key.as_bytes(), b"payload", 60).unwrap();
            assert_eq!(client.get(key.as_bytes()).unwrap(), Some(b"payload".to_vec()));

            client.delete(key.as_bytes()).unwrap();
            assert_eq!(client.get(key.as_bytes()).unwrap(), None);
        }
    }
}
