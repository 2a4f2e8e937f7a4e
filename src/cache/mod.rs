//! # Result Cache Module
//!
//! Key-value storage for task results, addressed by backend URI.
//!
//! ## Architecture
//!
//! ```text
//! CacheBackend                       <- configured eagerly, bound lazily
//!   └── BoundClient (enum)
//!         ├── Network(Box<dyn CacheClient>)  <- picked by ClientResolver
//!         │     ├── MemcacheClient           (feature cache-memcache)
//!         │     └── AsyncMemcachedClient     (feature cache-async-memcached)
//!         └── Fallback(FallbackClient)       <- BoundedLruCache, TTL ignored
//! ```
//!
//! ## Design Decisions
//!
//! - **Closed scheme set**: `memcache`, `memcached`, `libmemcached`, `memory`
//! - **Resolve once**: the client library is chosen on first networked use and
//!   memoized per resolver
//! - **Lazy binding**: constructing a backend never opens a connection
//! - **Snapshots**: a backend can be rebuilt elsewhere from URI, expiry, and
//!   options alone

pub mod backend;
pub mod errors;
pub mod lru;
pub mod providers;
pub mod resolver;
pub mod scheme;
pub mod traits;
pub mod types;

pub use backend::{BackendConfig, BackendSnapshot, CacheBackend, CacheBackendBuilder};
pub use errors::{CacheError, CacheResult};
pub use lru::BoundedLruCache;
pub use providers::FallbackClient;
pub use resolver::{ClientDescriptor, ClientLibrary, ClientResolver};
pub use scheme::{BackendKind, BackendUri};
pub use traits::CacheClient;
pub use types::{BackendOptions, CacheKey, CacheValue};

#[cfg(feature = "cache-memcache")]
pub use providers::MemcacheClient;

#[cfg(feature = "cache-async-memcached")]
pub use providers::AsyncMemcachedClient;
