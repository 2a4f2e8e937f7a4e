//! Cache client implementations

pub mod memory;

#[cfg(feature = "cache-memcache")]
pub mod memcache;

#[cfg(feature = "cache-async-memcached")]
pub mod async_memcached;

pub use memory::FallbackClient;

#[cfg(feature = "cache-memcache")]
pub use self::memcache::MemcacheClient;

#[cfg(feature = "cache-async-memcached")]
pub use self::async_memcached::AsyncMemcachedClient;
