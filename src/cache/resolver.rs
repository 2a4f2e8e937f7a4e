//! # Memcached Client Resolution
//!
//! Picks, once, which memcached client library backs the `memcache`-family
//! schemes, and builds configured clients from it.
//!
//! ## Preference order
//!
//! 1. [`ClientLibrary::Memcache`]: the `memcache` crate (feature `cache-memcache`).
//!    Supports the `behaviors` tuning option.
//! 2. [`ClientLibrary::AsyncMemcached`]: the `async-memcached` crate
//!    (feature `cache-async-memcached`). Has no tuning behaviors; a `behaviors`
//!    option is dropped without effect.
//!
//! ## Memoization
//!
//! A resolver stores its result in a [`OnceCell`]. The first successful
//! resolution wins and every later call returns the same descriptor;
//! concurrent first callers block on the cell instead of racing. A failed
//! resolution is *not* stored, so the next call probes again.
//!
//! [`ClientResolver::global`] is the process-wide instance that backends use
//! unless one is passed in explicitly.

use super::errors::{CacheError, CacheResult};
use super::traits::CacheClient;
use super::types::BackendOptions;
use crate::constants::options;
use once_cell::sync::{Lazy, OnceCell};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

#[cfg(feature = "cache-memcache")]
use super::providers::MemcacheClient;

#[cfg(feature = "cache-async-memcached")]
use super::providers::AsyncMemcachedClient;

static GLOBAL_RESOLVER: Lazy<Arc<ClientResolver>> = Lazy::new(|| Arc::new(ClientResolver::new()));

/// A memcached client library this crate can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientLibrary {
    /// The `memcache` crate (preferred)
    Memcache,
    /// The `async-memcached` crate
    AsyncMemcached,
}

impl ClientLibrary {
    /// All libraries, most preferred first
    pub const PREFERENCE: [ClientLibrary; 2] =
        [ClientLibrary::Memcache, ClientLibrary::AsyncMemcached];

    pub fn crate_name(&self) -> &'static str {
        match self {
            Self::Memcache => "memcache",
            Self::AsyncMemcached => "async-memcached",
        }
    }

    /// Cargo feature that compiles this library in
    pub fn feature(&self) -> &'static str {
        match self {
            Self::Memcache => "cache-memcache",
            Self::AsyncMemcached => "cache-async-memcached",
        }
    }

    /// Whether the library is compiled into this build
    pub fn is_available(&self) -> bool {
        match self {
            Self::Memcache => cfg!(feature = "cache-memcache"),
            Self::AsyncMemcached => cfg!(feature = "cache-async-memcached"),
        }
    }

    /// Whether the `behaviors` option has any effect on this library
    pub fn supports_behaviors(&self) -> bool {
        matches!(self, Self::Memcache)
    }
}

impl fmt::Display for ClientLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.crate_name())
    }
}

/// Outcome of a resolution: which library, and whether it takes `behaviors`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientDescriptor {
    pub library: ClientLibrary,
    pub supports_behaviors: bool,
}

impl ClientDescriptor {
    fn for_library(library: ClientLibrary) -> Self {
        Self {
            library,
            supports_behaviors: library.supports_behaviors(),
        }
    }
}

/// Resolves and memoizes the memcached client library
#[derive(Debug)]
pub struct ClientResolver {
    candidates: Vec<ClientLibrary>,
    resolved: OnceCell<ClientDescriptor>,
}

impl ClientResolver {
    /// Resolver over every known library
    pub fn new() -> Self {
        Self::with_candidates(ClientLibrary::PREFERENCE)
    }

    /// Resolver restricted to `candidates`. Preference order is kept
    /// regardless of the order given.
    pub fn with_candidates<I>(candidates: I) -> Self
    where
        I: IntoIterator<Item = ClientLibrary>,
    {
        let allowed: Vec<ClientLibrary> = candidates.into_iter().collect();
        let candidates = ClientLibrary::PREFERENCE
            .into_iter()
            .filter(|library| allowed.contains(library))
            .collect();

        Self {
            candidates,
            resolved: OnceCell::new(),
        }
    }

    /// Handle to the process-wide resolver
    pub fn global() -> Arc<ClientResolver> {
        Arc::clone(&GLOBAL_RESOLVER)
    }

    /// Resolve the client library, probing only if no earlier call succeeded
    pub fn resolve(&self) -> CacheResult<&ClientDescriptor> {
        self.resolved.get_or_try_init(|| self.probe())
    }

    /// The memoized descriptor, if resolution has succeeded
    pub fn resolved(&self) -> Option<&ClientDescriptor> {
        self.resolved.get()
    }

    /// Build a client for `servers`.
    ///
    /// `behaviors` is taken out of the options and applied after construction,
    /// but only when the resolved library supports it.
    pub fn connect(
        &self,
        servers: &[String],
        opts: &BackendOptions,
    ) -> CacheResult<Box<dyn CacheClient>> {
        let descriptor = *self.resolve()?;
        let (opts, behaviors) = split_behaviors(&descriptor, opts);

        match descriptor.library {
            ClientLibrary::Memcache => connect_memcache(servers, &opts, behaviors.as_ref()),
            ClientLibrary::AsyncMemcached => connect_async_memcached(servers, &opts),
        }
    }

    fn probe(&self) -> CacheResult<ClientDescriptor> {
        for library in &self.candidates {
            if library.is_available() {
                info!(
                    library = %library,
                    supports_behaviors = library.supports_behaviors(),
                    "Resolved memcached client library"
                );
                return Ok(ClientDescriptor::for_library(*library));
            }
            debug!(library = %library, feature = library.feature(), "Client library not available");
        }

        Err(CacheError::configuration(format!(
            "Memcached backend requires either the '{}' or '{}' client library \
             (enable the '{}' or '{}' feature)",
            ClientLibrary::Memcache,
            ClientLibrary::AsyncMemcached,
            ClientLibrary::Memcache.feature(),
            ClientLibrary::AsyncMemcached.feature(),
        )))
    }
}

impl Default for ClientResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Take `behaviors` out of the constructor options. It is returned only when
/// the resolved library can apply it.
fn split_behaviors(
    descriptor: &ClientDescriptor,
    opts: &BackendOptions,
) -> (BackendOptions, Option<serde_json::Value>) {
    let mut opts = opts.clone();
    let behaviors = opts.remove(options::BEHAVIORS);

    if descriptor.supports_behaviors {
        return (opts, behaviors);
    }
    if behaviors.is_some() {
        debug!(
            library = %descriptor.library,
            "Ignoring behaviors option: client library has no tuning behaviors"
        );
    }
    (opts, None)
}

#[cfg(feature = "cache-memcache")]
fn connect_memcache(
    servers: &[String],
    opts: &BackendOptions,
    behaviors: Option<&serde_json::Value>,
) -> CacheResult<Box<dyn CacheClient>> {
    let client = MemcacheClient::connect(servers, opts)?;
    if let Some(behaviors) = behaviors {
        client.apply_behaviors(behaviors)?;
    }
    Ok(Box::new(client))
}

#[cfg(not(feature = "cache-memcache"))]
fn connect_memcache(
    _servers: &[String],
    _opts: &BackendOptions,
    _behaviors: Option<&serde_json::Value>,
) -> CacheResult<Box<dyn CacheClient>> {
    Err(not_compiled(ClientLibrary::Memcache))
}

#[cfg(feature = "cache-async-memcached")]
fn connect_async_memcached(
    servers: &[String],
    opts: &BackendOptions,
) -> CacheResult<Box<dyn CacheClient>> {
    Ok(Box::new(AsyncMemcachedClient::connect(servers, opts)?))
}

#[cfg(not(feature = "cache-async-memcached"))]
fn connect_async_memcached(
    _servers: &[String],
    _opts: &BackendOptions,
) -> CacheResult<Box<dyn CacheClient>> {
    Err(not_compiled(ClientLibrary::AsyncMemcached))
}

#[allow(dead_code)]
fn not_compiled(library: ClientLibrary) -> CacheError {
    CacheError::configuration(format!(
        "Client library '{}' is not compiled in (enable the '{}' feature)",
        library,
        library.feature()
    ))
}
