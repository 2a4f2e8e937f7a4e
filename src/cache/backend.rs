//! Cache backend for task result state
//!
//! A [`CacheBackend`] moves through three states:
//!
//! ```text
//! unconfigured --new()/builder()--> configured --first operation--> client-bound
//! ```
//!
//! Construction validates everything up front (scheme, options, expiry) and
//! fails fast. The client itself is built lazily on the first cache operation,
//! exactly once per instance, and reused until the instance is dropped.
//!
//! A backend can describe itself as a [`BackendSnapshot`] (URI, expiry,
//! merged options) and be rebuilt from one in another process with its own,
//! independently bound client.

use super::errors::{CacheError, CacheResult};
use super::providers::FallbackClient;
use super::resolver::ClientResolver;
use super::scheme::{BackendKind, BackendUri};
use super::traits::CacheClient;
use super::types::{BackendOptions, CacheKey, CacheValue};
use crate::config::CacheSettings;
use crate::constants::{TASKSET_KEY_PREFIX, TASK_KEY_PREFIX};
use crate::logging::log_cache_operation;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// The client a backend is bound to
pub(crate) enum BoundClient {
    /// In-process LRU fallback (`memory://`)
    Fallback(FallbackClient),
    /// Client from the resolved memcached library
    Network(Box<dyn CacheClient>),
}

impl BoundClient {
    fn as_client(&self) -> &dyn CacheClient {
        match self {
            Self::Fallback(client) => client,
            Self::Network(client) => client.as_ref(),
        }
    }
}

/// Scheme, servers, options, and expiry of a backend
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub servers: Vec<String>,
    pub options: BackendOptions,
    /// Result TTL in whole seconds
    pub expires: u32,
}

impl BackendConfig {
    /// Describe this configuration for transport
    pub fn to_snapshot(&self) -> BackendSnapshot {
        BackendSnapshot {
            backend: BackendUri::new(self.kind, self.servers.clone()).render(),
            expires: self.expires,
            options: self.options.clone(),
        }
    }

    /// Rebuild a configuration from a snapshot
    pub fn from_snapshot(snapshot: &BackendSnapshot) -> CacheResult<Self> {
        let uri = BackendUri::parse(&snapshot.backend)?;
        Ok(Self {
            kind: uri.kind,
            servers: uri.servers,
            options: snapshot.options.clone(),
            expires: snapshot.expires,
        })
    }
}

/// Compact, serializable description of a backend: enough to rebuild an
/// equivalent instance elsewhere
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSnapshot {
    /// `scheme://server1;server2/`
    pub backend: String,
    /// Result TTL in whole seconds
    pub expires: u32,
    /// Options, already merged with the application defaults
    pub options: BackendOptions,
}

impl BackendSnapshot {
    pub fn to_json(&self) -> CacheResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> CacheResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Key-value cache backend for task and task-set results
pub struct CacheBackend {
    config: BackendConfig,
    task_keyprefix: &'static str,
    taskset_keyprefix: &'static str,
    resolver: Arc<ClientResolver>,
    client: OnceCell<BoundClient>,
}

impl fmt::Debug for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheBackend")
            .field("config", &self.config)
            .field(
                "client",
                &self.client.get().map(|c| c.as_client().provider_name()),
            )
            .finish()
    }
}

impl CacheBackend {
    /// Create a backend from application settings and explicit overrides.
    ///
    /// - `expires` overrides `settings.expires_seconds`
    /// - `backend` (a URI) overrides `settings.backend`
    /// - `options` are merged over `settings.backend_options`; explicit keys win
    pub fn new(
        settings: &CacheSettings,
        expires: Option<u32>,
        backend: Option<&str>,
        options: BackendOptions,
    ) -> CacheResult<Self> {
        Self::builder()
            .settings(settings.clone())
            .expires_opt(expires)
            .backend_opt(backend)
            .options(options)
            .build()
    }

    /// Create a backend from a URI with default settings
    pub fn from_uri(uri: &str) -> CacheResult<Self> {
        Self::builder().backend(uri).build()
    }

    pub fn builder() -> CacheBackendBuilder {
        CacheBackendBuilder::default()
    }

    /// Rebuild a backend from a snapshot, using the process-wide resolver
    pub fn from_snapshot(snapshot: &BackendSnapshot) -> CacheResult<Self> {
        Self::from_snapshot_with_resolver(snapshot, ClientResolver::global())
    }

    pub fn from_snapshot_with_resolver(
        snapshot: &BackendSnapshot,
        resolver: Arc<ClientResolver>,
    ) -> CacheResult<Self> {
        let config = BackendConfig::from_snapshot(snapshot)?;
        debug!(backend = %snapshot.backend, "Rebuilding cache backend from snapshot");
        Ok(Self::from_config(config, resolver))
    }

    fn from_config(config: BackendConfig, resolver: Arc<ClientResolver>) -> Self {
        Self {
            config,
            task_keyprefix: TASK_KEY_PREFIX,
            taskset_keyprefix: TASKSET_KEY_PREFIX,
            resolver,
            client: OnceCell::new(),
        }
    }

    /// Describe this backend for transport
    pub fn to_snapshot(&self) -> BackendSnapshot {
        self.config.to_snapshot()
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn kind(&self) -> BackendKind {
        self.config.kind
    }

    pub fn scheme(&self) -> &'static str {
        self.config.kind.scheme()
    }

    pub fn servers(&self) -> &[String] {
        &self.config.servers
    }

    pub fn options(&self) -> &BackendOptions {
        &self.config.options
    }

    pub fn expires(&self) -> u32 {
        self.config.expires
    }

    /// Whether the client has been constructed yet
    pub fn is_bound(&self) -> bool {
        self.client.get().is_some()
    }

    /// Name of the bound client, binding it if needed
    pub fn provider_name(&self) -> CacheResult<&'static str> {
        Ok(self.client()?.provider_name())
    }

    /// Key for an individual task result
    pub fn key_for_task(&self, task_id: &str) -> CacheKey {
        format!("{}{}", self.task_keyprefix, task_id).into_bytes()
    }

    /// Key for a task-set (grouped) result
    pub fn key_for_taskset(&self, taskset_id: &str) -> CacheKey {
        format!("{}{}", self.taskset_keyprefix, taskset_id).into_bytes()
    }

    /// Fetch a value; `Ok(None)` when absent
    pub fn get(&self, key: &[u8]) -> CacheResult<Option<CacheValue>> {
        self.client()?.get(key)
    }

    /// Fetch several values; keys not found are absent from the map
    pub fn mget(&self, keys: &[CacheKey]) -> CacheResult<HashMap<CacheKey, CacheValue>> {
        self.client()?.get_multi(keys)
    }

    /// Store a value with this backend's expiry
    pub fn set(&self, key: &[u8], value: &[u8]) -> CacheResult<()> {
        self.client()?.set(key, value, self.config.expires)
    }

    /// Remove a value; absent keys are not an error
    pub fn delete(&self, key: &[u8]) -> CacheResult<()> {
        self.client()?.delete(key)
    }

    /// Store the encoded result of a task
    pub fn store_task_meta(&self, task_id: &str, meta: &[u8]) -> CacheResult<()> {
        self.set(&self.key_for_task(task_id), meta)
    }

    /// Encoded result of a task, if cached
    pub fn get_task_meta(&self, task_id: &str) -> CacheResult<Option<CacheValue>> {
        self.get(&self.key_for_task(task_id))
    }

    /// Drop a task's cached result
    pub fn forget_task(&self, task_id: &str) -> CacheResult<()> {
        self.delete(&self.key_for_task(task_id))
    }

    /// Results for several tasks, keyed by task id; uncached tasks are absent
    pub fn get_many_task_meta(&self, task_ids: &[&str]) -> CacheResult<HashMap<String, CacheValue>> {
        let keys: Vec<CacheKey> = task_ids.iter().map(|id| self.key_for_task(id)).collect();
        let found = self.mget(&keys)?;

        let prefix = self.task_keyprefix.as_bytes();
        Ok(found
            .into_iter()
            .filter_map(|(key, value)| {
                let id = key.strip_prefix(prefix)?;
                Some((String::from_utf8_lossy(id).into_owned(), value))
            })
            .collect())
    }

    /// Store the encoded result of a task set
    pub fn save_taskset(&self, taskset_id: &str, result: &[u8]) -> CacheResult<()> {
        self.set(&self.key_for_taskset(taskset_id), result)
    }

    /// Encoded result of a task set, if cached
    pub fn restore_taskset(&self, taskset_id: &str) -> CacheResult<Option<CacheValue>> {
        self.get(&self.key_for_taskset(taskset_id))
    }

    /// Drop a task set's cached result
    pub fn delete_taskset(&self, taskset_id: &str) -> CacheResult<()> {
        self.delete(&self.key_for_taskset(taskset_id))
    }

    /// The bound client, constructing it on first use.
    ///
    /// A failed construction leaves the backend unbound; the next operation
    /// tries again.
    fn client(&self) -> CacheResult<&dyn CacheClient> {
        let bound = self.client.get_or_try_init(|| self.bind())?;
        Ok(bound.as_client())
    }

    fn bind(&self) -> CacheResult<BoundClient> {
        let scheme = self.config.kind.scheme();
        match self
            .config
            .kind
            .connect(&self.config.servers, &self.config.options, &self.resolver)
        {
            Ok(bound) => {
                let provider = bound.as_client().provider_name();
                log_cache_operation("bind", scheme, Some(provider), "success", None);
                Ok(bound)
            }
            Err(e) => {
                warn!(backend = scheme, error = %e, "Failed to bind cache client");
                log_cache_operation("bind", scheme, None, "failed", Some(&e.to_string()));
                Err(e)
            }
        }
    }
}

/// Fluent construction of a [`CacheBackend`]
#[derive(Debug, Default)]
pub struct CacheBackendBuilder {
    settings: Option<CacheSettings>,
    expires: Option<u32>,
    backend: Option<String>,
    options: BackendOptions,
    resolver: Option<Arc<ClientResolver>>,
}

impl CacheBackendBuilder {
    /// Application defaults; `CacheSettings::default()` when not given
    pub fn settings(mut self, settings: CacheSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn expires(mut self, seconds: u32) -> Self {
        self.expires = Some(seconds);
        self
    }

    pub fn expires_opt(mut self, seconds: Option<u32>) -> Self {
        self.expires = seconds;
        self
    }

    /// Backend URI, overriding the settings' backend
    pub fn backend<S: Into<String>>(mut self, uri: S) -> Self {
        self.backend = Some(uri.into());
        self
    }

    pub fn backend_opt(mut self, uri: Option<&str>) -> Self {
        self.backend = uri.map(String::from);
        self
    }

    /// Add one explicit option
    pub fn option<S: Into<String>>(mut self, name: S, value: serde_json::Value) -> Self {
        self.options.insert(name.into(), value);
        self
    }

    /// Add explicit options
    pub fn options(mut self, options: BackendOptions) -> Self {
        self.options.extend(options);
        self
    }

    /// Resolver to bind networked clients with; the process-wide one by default
    pub fn resolver(mut self, resolver: Arc<ClientResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn build(self) -> CacheResult<CacheBackend> {
        let settings = self.settings.unwrap_or_default();

        // An empty explicit backend defers to the settings
        let backend = non_blank(self.backend)
            .or_else(|| non_blank(settings.backend))
            .ok_or_else(|| {
                CacheError::configuration(format!(
                    "No cache backend configured. Please use one of the following backends: {}",
                    BackendKind::registered_names().join(", ")
                ))
            })?;
        let uri = BackendUri::parse(&backend)?;

        let mut options = settings.backend_options;
        options.extend(self.options);

        let expires = self.expires.unwrap_or(settings.expires_seconds);

        let config = BackendConfig {
            kind: uri.kind,
            servers: uri.servers,
            options,
            expires,
        };

        debug!(
            backend = %config.kind,
            servers = ?config.servers,
            expires = config.expires,
            "Cache backend configured"
        );

        let resolver = self.resolver.unwrap_or_else(ClientResolver::global);
        Ok(CacheBackend::from_config(config, resolver))
    }
}

fn non_blank(uri: Option<String>) -> Option<String> {
    uri.filter(|uri| !uri.trim().is_empty())
}
