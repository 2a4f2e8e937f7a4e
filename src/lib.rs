#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Tasker Result Cache
//!
//! Pluggable key-value cache backend for task result state.
//!
//! ## Overview
//!
//! A backend is named by a URI such as `memcache://10.0.0.1:11211;10.0.0.2:11211/`
//! or `memory://`. Networked schemes use whichever memcached client library is
//! compiled in, chosen once per process. `memory://` keeps results in a bounded
//! in-process LRU cache.
//!
//! ## Module Organization
//!
//! - [`cache`] - Backends, client resolution, and the LRU fallback
//! - [`config`] - Application-level cache settings
//! - [`constants`] - Key prefixes and defaults
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust
//! use tasker_result_cache::CacheBackend;
//!
//! let backend = CacheBackend::from_uri("memory://").unwrap();
//! backend.store_task_meta("task-1", b"{\"status\":\"SUCCESS\"}").unwrap();
//! assert!(backend.get_task_meta("task-1").unwrap().is_some());
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod logging;

pub use cache::{
    BackendKind, BackendOptions, BackendSnapshot, CacheBackend, CacheBackendBuilder, CacheClient,
    CacheError, CacheResult, ClientResolver,
};
pub use config::{CacheSettings, SettingsLoader};
pub use logging::init_structured_logging;
