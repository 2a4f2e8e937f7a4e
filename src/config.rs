//! # Cache Settings
//!
//! Application-level defaults for cache backends: which backend URI to use,
//! the options every backend receives, and the default result expiry.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. A settings file (`config/cache.toml` unless another path is given);
//!    any format the `config` crate recognizes by extension
//! 3. Environment variables prefixed `TASKER_CACHE_`
//!    (`TASKER_CACHE_BACKEND`, `TASKER_CACHE_EXPIRES_SECONDS`)
//!
//! ```toml
//! backend = "memcache://10.0.0.1:11211;10.0.0.2:11211/"
//! expires_seconds = 3600
//!
//! [backend_options.behaviors]
//! read_timeout_ms = 500
//! ```

use crate::cache::errors::{CacheError, CacheResult};
use crate::cache::scheme::BackendUri;
use crate::cache::types::BackendOptions;
use crate::constants::{DEFAULT_EXPIRES_SECONDS, DEFAULT_SETTINGS_FILE, SETTINGS_ENV_PREFIX};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application-wide cache defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Backend URI, e.g. `memory://` or `memcache://host:11211/`
    pub backend: Option<String>,
    /// Options merged under every backend's explicit options
    pub backend_options: BackendOptions,
    /// Default result expiry in seconds
    pub expires_seconds: u32,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: None,
            backend_options: BackendOptions::new(),
            expires_seconds: DEFAULT_EXPIRES_SECONDS,
        }
    }
}

impl CacheSettings {
    /// Load from `config/cache.toml` (if present) and the environment
    pub fn load() -> CacheResult<Self> {
        SettingsLoader::new().load()
    }

    /// Load from a specific file, which must exist, plus the environment
    pub fn load_from_file(path: &Path) -> CacheResult<Self> {
        SettingsLoader::new().file(path).required(true).load()
    }

    /// Settings pointing at the given backend URI, defaults otherwise
    pub fn with_backend<S: Into<String>>(mut self, backend: S) -> Self {
        self.backend = Some(backend.into());
        self
    }

    /// Settings with a different default expiry
    pub fn with_expires(mut self, expires_seconds: u32) -> Self {
        self.expires_seconds = expires_seconds;
        self
    }

    /// Check the backend URI and expiry
    pub fn validate(&self) -> CacheResult<()> {
        if let Some(backend) = &self.backend {
            BackendUri::parse(backend)?;
        }

        if self.expires_seconds == 0 {
            return Err(CacheError::configuration(
                "expires_seconds must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// Builder over the settings sources
#[derive(Debug, Default)]
pub struct SettingsLoader {
    file: Option<PathBuf>,
    required: bool,
    env: Option<config::Map<String, String>>,
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read this file instead of `config/cache.toml`
    pub fn file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Fail when the file is missing
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Read overrides from this map instead of the process environment.
    /// Keys keep their `TASKER_CACHE_` prefix.
    pub fn env_source(mut self, vars: config::Map<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    pub fn load(self) -> CacheResult<CacheSettings> {
        let path = self
            .file
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));

        debug!(
            path = %path.display(),
            required = self.required,
            "Loading cache settings"
        );

        let environment = config::Environment::with_prefix(SETTINGS_ENV_PREFIX)
            .prefix_separator("_")
            .try_parsing(true)
            .source(self.env);

        let settings: CacheSettings = config::Config::builder()
            .add_source(config::File::from(path.as_path()).required(self.required))
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        settings.validate()?;

        debug!(
            backend = ?settings.backend,
            expires_seconds = settings.expires_seconds,
            option_count = settings.backend_options.len(),
            "Cache settings loaded"
        );
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = CacheSettings::default();
        assert_eq!(settings.backend, None);
        assert!(settings.backend_options.is_empty());
        assert_eq!(settings.expires_seconds, 86_400);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_backend() {
        let settings = CacheSettings::default().with_backend("bogus://x/");
        assert!(settings.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn test_validate_rejects_zero_expiry() {
        let settings = CacheSettings::default().with_expires(0);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_missing_optional_file_uses_defaults() {
        let settings = SettingsLoader::new()
            .file("does/not/exist.toml")
            .env_source(config::Map::new())
            .load()
            .unwrap();
        assert_eq!(settings, CacheSettings::default());
    }

    #[test]
    fn test_missing_required_file_fails() {
        let result = SettingsLoader::new()
            .file("does/not/exist.toml")
            .required(true)
            .env_source(config::Map::new())
            .load();
        assert!(result.is_err());
    }

    #[test]
    fn test_env_source_overrides() {
        let mut vars = config::Map::new();
        vars.insert("TASKER_CACHE_BACKEND".to_string(), "memory://".to_string());
        vars.insert("TASKER_CACHE_EXPIRES_SECONDS".to_string(), "120".to_string());

        let settings = SettingsLoader::new()
            .file("does/not/exist.toml")
            .env_source(vars)
            .load()
            .unwrap();

        assert_eq!(settings.backend.as_deref(), Some("memory://"));
        assert_eq!(settings.expires_seconds, 120);
    }
}
