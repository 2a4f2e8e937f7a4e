//! Cache error types

use thiserror::Error;

/// Errors that can occur while configuring or using a cache backend
#[derive(Debug, Error)]
pub enum CacheError {
    /// Unregistered scheme, missing client library, or invalid settings.
    /// Always fatal to construction or resolution.
    #[error("Cache configuration error: {0}")]
    ConfigurationError(String),

    /// Failed to connect to a networked cache server
    #[error("Cache connection error: {0}")]
    ConnectionError(String),

    /// Failed to serialize or deserialize a backend snapshot
    #[error("Cache serialization error: {0}")]
    SerializationError(String),

    /// A networked client operation failed
    #[error("Cache backend error: {0}")]
    BackendError(String),
}

impl CacheError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::ConfigurationError(message.into())
    }

    /// Whether this error came from configuration or resolution
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::ConfigurationError(_))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

impl From<config::ConfigError> for CacheError {
    fn from(e: config::ConfigError) -> Self {
        Self::ConfigurationError(e.to_string())
    }
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
