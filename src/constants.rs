//! # Cache Constants
//!
//! Key namespaces, defaults, and the option names the backends recognize.

/// Prefix for individual task result keys
pub const TASK_KEY_PREFIX: &str = "task-meta-";

/// Prefix for grouped (task set) result keys
pub const TASKSET_KEY_PREFIX: &str = "taskset-meta-";

/// Entry limit of the in-process fallback cache
pub const DEFAULT_FALLBACK_CAPACITY: usize = 5000;

/// Result expiry when neither settings nor caller supply one (1 day)
pub const DEFAULT_EXPIRES_SECONDS: u32 = 86_400;

/// Environment variable prefix for cache settings
pub const SETTINGS_ENV_PREFIX: &str = "TASKER_CACHE";

/// Default settings file, relative to the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "config/cache.toml";

/// Option names understood by the client constructors
pub mod options {
    /// Post-construction tuning knobs, honored only by the preferred memcached client
    pub const BEHAVIORS: &str = "behaviors";

    /// Capacity of the fallback cache
    pub const MAX_ENTRIES: &str = "max_entries";

    /// Behavior: socket read timeout in milliseconds
    pub const READ_TIMEOUT_MS: &str = "read_timeout_ms";

    /// Behavior: socket write timeout in milliseconds
    pub const WRITE_TIMEOUT_MS: &str = "write_timeout_ms";
}
