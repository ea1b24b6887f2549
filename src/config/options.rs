use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Key prefix used when none is configured
pub const DEFAULT_PREFIX: &str = "sess:";

/// Map name used when none is configured
pub const DEFAULT_MAP_NAME: &str = "Sessions";

/// Label attached to the store's tracing span
pub const DEFAULT_DEBUG_PREFIX: &str = "hs";

/// Construction-time options for [`MapSessionStore`](crate::MapSessionStore).
///
/// Immutable once the store is built. Can be loaded from TOML:
///
/// ```toml
/// prefix = "sess:"
/// map_name = "Sessions"
/// ttl_ms = 900000
/// disable_ttl = false
/// log_errors = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Prepended to every session id to form the map key
    pub prefix: String,

    /// Name of the map holding the sessions
    pub map_name: String,

    /// Store-wide TTL in milliseconds. Takes precedence over the cookie's maxAge.
    pub ttl_ms: Option<u64>,

    /// Never send a TTL; records live until destroyed
    pub disable_ttl: bool,

    /// Log map errors at warn level in addition to returning them
    pub log_errors: bool,

    /// Label for the store's tracing span
    pub debug_prefix: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            map_name: DEFAULT_MAP_NAME.to_string(),
            ttl_ms: None,
            disable_ttl: false,
            log_errors: false,
            debug_prefix: DEFAULT_DEBUG_PREFIX.to_string(),
        }
    }
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("failed to parse store options")
    }

    /// Load options from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("invalid config: {}", path.display()))
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_map_name(mut self, map_name: impl Into<String>) -> Self {
        self.map_name = map_name.into();
        self
    }

    /// Set the store-wide TTL. Sub-millisecond precision is truncated.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_ms = Some(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = Some(ttl_ms);
        self
    }

    /// Clear the store-wide TTL so the cookie's maxAge (or the default) applies.
    pub fn without_ttl(mut self) -> Self {
        self.ttl_ms = None;
        self
    }

    pub fn disable_ttl(mut self, disable: bool) -> Self {
        self.disable_ttl = disable;
        self
    }

    pub fn with_log_errors(mut self, enabled: bool) -> Self {
        self.log_errors = enabled;
        self
    }

    pub fn with_debug_prefix(mut self, label: impl Into<String>) -> Self {
        self.debug_prefix = label.into();
        self
    }

    /// The store-wide TTL, if configured.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_ms.map(Duration::from_millis)
    }
}
