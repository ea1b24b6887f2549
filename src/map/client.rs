use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Handle to one named map in a key-value service.
///
/// The handle owns connection management, retries and serialization.
/// Callers get back exactly what the service reports.
#[async_trait]
pub trait SessionMap: Send + Sync {
    /// Read the value at `key`, or `None` if there is no live entry
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Write `value` at `key`, replacing any previous entry.
    ///
    /// With `ttl` set the entry expires after that long. A zero TTL means
    /// the entry never expires. Returns the previous live value, if any.
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<Option<Value>>;

    /// Remove the entry at `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// A connected client able to hand out map handles by name.
#[async_trait]
pub trait MapClient: Send + Sync {
    /// Get (creating if needed) the map called `name`
    async fn get_map(&self, name: &str) -> Result<Arc<dyn SessionMap>>;
}
