#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};

use map_session_store::{Cookie, MapClient, MemoryMap, SessionMap, SessionRecord};
use std::sync::Arc;

/// A call observed by [`RecordingMap`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Get(String),
    Set(String, Option<Duration>),
    Delete(String),
}

/// A map that forwards to a [`MemoryMap`] and records every call.
#[derive(Default)]
pub struct RecordingMap {
    inner: MemoryMap,
    calls: Mutex<Vec<Call>>,
}

impl RecordingMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// TTL passed with the most recent set
    pub fn last_ttl(&self) -> Option<Duration> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|c| match c {
                Call::Set(_, ttl) => Some(*ttl),
                _ => None,
            })
            .expect("no set call recorded")
    }
}

#[async_trait]
impl SessionMap for RecordingMap {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.calls.lock().unwrap().push(Call::Get(key.to_string()));
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<Option<Value>> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Set(key.to_string(), ttl));
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Delete(key.to_string()));
        self.inner.delete(key).await
    }
}

/// A map whose every call fails, as if the cluster were unreachable.
pub struct FailingMap {
    pub message: String,
}

impl FailingMap {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl SessionMap for FailingMap {
    async fn get(&self, _key: &str) -> Result<Option<Value>> {
        anyhow::bail!("{}", self.message)
    }

    async fn set(&self, _key: &str, _value: Value, _ttl: Option<Duration>) -> Result<Option<Value>> {
        anyhow::bail!("{}", self.message)
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        anyhow::bail!("{}", self.message)
    }
}

/// A client that hands out one pre-built map and records the names asked for.
pub struct FixedClient {
    map: Arc<dyn SessionMap>,
    pub requested: Mutex<Vec<String>>,
}

impl FixedClient {
    pub fn new(map: Arc<dyn SessionMap>) -> Self {
        Self {
            map,
            requested: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MapClient for FixedClient {
    async fn get_map(&self, name: &str) -> Result<Arc<dyn SessionMap>> {
        self.requested.lock().unwrap().push(name.to_string());
        Ok(Arc::clone(&self.map))
    }
}

/// A client that cannot reach its cluster.
pub struct UnreachableClient;

#[async_trait]
impl MapClient for UnreachableClient {
    async fn get_map(&self, name: &str) -> Result<Arc<dyn SessionMap>> {
        anyhow::bail!("no cluster member reachable for map '{}'", name)
    }
}

/// The session used throughout the tests: a secure cookie with a 1s maxAge.
pub fn test_session() -> SessionRecord {
    SessionRecord::from_value(json!({
        "cookie": {
            "path": "/",
            "httpOnly": true,
            "secure": true,
            "maxAge": 1000
        },
        "name": "sid"
    }))
    .expect("valid session record")
}

pub fn session_with_max_age(max_age: Option<f64>) -> SessionRecord {
    let cookie = match max_age {
        Some(m) => Cookie::new().path("/").max_age(m),
        None => Cookie::new().path("/"),
    };
    SessionRecord::new(cookie).with("name", "sid")
}
