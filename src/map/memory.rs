use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use super::{MapClient, SessionMap};

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// In-process map with per-entry expiry.
///
/// Expired entries are dropped when read, and swept from the whole map on
/// every write.
#[derive(Debug, Default)]
pub struct MemoryMap {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionMap for MemoryMap {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
            debug!(key, "evicted expired entry");
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<Option<Value>> {
        let now = Instant::now();
        let expires_at = ttl
            .filter(|ttl| !ttl.is_zero())
            .and_then(|ttl| now.checked_add(ttl));

        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        if entries.len() < before {
            debug!(swept = before - entries.len(), "swept expired entries");
        }

        let previous = entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(previous.map(|e| e.value))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Client handing out [`MemoryMap`]s. The same name always yields the same map.
#[derive(Debug, Default)]
pub struct MemoryClient {
    maps: RwLock<HashMap<String, Arc<MemoryMap>>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// The concrete map for `name`, creating it if needed
    pub async fn map(&self, name: &str) -> Arc<MemoryMap> {
        if let Some(map) = self.maps.read().await.get(name) {
            return Arc::clone(map);
        }
        let mut maps = self.maps.write().await;
        Arc::clone(
            maps.entry(name.to_string())
                .or_insert_with(|| Arc::new(MemoryMap::new())),
        )
    }
}

#[async_trait]
impl MapClient for MemoryClient {
    async fn get_map(&self, name: &str) -> Result<Arc<dyn SessionMap>> {
        let map: Arc<dyn SessionMap> = self.map(name).await;
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_returns_previous_value() {
        let map = MemoryMap::new();

        let first = map.set("k", json!(1), None).await.unwrap();
        assert_eq!(first, None);

        let second = map.set("k", json!(2), None).await.unwrap();
        assert_eq!(second, Some(json!(1)));

        assert_eq!(map.get("k").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn delete_missing_key_is_ok() {
        let map = MemoryMap::new();
        map.delete("nope").await.unwrap();
        assert!(map.is_empty().await);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let map = MemoryMap::new();
        map.set("k", json!("v"), Some(Duration::from_millis(30)))
            .await
            .unwrap();
        assert_eq!(map.get("k").await.unwrap(), Some(json!("v")));

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(map.get("k").await.unwrap(), None);
        assert_eq!(map.len().await, 0);
    }

    #[tokio::test]
    async fn zero_ttl_never_expires() {
        let map = MemoryMap::new();
        map.set("k", json!("v"), Some(Duration::ZERO)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(map.get("k").await.unwrap(), Some(json!("v")));
    }

    #[tokio::test]
    async fn expired_previous_value_is_not_returned() {
        let map = MemoryMap::new();
        map.set("k", json!(1), Some(Duration::from_millis(10)))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        let previous = map.set("k", json!(2), None).await.unwrap();
        assert_eq!(previous, None);
    }

    #[tokio::test]
    async fn writes_sweep_abandoned_entries() {
        let map = MemoryMap::new();
        for i in 0..100 {
            map.set(&format!("old-{}", i), json!(i), Some(Duration::from_millis(50)))
                .await
                .unwrap();
        }
        assert_eq!(map.entries.read().await.len(), 100);

        tokio::time::sleep(Duration::from_millis(120)).await;
        map.set("fresh", json!("v"), None).await.unwrap();

        let entries = map.entries.read().await;
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("fresh"));
    }

    #[tokio::test]
    async fn client_reuses_maps_by_name() {
        let client = MemoryClient::new();
        let a = client.get_map("Sessions").await.unwrap();
        a.set("k", json!(true), None).await.unwrap();

        let b = client.get_map("Sessions").await.unwrap();
        assert_eq!(b.get("k").await.unwrap(), Some(json!(true)));

        let other = client.get_map("Other").await.unwrap();
        assert_eq!(other.get("k").await.unwrap(), None);
    }
}
