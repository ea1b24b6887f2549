use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use tokio::task;
use tracing::debug;

use super::{MapClient, SessionMap};

/// Open a SQLite connection with standard pragmas (busy_timeout).
fn open_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open database: {}", db_path.display()))?;
    conn.execute_batch("PRAGMA busy_timeout=5000;")
        .context("failed to set busy_timeout")?;
    Ok(conn)
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Expiry timestamp for a TTL; zero or absent means none.
fn expires_at(ttl: Option<Duration>) -> Option<i64> {
    let ttl = ttl.filter(|t| !t.is_zero())?;
    let millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    Some(now_millis().saturating_add(millis))
}

fn is_live(expires_at: Option<i64>, now: i64) -> bool {
    expires_at.is_none_or(|at| now < at)
}

fn decode(key: &str, raw: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("corrupt value stored at '{}'", key))
}

/// Client for maps kept in a single SQLite database file.
///
/// Every map shares one `entries` table, partitioned by map name.
pub struct SqliteClient {
    db_path: PathBuf,
}

impl SqliteClient {
    /// Open (creating if needed) the database at the given path
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        // Create parent directories if they don't exist
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }

        let client = Self { db_path };
        client.init_schema()?;

        Ok(client)
    }

    /// Open the database at the default location (~/.session-store/sessions.db)
    pub fn default_location() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        let db_path = PathBuf::from(home).join(".session-store").join("sessions.db");
        Self::new(db_path)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Handle to the map called `name`
    pub fn map(&self, name: &str) -> SqliteMap {
        SqliteMap {
            db_path: self.db_path.clone(),
            name: name.to_string(),
        }
    }

    fn init_schema(&self) -> Result<()> {
        let conn = open_connection(&self.db_path)?;

        // WAL lets concurrent readers proceed while a write is in flight
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("failed to set WAL mode")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS entries (
                map_name TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                expires_at INTEGER,
                PRIMARY KEY (map_name, key)
            )",
            [],
        )
        .context("failed to create entries table")?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_entries_expires ON entries(expires_at)",
            [],
        )
        .context("failed to create expires_at index")?;

        debug!(path = %self.db_path.display(), "initialized SQLite map storage");

        Ok(())
    }
}

#[async_trait]
impl MapClient for SqliteClient {
    async fn get_map(&self, name: &str) -> Result<Arc<dyn SessionMap>> {
        Ok(Arc::new(self.map(name)))
    }
}

/// One named map inside a [`SqliteClient`] database.
#[derive(Debug, Clone)]
pub struct SqliteMap {
    db_path: PathBuf,
    name: String,
}

impl SqliteMap {
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl SessionMap for SqliteMap {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let key = key.to_string();
        let db_path = self.db_path.clone();
        let name = self.name.clone();

        task::spawn_blocking(move || {
            let conn = open_connection(&db_path)?;

            let row = conn
                .query_row(
                    "SELECT value, expires_at FROM entries WHERE map_name = ?1 AND key = ?2",
                    rusqlite::params![name, key],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<i64>>(1)?)),
                )
                .optional()?;

            match row {
                None => Ok(None),
                Some((raw, expires_at)) if is_live(expires_at, now_millis()) => {
                    Ok(Some(decode(&key, &raw)?))
                }
                Some(_) => {
                    conn.execute(
                        "DELETE FROM entries WHERE map_name = ?1 AND key = ?2 AND expires_at <= ?3",
                        rusqlite::params![name, key, now_millis()],
                    )?;
                    debug!(map = %name, key = %key, "evicted expired entry");
                    Ok(None)
                }
            }
        })
        .await
        .context("spawn_blocking failed")?
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<Option<Value>> {
        let key = key.to_string();
        let db_path = self.db_path.clone();
        let name = self.name.clone();

        task::spawn_blocking(move || {
            let mut conn = open_connection(&db_path)?;
            let data = serde_json::to_string(&value)?;
            let tx = conn.transaction()?;
            let now = now_millis();

            let swept = tx.execute(
                "DELETE FROM entries WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                [now],
            )?;
            if swept > 0 {
                debug!(swept, "swept expired entries");
            }

            let previous = tx
                .query_row(
                    "SELECT value, expires_at FROM entries WHERE map_name = ?1 AND key = ?2",
                    rusqlite::params![name, key],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<i64>>(1)?)),
                )
                .optional()?;

            tx.execute(
                "INSERT OR REPLACE INTO entries (map_name, key, value, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![name, key, data, expires_at(ttl)],
            )?;
            tx.commit()?;

            debug!(map = %name, key = %key, "stored entry");

            match previous {
                Some((raw, expires_at)) if is_live(expires_at, now) => {
                    Ok(Some(decode(&key, &raw)?))
                }
                _ => Ok(None),
            }
        })
        .await
        .context("spawn_blocking failed")?
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        let db_path = self.db_path.clone();
        let name = self.name.clone();

        task::spawn_blocking(move || {
            let conn = open_connection(&db_path)?;
            conn.execute(
                "DELETE FROM entries WHERE map_name = ?1 AND key = ?2",
                rusqlite::params![name, key],
            )?;
            debug!(map = %name, key = %key, "deleted entry");
            Ok::<_, anyhow::Error>(())
        })
        .await
        .context("spawn_blocking failed")??;

        Ok(())
    }
}
