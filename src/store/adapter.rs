use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{Instrument, debug, debug_span, warn};

use super::traits::SessionStore;
use super::ttl::effective_ttl;
use crate::config::StoreOptions;
use crate::diagnostics::{Diagnostic, DiagnosticHook, Outcome};
use crate::error::{MapOp, StoreError};
use crate::map::{MapClient, SessionMap};
use crate::session::SessionRecord;

/// [`SessionStore`] backed by a named map in an external key-value service.
///
/// Built in two steps: [`new`](Self::new) takes the options, then
/// [`bind`](Self::bind) or [`attach_client`](Self::attach_client) supplies
/// the map once the service connection exists. Operations on an unbound
/// store fail with [`StoreError::NotBound`] without touching the map.
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use map_session_store::{MapSessionStore, MemoryClient, SessionStore, StoreOptions};
/// # async fn example() -> Result<(), map_session_store::StoreError> {
/// let store = MapSessionStore::new(StoreOptions::new().with_ttl_ms(900_000))?;
///
/// // later, once the client is connected
/// let client = MemoryClient::new();
/// store.attach_client(&client).await?;
///
/// let session = store.load("42").await?;
/// # Ok(())
/// # }
/// ```
pub struct MapSessionStore {
    options: StoreOptions,
    map: OnceLock<Arc<dyn SessionMap>>,
    hook: Option<DiagnosticHook>,
}

impl MapSessionStore {
    /// Create an unbound store.
    pub fn new(options: StoreOptions) -> Result<Self, StoreError> {
        if options.map_name.is_empty() {
            return Err(StoreError::Config("map name must not be empty".to_string()));
        }

        debug!(
            prefix = %options.prefix,
            map_name = %options.map_name,
            ttl_ms = ?options.ttl_ms,
            disable_ttl = options.disable_ttl,
            "session store created"
        );

        Ok(Self {
            options,
            map: OnceLock::new(),
            hook: None,
        })
    }

    /// Install a diagnostic hook that observes every operation.
    pub fn with_hook(mut self, hook: impl Fn(&Diagnostic) + Send + Sync + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Bind the map handle. Allowed exactly once.
    pub fn bind(&self, map: Arc<dyn SessionMap>) -> Result<(), StoreError> {
        self.map.set(map).map_err(|_| StoreError::AlreadyBound {
            map_name: self.options.map_name.clone(),
        })?;
        debug!(map_name = %self.options.map_name, "map bound");
        Ok(())
    }

    /// Obtain the configured map from `client` and bind it.
    pub async fn attach_client(&self, client: &dyn MapClient) -> Result<(), StoreError> {
        if self.is_bound() {
            return Err(StoreError::AlreadyBound {
                map_name: self.options.map_name.clone(),
            });
        }

        let map = client
            .get_map(&self.options.map_name)
            .await
            .map_err(|e| {
                self.report_error("get_map", &self.options.map_name, &e);
                StoreError::communication(MapOp::GetMap, self.options.map_name.clone(), e)
            })?;

        self.bind(map)
    }

    pub fn is_bound(&self) -> bool {
        self.map.get().is_some()
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn prefix(&self) -> &str {
        &self.options.prefix
    }

    pub fn map_name(&self) -> &str {
        &self.options.map_name
    }

    /// The map key for a session id
    pub fn key_for(&self, id: &str) -> String {
        format!("{}{}", self.options.prefix, id)
    }

    /// TTL a save of `record` would use
    pub fn ttl_for(&self, record: &SessionRecord) -> Option<Duration> {
        effective_ttl(&self.options, record)
    }

    fn map(&self) -> Result<&Arc<dyn SessionMap>, StoreError> {
        self.map.get().ok_or(StoreError::NotBound)
    }

    fn span(&self, op: &'static str, id: &str) -> tracing::Span {
        debug_span!("session_store", label = %self.options.debug_prefix, op, sid = %id)
    }

    fn emit(&self, event: Diagnostic) {
        if let Some(hook) = &self.hook {
            hook(&event);
        }
    }

    fn trace(&self, op: &'static str, key: &str, outcome: Outcome, started: Instant) {
        let elapsed = started.elapsed();
        debug!(
            key = %key,
            outcome = %outcome,
            elapsed_ms = elapsed.as_millis() as u64,
            "{} completed",
            op
        );
        self.emit(Diagnostic::Trace {
            op,
            key: key.to_string(),
            outcome,
            elapsed,
        });
    }

    fn report_error(&self, op: &'static str, key: &str, error: &dyn std::fmt::Display) {
        if self.options.log_errors {
            warn!(op, key = %key, error = %error, "session map reported an error");
        } else {
            debug!(op, key = %key, error = %error, "session map reported an error");
        }
        self.emit(Diagnostic::StoreError {
            op,
            key: key.to_string(),
            message: error.to_string(),
        });
    }

    fn fail(
        &self,
        op: MapOp,
        key: String,
        error: anyhow::Error,
        started: Instant,
    ) -> StoreError {
        let label = op_label(op);
        self.report_error(label, &key, &error);
        self.trace(label, &key, Outcome::Failed, started);
        StoreError::communication(op, key, error)
    }

    fn decode(&self, op: &'static str, key: &str, value: Value) -> Result<SessionRecord, StoreError> {
        SessionRecord::from_value(value).map_err(|source| {
            self.report_error(op, key, &source);
            StoreError::Codec {
                key: key.to_string(),
                source,
            }
        })
    }
}

fn op_label(op: MapOp) -> &'static str {
    match op {
        MapOp::Get => "get",
        MapOp::Set => "set",
        MapOp::Delete => "destroy",
        MapOp::GetMap => "get_map",
    }
}

#[async_trait]
impl SessionStore for MapSessionStore {
    async fn load(&self, id: &str) -> Result<Option<SessionRecord>, StoreError> {
        let map = self.map()?;
        let key = self.key_for(id);

        async move {
            let started = Instant::now();
            debug!(key = %key, "GET");

            match map.get(&key).await {
                Ok(Some(value)) => match self.decode("get", &key, value) {
                    Ok(record) => {
                        self.trace("get", &key, Outcome::Found, started);
                        Ok(Some(record))
                    }
                    Err(e) => {
                        self.trace("get", &key, Outcome::Failed, started);
                        Err(e)
                    }
                },
                Ok(None) => {
                    self.trace("get", &key, Outcome::Missing, started);
                    Ok(None)
                }
                Err(e) => Err(self.fail(MapOp::Get, key.clone(), e, started)),
            }
        }
        .instrument(self.span("get", id))
        .await
    }

    async fn save(
        &self,
        id: &str,
        record: &SessionRecord,
    ) -> Result<Option<SessionRecord>, StoreError> {
        let map = self.map()?;
        let key = self.key_for(id);
        let ttl = self.ttl_for(record);
        let value = record.to_value().map_err(|source| StoreError::Codec {
            key: key.clone(),
            source,
        })?;

        async move {
            let started = Instant::now();
            match ttl {
                Some(ttl) => debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "SET"),
                None => debug!(key = %key, "SET without ttl"),
            }

            match map.set(&key, value, ttl).await {
                Ok(previous) => {
                    self.trace("set", &key, Outcome::Written { ttl }, started);
                    // The write has happened; a previous value that is not a
                    // record is reported through diagnostics, not returned.
                    Ok(previous.and_then(|value| self.decode("set", &key, value).ok()))
                }
                Err(e) => Err(self.fail(MapOp::Set, key.clone(), e, started)),
            }
        }
        .instrument(self.span("set", id))
        .await
    }

    async fn destroy(&self, id: &str) -> Result<(), StoreError> {
        let map = self.map()?;
        let key = self.key_for(id);

        async move {
            let started = Instant::now();
            debug!(key = %key, "DESTROY");

            match map.delete(&key).await {
                Ok(()) => {
                    self.trace("destroy", &key, Outcome::Removed, started);
                    Ok(())
                }
                Err(e) => Err(self.fail(MapOp::Delete, key.clone(), e, started)),
            }
        }
        .instrument(self.span("destroy", id))
        .await
    }
}
