use async_trait::async_trait;

use crate::error::StoreError;
use crate::session::SessionRecord;

/// Session persistence contract used by the session framework
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the session stored under `id`.
    ///
    /// A missing session is `Ok(None)`, not an error.
    async fn load(&self, id: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Store `record` under `id`, replacing whatever was there.
    ///
    /// Returns the record previously stored under `id`, if any.
    async fn save(
        &self,
        id: &str,
        record: &SessionRecord,
    ) -> Result<Option<SessionRecord>, StoreError>;

    /// Remove the session stored under `id`. Removing a missing session succeeds.
    async fn destroy(&self, id: &str) -> Result<(), StoreError>;
}
