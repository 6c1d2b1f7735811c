//! Storage port — the write side of the projection.
//!
//! Two relations keyed on `id`, each supporting upsert-by-key and
//! update-by-key. Implementations must apply the merge policy documented in
//! [`crate::record`] and must bind values as parameters, never by splicing
//! them into statement text.
//!
//! Implementations include `InMemoryStore`, `SqliteStore`, and
//! `PostgresStore` in `contentindex-storage`.

use async_trait::async_trait;

use crate::error::ProjectorError;
use crate::record::{BlockStamp, ContentRecord, PermissionRecord, WriteOutcome};

#[async_trait]
pub trait ProjectionStore: Send + Sync {
    /// Short backend name for logs (e.g. `"postgres"`).
    fn backend(&self) -> &'static str;

    /// Create both relations and their indexes if they don't exist yet.
    async fn ensure_schema(&self) -> Result<(), ProjectorError>;

    /// Insert or merge a content row.
    async fn upsert_content(&self, record: &ContentRecord) -> Result<WriteOutcome, ProjectorError>;

    /// Soft-delete a content row.
    async fn remove_content(
        &self,
        id: &str,
        stamp: &BlockStamp,
    ) -> Result<WriteOutcome, ProjectorError>;

    /// Insert or merge a permission row.
    async fn upsert_permission(
        &self,
        record: &PermissionRecord,
    ) -> Result<WriteOutcome, ProjectorError>;

    /// Soft-delete a permission row.
    async fn remove_permission(
        &self,
        id: &str,
        stamp: &BlockStamp,
    ) -> Result<WriteOutcome, ProjectorError>;

    /// Release the underlying connection. Further writes may fail.
    async fn close(&self) {}
}
