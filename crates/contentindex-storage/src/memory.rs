//! In-memory projection store.
//!
//! Applies the same merge policy as the SQL backends. Useful for tests and
//! dry runs; all data is lost when the process exits.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use contentindex_core::error::ProjectorError;
use contentindex_core::record::{BlockStamp, ContentRecord, PermissionRecord, WriteOutcome};
use contentindex_core::store::ProjectionStore;

/// In-memory projection storage.
#[derive(Default)]
pub struct InMemoryStore {
    content: Mutex<HashMap<String, ContentRecord>>,
    permissions: Mutex<HashMap<String, PermissionRecord>>,
    writes: AtomicU64,
    schema_ready: AtomicBool,
    closed: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a content row by id.
    pub fn content(&self, id: &str) -> Option<ContentRecord> {
        self.content.lock().unwrap().get(id).cloned()
    }

    /// Look up a permission row by id.
    pub fn permission(&self, id: &str) -> Option<PermissionRecord> {
        self.permissions.lock().unwrap().get(id).cloned()
    }

    /// All content rows, ordered by id.
    pub fn content_rows(&self) -> Vec<ContentRecord> {
        let mut rows: Vec<_> = self.content.lock().unwrap().values().cloned().collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        rows
    }

    /// All permission rows, ordered by id.
    pub fn permission_rows(&self) -> Vec<PermissionRecord> {
        let mut rows: Vec<_> = self.permissions.lock().unwrap().values().cloned().collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        rows
    }

    /// Number of write calls received (including ones that changed nothing).
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn schema_ready(&self) -> bool {
        self.schema_ready.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    fn begin_write(&self) -> Result<(), ProjectorError> {
        if self.is_closed() {
            return Err(ProjectorError::Storage("store is closed".into()));
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[async_trait]
impl ProjectionStore for InMemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ensure_schema(&self) -> Result<(), ProjectorError> {
        self.schema_ready.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn upsert_content(&self, record: &ContentRecord) -> Result<WriteOutcome, ProjectorError> {
        self.begin_write()?;
        let mut rows = self.content.lock().unwrap();
        let applied = match rows.get_mut(&record.id) {
            Some(existing) => existing.merge_from(record),
            None => {
                rows.insert(record.id.clone(), record.clone());
                true
            }
        };
        Ok(if applied {
            WriteOutcome::Applied
        } else {
            WriteOutcome::Stale
        })
    }

    async fn remove_content(
        &self,
        id: &str,
        stamp: &BlockStamp,
    ) -> Result<WriteOutcome, ProjectorError> {
        self.begin_write()?;
        let mut rows = self.content.lock().unwrap();
        Ok(match rows.get_mut(id) {
            None => WriteOutcome::Missing,
            Some(row) => {
                if row.mark_removed(stamp) {
                    WriteOutcome::Applied
                } else {
                    WriteOutcome::Stale
                }
            }
        })
    }

    async fn upsert_permission(
        &self,
        record: &PermissionRecord,
    ) -> Result<WriteOutcome, ProjectorError> {
        self.begin_write()?;
        let mut rows = self.permissions.lock().unwrap();
        let applied = match rows.get_mut(&record.id) {
            Some(existing) => existing.merge_from(record),
            None => {
                rows.insert(record.id.clone(), record.clone());
                true
            }
        };
        Ok(if applied {
            WriteOutcome::Applied
        } else {
            WriteOutcome::Stale
        })
    }

    async fn remove_permission(
        &self,
        id: &str,
        stamp: &BlockStamp,
    ) -> Result<WriteOutcome, ProjectorError> {
        self.begin_write()?;
        let mut rows = self.permissions.lock().unwrap();
        Ok(match rows.get_mut(id) {
            None => WriteOutcome::Missing,
            Some(row) => {
                if row.mark_removed(stamp) {
                    WriteOutcome::Applied
                } else {
                    WriteOutcome::Stale
                }
            }
        })
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentindex_core::record::OperationKind;

    fn grant(id: &str, block: u64, permission_type: &str) -> PermissionRecord {
        let stamp = BlockStamp::new(block, 1_700_000_000, "trx");
        PermissionRecord {
            id: id.into(),
            subject_account: "1.2.5".into(),
            operator_account: "1.2.6".into(),
            permission_type: permission_type.into(),
            referenced_object_id: String::new(),
            content_key: String::new(),
            block_num: stamp.block_num,
            block_time: stamp.block_time,
            transaction_id: stamp.transaction_id,
            operation_kind: OperationKind::Created,
            removed: false,
        }
    }

    #[tokio::test]
    async fn upsert_merges_by_id() {
        let store = InMemoryStore::new();
        store.upsert_permission(&grant("1.22.0", 10, "read")).await.unwrap();
        let outcome = store.upsert_permission(&grant("1.22.0", 11, "write")).await.unwrap();

        assert_eq!(outcome, WriteOutcome::Applied);
        assert_eq!(store.permission_rows().len(), 1);
        assert_eq!(store.permission("1.22.0").unwrap().permission_type, "write");
    }

    #[tokio::test]
    async fn older_write_is_stale() {
        let store = InMemoryStore::new();
        store.upsert_permission(&grant("1.22.0", 10, "read")).await.unwrap();
        let outcome = store.upsert_permission(&grant("1.22.0", 9, "write")).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Stale);
        assert_eq!(store.permission("1.22.0").unwrap().permission_type, "read");
    }

    #[tokio::test]
    async fn remove_missing_row_is_noop() {
        let store = InMemoryStore::new();
        let stamp = BlockStamp::new(3, 0, "trx");
        assert_eq!(
            store.remove_permission("1.22.9", &stamp).await.unwrap(),
            WriteOutcome::Missing
        );
        assert!(store.permission_rows().is_empty());
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn writes_fail_after_close() {
        let store = InMemoryStore::new();
        store.close().await;
        assert!(store.upsert_permission(&grant("1.22.0", 1, "read")).await.is_err());
        assert_eq!(store.write_count(), 0);
    }
}
