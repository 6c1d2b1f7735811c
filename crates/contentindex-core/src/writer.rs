//! Projection writer — turns one classified operation into one storage write.
//!
//! The writer builds the full row, hands it to the storage port and logs the
//! outcome. It never retries; a storage failure is logged with the block
//! number and the affected id and handed back to the caller.

use std::sync::Arc;

use tracing::{debug, error};

use crate::error::ProjectorError;
use crate::identity::Identifier;
use crate::record::{BlockStamp, ContentRecord, OperationKind, PermissionRecord, WriteOutcome};
use crate::store::ProjectionStore;
use crate::types::{
    ContentCreate, ContentRemove, ContentUpdate, ObjectId, PermissionCreate, PermissionGrant,
    PermissionRemove,
};

/// Content fields shared by create and update.
struct ContentFields<'a> {
    subject_account: ObjectId,
    hash: &'a str,
    url: &'a str,
    content_type: &'a str,
    description: &'a str,
    content_key: &'a str,
    storage_data: &'a str,
}

impl<'a> From<&'a ContentCreate> for ContentFields<'a> {
    fn from(op: &'a ContentCreate) -> Self {
        Self {
            subject_account: op.subject_account,
            hash: &op.hash,
            url: &op.url,
            content_type: &op.content_type,
            description: &op.description,
            content_key: &op.content_key,
            storage_data: &op.storage_data,
        }
    }
}

impl<'a> From<&'a ContentUpdate> for ContentFields<'a> {
    fn from(op: &'a ContentUpdate) -> Self {
        Self {
            subject_account: op.subject_account,
            hash: &op.hash,
            url: &op.url,
            content_type: &op.content_type,
            description: &op.description,
            content_key: &op.content_key,
            storage_data: &op.storage_data,
        }
    }
}

/// Writes projected rows through a [`ProjectionStore`].
#[derive(Clone)]
pub struct ProjectionWriter {
    store: Arc<dyn ProjectionStore>,
}

impl ProjectionWriter {
    pub fn new(store: Arc<dyn ProjectionStore>) -> Self {
        Self { store }
    }

    pub async fn content_create(
        &self,
        op: &ContentCreate,
        id: &Identifier,
        stamp: &BlockStamp,
    ) -> Result<WriteOutcome, ProjectorError> {
        let record = content_row(id.to_string(), op.into(), stamp, OperationKind::Created);
        let result = self.store.upsert_content(&record).await;
        log_write("content_create", stamp.block_num, &record.id, &result);
        result
    }

    /// Updates target the durable id carried in the operation.
    pub async fn content_update(
        &self,
        op: &ContentUpdate,
        stamp: &BlockStamp,
    ) -> Result<WriteOutcome, ProjectorError> {
        let record = content_row(op.content_id.to_string(), op.into(), stamp, OperationKind::Updated);
        let result = self.store.upsert_content(&record).await;
        log_write("content_update", stamp.block_num, &record.id, &result);
        result
    }

    pub async fn content_remove(
        &self,
        op: &ContentRemove,
        stamp: &BlockStamp,
    ) -> Result<WriteOutcome, ProjectorError> {
        let id = op.content_id.to_string();
        let result = self.store.remove_content(&id, stamp).await;
        log_write("content_remove", stamp.block_num, &id, &result);
        result
    }

    pub async fn permission_create(
        &self,
        op: &PermissionCreate,
        id: &Identifier,
        stamp: &BlockStamp,
    ) -> Result<WriteOutcome, ProjectorError> {
        let record = PermissionRecord {
            id: id.to_string(),
            subject_account: op.subject_account.to_string(),
            operator_account: op.operator_account.to_string(),
            permission_type: op.permission_type.clone(),
            referenced_object_id: scoped_object(op.object_id),
            content_key: op.content_key.clone(),
            block_num: stamp.block_num,
            block_time: stamp.block_time,
            transaction_id: stamp.transaction_id.clone(),
            operation_kind: OperationKind::Created,
            removed: false,
        };
        let result = self.store.upsert_permission(&record).await;
        log_write("permission_create", stamp.block_num, &record.id, &result);
        result
    }

    /// One slot of a batch create. The subject comes from the enclosing
    /// batch operation.
    pub async fn permission_grant(
        &self,
        subject_account: ObjectId,
        grant: &PermissionGrant,
        id: &Identifier,
        stamp: &BlockStamp,
    ) -> Result<WriteOutcome, ProjectorError> {
        let record = PermissionRecord {
            id: id.to_string(),
            subject_account: subject_account.to_string(),
            operator_account: grant.operator_account.to_string(),
            permission_type: grant.permission_type.clone(),
            referenced_object_id: scoped_object(grant.object_id),
            content_key: grant.content_key.clone(),
            block_num: stamp.block_num,
            block_time: stamp.block_time,
            transaction_id: stamp.transaction_id.clone(),
            operation_kind: OperationKind::Created,
            removed: false,
        };
        let result = self.store.upsert_permission(&record).await;
        log_write("permission_create_many", stamp.block_num, &record.id, &result);
        result
    }

    pub async fn permission_remove(
        &self,
        op: &PermissionRemove,
        stamp: &BlockStamp,
    ) -> Result<WriteOutcome, ProjectorError> {
        let id = op.permission_id.to_string();
        let result = self.store.remove_permission(&id, stamp).await;
        log_write("permission_remove", stamp.block_num, &id, &result);
        result
    }
}

fn content_row(
    id: String,
    fields: ContentFields<'_>,
    stamp: &BlockStamp,
    kind: OperationKind,
) -> ContentRecord {
    ContentRecord {
        id,
        subject_account: fields.subject_account.to_string(),
        hash: fields.hash.to_string(),
        url: fields.url.to_string(),
        content_type: fields.content_type.to_string(),
        description: fields.description.to_string(),
        content_key: fields.content_key.to_string(),
        storage_data: fields.storage_data.to_string(),
        block_num: stamp.block_num,
        block_time: stamp.block_time,
        transaction_id: stamp.transaction_id.clone(),
        operation_kind: kind,
        removed: false,
    }
}

fn scoped_object(object_id: Option<ObjectId>) -> String {
    object_id.map(|id| id.to_string()).unwrap_or_default()
}

fn log_write(
    handler: &str,
    block: u64,
    id: &str,
    result: &Result<WriteOutcome, ProjectorError>,
) {
    match result {
        Ok(outcome) => debug!(handler, block, id, ?outcome, "projected"),
        Err(e) => error!(handler, block, id, error = %e, "projection write failed"),
    }
}
