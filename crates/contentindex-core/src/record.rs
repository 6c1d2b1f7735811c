//! Projected row types and their merge rules.
//!
//! Every backend applies the same policy, spelled out here once so the
//! in-memory store and the SQL statements agree:
//!
//! - upsert by `id`: insert, or overwrite every mutable field together with
//!   the block stamp and `operation_kind`. `removed` is never cleared.
//! - remove by `id`: flip `removed`, stamp `block_num`/`block_time`, set
//!   `operation_kind = removed`. Everything else is left alone.
//! - neither write may move `block_num` backwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── OperationKind ────────────────────────────────────────────────────────────

/// The last kind of operation that touched a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Created,
    Updated,
    Removed,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Removed => "removed",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── BlockStamp ───────────────────────────────────────────────────────────────

/// Where in the chain a write came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStamp {
    pub block_num: u64,
    pub block_time: DateTime<Utc>,
    pub transaction_id: String,
}

impl BlockStamp {
    /// Build a stamp from a unix timestamp. Out-of-range timestamps fall back
    /// to the epoch with a warning.
    pub fn new(block_num: u64, unix_secs: i64, transaction_id: impl Into<String>) -> Self {
        Self {
            block_num,
            block_time: DateTime::<Utc>::from_timestamp(unix_secs, 0).unwrap_or_else(|| {
                tracing::warn!(
                    block = block_num,
                    timestamp = unix_secs,
                    "block timestamp out of range, using the epoch"
                );
                DateTime::<Utc>::default()
            }),
            transaction_id: transaction_id.into(),
        }
    }
}

// ─── WriteOutcome ─────────────────────────────────────────────────────────────

/// Result of a single successful write against the storage port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// One row inserted or changed.
    Applied,
    /// The row already carries a newer block; nothing changed.
    Stale,
    /// Remove for an id that was never projected; nothing changed.
    Missing,
}

impl WriteOutcome {
    /// Map a backend's affected-row count for an upsert.
    pub fn from_upsert_rows(rows: u64) -> Self {
        if rows == 0 {
            Self::Stale
        } else {
            Self::Applied
        }
    }
}

// ─── ContentRecord ────────────────────────────────────────────────────────────

/// One row of the content relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: String,
    pub subject_account: String,
    pub hash: String,
    pub url: String,
    pub content_type: String,
    pub description: String,
    pub content_key: String,
    pub storage_data: String,
    pub block_num: u64,
    pub block_time: DateTime<Utc>,
    pub transaction_id: String,
    pub operation_kind: OperationKind,
    pub removed: bool,
}

impl ContentRecord {
    /// Merge an incoming upsert into the stored row. Returns `false` if the
    /// incoming write is older than the row.
    pub fn merge_from(&mut self, incoming: &ContentRecord) -> bool {
        if incoming.block_num < self.block_num {
            return false;
        }
        let removed = self.removed;
        *self = incoming.clone();
        self.removed = removed;
        true
    }

    /// Apply a soft delete. Returns `false` if the stamp is older than the row.
    pub fn mark_removed(&mut self, stamp: &BlockStamp) -> bool {
        if stamp.block_num < self.block_num {
            return false;
        }
        self.removed = true;
        self.block_num = stamp.block_num;
        self.block_time = stamp.block_time;
        self.operation_kind = OperationKind::Removed;
        true
    }
}

// ─── PermissionRecord ─────────────────────────────────────────────────────────

/// One row of the permission relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub id: String,
    pub subject_account: String,
    pub operator_account: String,
    pub permission_type: String,
    /// Empty when the grant is not scoped to a specific object.
    pub referenced_object_id: String,
    pub content_key: String,
    pub block_num: u64,
    pub block_time: DateTime<Utc>,
    pub transaction_id: String,
    pub operation_kind: OperationKind,
    pub removed: bool,
}

impl PermissionRecord {
    /// See [`ContentRecord::merge_from`].
    pub fn merge_from(&mut self, incoming: &PermissionRecord) -> bool {
        if incoming.block_num < self.block_num {
            return false;
        }
        let removed = self.removed;
        *self = incoming.clone();
        self.removed = removed;
        true
    }

    /// See [`ContentRecord::mark_removed`].
    pub fn mark_removed(&mut self, stamp: &BlockStamp) -> bool {
        if stamp.block_num < self.block_num {
            return false;
        }
        self.removed = true;
        self.block_num = stamp.block_num;
        self.block_time = stamp.block_time;
        self.operation_kind = OperationKind::Removed;
        true
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
