//! Ledger input model — what the block-applied callback hands to the projector.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProjectorError;

// ─── ObjectId ─────────────────────────────────────────────────────────────────

/// A durable ledger object identifier, rendered as `space.type.instance`.
///
/// Accounts (`1.2.x`), content records and permissions all share this shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId {
    pub space: u8,
    pub type_id: u8,
    pub instance: u64,
}

impl ObjectId {
    pub const fn new(space: u8, type_id: u8, instance: u64) -> Self {
        Self {
            space,
            type_id,
            instance,
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.space, self.type_id, self.instance)
    }
}

impl FromStr for ObjectId {
    type Err = ProjectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProjectorError::InvalidObjectId(s.to_string());
        let mut parts = s.split('.');
        let space = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let type_id = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let instance = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self::new(space, type_id, instance))
    }
}

impl TryFrom<String> for ObjectId {
    type Error = ProjectorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.to_string()
    }
}

// ─── Block ────────────────────────────────────────────────────────────────────

/// A finalized block as delivered by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Block number.
    pub number: u64,
    /// Unix timestamp of the block (seconds since epoch).
    pub timestamp: i64,
    /// Transactions in block order.
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    /// Operations applied while this block was pushed, in application order.
    /// `None` marks a pruned history slot.
    #[serde(default)]
    pub applied_operations: Vec<Option<AppliedOperation>>,
}

impl Block {
    /// Id of the transaction at `index`, or an empty string when the
    /// operation was generated by the ledger itself.
    pub fn transaction_id(&self, index: u32) -> &str {
        self.transactions
            .get(index as usize)
            .map(|t| t.id.as_str())
            .unwrap_or("")
    }
}

/// A signed transaction, reduced to what the projector needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction id (hex digest).
    pub id: String,
}

impl Transaction {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// An operation together with its execution result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedOperation {
    pub op: Operation,
    #[serde(default)]
    pub result: OperationResult,
    /// Index of the owning transaction within the block.
    pub trx_in_block: u32,
}

// ─── Operations ───────────────────────────────────────────────────────────────

/// The operations the projector understands. Anything else deserializes to
/// [`Operation::Unrecognized`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    ContentCreate(ContentCreate),
    ContentUpdate(ContentUpdate),
    ContentRemove(ContentRemove),
    PermissionCreate(PermissionCreate),
    PermissionCreateMany(PermissionCreateMany),
    PermissionRemove(PermissionRemove),
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentCreate {
    pub subject_account: ObjectId,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content_key: String,
    #[serde(default)]
    pub storage_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUpdate {
    pub subject_account: ObjectId,
    /// The record being updated.
    pub content_id: ObjectId,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content_key: String,
    #[serde(default)]
    pub storage_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRemove {
    pub subject_account: ObjectId,
    pub content_id: ObjectId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCreate {
    pub subject_account: ObjectId,
    pub operator_account: ObjectId,
    pub permission_type: String,
    /// Object the grant is scoped to, if any.
    #[serde(default)]
    pub object_id: Option<ObjectId>,
    #[serde(default)]
    pub content_key: String,
}

/// One grant inside a [`PermissionCreateMany`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub operator_account: ObjectId,
    pub permission_type: String,
    #[serde(default)]
    pub object_id: Option<ObjectId>,
    #[serde(default)]
    pub content_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCreateMany {
    pub subject_account: ObjectId,
    pub permissions: Vec<PermissionGrant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRemove {
    pub subject_account: ObjectId,
    pub permission_id: ObjectId,
}

// ─── Results ──────────────────────────────────────────────────────────────────

/// What the ledger recorded as the outcome of an operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum OperationResult {
    #[default]
    Void,
    ObjectId(ObjectId),
    Asset {
        amount: i64,
        asset_id: ObjectId,
    },
    Generic {
        #[serde(default)]
        new_objects: Vec<ObjectId>,
        #[serde(default)]
        updated_objects: Vec<ObjectId>,
        #[serde(default)]
        removed_objects: Vec<ObjectId>,
    },
    #[serde(other)]
    Unrecognized,
}

// ─── Tests ────────────────────────────────────────────────────────────────────
