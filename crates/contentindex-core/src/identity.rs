//! Identity resolution for newly created objects.
//!
//! The ledger reports a created object's id only through the operation
//! result, and only some result shapes carry one. When none is available a
//! provisional id scoped to the owning transaction stands in for it.
//! Provisional ids are never reconciled to durable ones later.

use std::fmt;

use crate::types::{ObjectId, OperationResult};

/// Prefix of every provisional identifier. Durable ids are dotted numbers,
/// so the two formats cannot collide.
pub const PROVISIONAL_PREFIX: &str = "pending-";

/// The key a projected row is written under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    /// Assigned by the ledger.
    Durable(ObjectId),
    /// Synthesized from the owning transaction (and batch slot, if any).
    Provisional { trx_id: String, index: Option<usize> },
}

impl Identifier {
    /// `pending-<trx_id>`
    pub fn provisional(trx_id: impl Into<String>) -> Self {
        Self::Provisional {
            trx_id: trx_id.into(),
            index: None,
        }
    }

    /// `pending-<trx_id>-<index>`
    pub fn provisional_slot(trx_id: impl Into<String>, index: usize) -> Self {
        Self::Provisional {
            trx_id: trx_id.into(),
            index: Some(index),
        }
    }

    pub fn is_provisional(&self) -> bool {
        matches!(self, Self::Provisional { .. })
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Durable(id) => write!(f, "{id}"),
            Self::Provisional { trx_id, index: None } => write!(f, "{PROVISIONAL_PREFIX}{trx_id}"),
            Self::Provisional {
                trx_id,
                index: Some(i),
            } => write!(f, "{PROVISIONAL_PREFIX}{trx_id}-{i}"),
        }
    }
}

impl From<ObjectId> for Identifier {
    fn from(id: ObjectId) -> Self {
        Self::Durable(id)
    }
}

/// Extract the created object's id if `result` carries exactly one directly.
///
/// Aggregate results are handled by [`crate::correlate`]; every other shape
/// is unresolved.
pub fn resolve(result: &OperationResult) -> Option<ObjectId> {
    match result {
        OperationResult::ObjectId(id) => Some(*id),
        OperationResult::Void
        | OperationResult::Asset { .. }
        | OperationResult::Generic { .. }
        | OperationResult::Unrecognized => None,
    }
}

/// Resolve `result`, falling back to `pending-<trx_id>`.
pub fn resolve_or_provisional(result: &OperationResult, trx_id: &str) -> Identifier {
    match resolve(result) {
        Some(id) => Identifier::Durable(id),
        None => Identifier::provisional(trx_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_object_id_resolves() {
        let id = ObjectId::new(1, 21, 9);
        assert_eq!(resolve(&OperationResult::ObjectId(id)), Some(id));
        assert_eq!(
            resolve_or_provisional(&OperationResult::ObjectId(id), "abc").to_string(),
            "1.21.9"
        );
    }

    #[test]
    fn other_shapes_are_unresolved() {
        assert_eq!(resolve(&OperationResult::Void), None);
        assert_eq!(
            resolve(&OperationResult::Asset {
                amount: 5,
                asset_id: ObjectId::new(1, 3, 0)
            }),
            None
        );
        assert_eq!(
            resolve(&OperationResult::Generic {
                new_objects: vec![ObjectId::new(1, 22, 0)],
                updated_objects: vec![],
                removed_objects: vec![],
            }),
            None
        );
    }

    #[test]
    fn provisional_formats() {
        let id = resolve_or_provisional(&OperationResult::Void, "deadbeef");
        assert!(id.is_provisional());
        assert_eq!(id.to_string(), "pending-deadbeef");
        assert_eq!(
            Identifier::provisional_slot("deadbeef", 2).to_string(),
            "pending-deadbeef-2"
        );
    }

    #[test]
    fn provisional_never_parses_as_durable() {
        let pending = Identifier::provisional("1.2.3").to_string();
        assert!(pending.parse::<ObjectId>().is_err());
    }
}
