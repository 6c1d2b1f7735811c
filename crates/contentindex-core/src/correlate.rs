//! Batch correlation — pairs the sub-operations of a batch create with the
//! ids the ledger reported for them.
//!
//! Pairing is positional: slot `i` takes the `i`-th id in delivery order.
//! This only holds if the ledger lists created ids in declaration order. The
//! ledger allocates instances in increasing order, so ids that are not
//! ascending are flagged with a warning; pairing still follows delivery order.

use tracing::{debug, warn};

use crate::identity::Identifier;
use crate::types::{ObjectId, OperationResult};

/// Ids created by a batch, in the order the result lists them.
///
/// Only the aggregate result shape carries a new-object list; anything else
/// yields an empty slice.
pub fn new_objects(result: &OperationResult) -> &[ObjectId] {
    match result {
        OperationResult::Generic { new_objects, .. } => new_objects,
        _ => &[],
    }
}

/// Pair each of `sub_ops` with an identifier.
///
/// Slots beyond the supplied ids get `pending-<trx_id>-<i>`. Surplus ids are
/// dropped.
pub fn correlate<'a, T>(
    sub_ops: &'a [T],
    new_ids: &[ObjectId],
    trx_id: &str,
) -> Vec<(&'a T, Identifier)> {
    if sub_ops.len() != new_ids.len() {
        warn!(
            trx = trx_id,
            sub_ops = sub_ops.len(),
            new_ids = new_ids.len(),
            "batch result size does not match sub-operation count"
        );
    }
    if !is_ascending(new_ids) {
        warn!(
            trx = trx_id,
            "batch result ids are not in allocation order; positional pairing may mis-assign"
        );
    }
    if new_ids.len() > sub_ops.len() {
        debug!(
            trx = trx_id,
            surplus = new_ids.len() - sub_ops.len(),
            "ignoring surplus batch ids"
        );
    }

    sub_ops
        .iter()
        .enumerate()
        .map(|(i, op)| {
            let id = match new_ids.get(i) {
                Some(id) => Identifier::Durable(*id),
                None => Identifier::provisional_slot(trx_id, i),
            };
            (op, id)
        })
        .collect()
}

fn is_ascending(ids: &[ObjectId]) -> bool {
    ids.windows(2).all(|w| w[0] < w[1])
}
