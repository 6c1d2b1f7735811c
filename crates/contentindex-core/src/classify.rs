//! Operation classifier — maps an operation to the handler that projects it.

use crate::types::{
    ContentCreate, ContentRemove, ContentUpdate, Operation, PermissionCreate,
    PermissionCreateMany, PermissionRemove,
};

/// The fixed set of projection handlers, each carrying the payload it
/// projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler<'a> {
    ContentCreate(&'a ContentCreate),
    ContentUpdate(&'a ContentUpdate),
    ContentRemove(&'a ContentRemove),
    PermissionCreate(&'a PermissionCreate),
    PermissionCreateBatch(&'a PermissionCreateMany),
    PermissionRemove(&'a PermissionRemove),
}

impl Handler<'_> {
    /// Handler name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ContentCreate(_) => "content_create",
            Self::ContentUpdate(_) => "content_update",
            Self::ContentRemove(_) => "content_remove",
            Self::PermissionCreate(_) => "permission_create",
            Self::PermissionCreateBatch(_) => "permission_create_many",
            Self::PermissionRemove(_) => "permission_remove",
        }
    }
}

/// Pick the handler for `op`. Operations the projector does not understand
/// return `None` and are skipped without logging.
pub fn classify(op: &Operation) -> Option<Handler<'_>> {
    match op {
        Operation::ContentCreate(p) => Some(Handler::ContentCreate(p)),
        Operation::ContentUpdate(p) => Some(Handler::ContentUpdate(p)),
        Operation::ContentRemove(p) => Some(Handler::ContentRemove(p)),
        Operation::PermissionCreate(p) => Some(Handler::PermissionCreate(p)),
        Operation::PermissionCreateMany(p) => Some(Handler::PermissionCreateBatch(p)),
        Operation::PermissionRemove(p) => Some(Handler::PermissionRemove(p)),
        Operation::Unrecognized => None,
    }
}
