//! contentindex-core — the write side of a chain-to-relational projection.
//!
//! # Architecture
//!
//! ```text
//! BlockFeed ──apply──▶ BlockIngestor (contentindex-plugin)
//!                          ├── classify        (operation → handler)
//!                          ├── identity        (result → durable / pending id)
//!                          ├── correlate       (batch slots ↔ new object ids)
//!                          └── ProjectionWriter
//!                                  └── ProjectionStore (memory / SQLite / Postgres)
//! ```

pub mod classify;
pub mod config;
pub mod correlate;
pub mod error;
pub mod feed;
pub mod identity;
pub mod record;
pub mod store;
pub mod types;
pub mod writer;

pub use classify::{classify, Handler};
pub use config::{PluginStatus, ProjectorConfig};
pub use error::ProjectorError;
pub use feed::{BlockFeed, BlockHandler, SubscriptionId};
pub use identity::Identifier;
pub use record::{BlockStamp, ContentRecord, OperationKind, PermissionRecord, WriteOutcome};
pub use store::ProjectionStore;
pub use types::{AppliedOperation, Block, ObjectId, Operation, OperationResult, Transaction};
pub use writer::ProjectionWriter;
