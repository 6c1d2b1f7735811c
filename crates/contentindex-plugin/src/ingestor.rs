//! The block ingestor — walks one finalized block and projects every content
//! and permission operation in it.
//!
//! For each applied operation:
//!   - resolve the owning transaction id (empty when the index is out of range)
//!   - classify the operation, skipping anything unrecognized
//!   - resolve or correlate the target identifier
//!   - write through the [`ProjectionWriter`]
//!
//! A failed write is counted and logged by the writer; the rest of the block
//! is still processed. Nothing is retried and nothing already written is
//! rolled back.

use std::sync::Mutex;

use async_trait::async_trait;

use contentindex_core::classify::{classify, Handler};
use contentindex_core::correlate::{correlate, new_objects};
use contentindex_core::error::ProjectorError;
use contentindex_core::feed::BlockHandler;
use contentindex_core::identity::resolve_or_provisional;
use contentindex_core::record::{BlockStamp, WriteOutcome};
use contentindex_core::types::{AppliedOperation, Block};
use contentindex_core::writer::ProjectionWriter;

// ─── IngestReport ────────────────────────────────────────────────────────────

/// What happened to one block (or, via [`IngestReport::absorb`], many).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Writes that changed a row.
    pub applied: u64,
    /// Writes the store accepted but that changed nothing (stale or missing).
    pub unchanged: u64,
    /// Writes the store rejected.
    pub failed: u64,
    /// Operations the projector does not handle.
    pub ignored: u64,
    /// Blocks skipped because they precede the start block.
    pub gated: u64,
}

impl IngestReport {
    fn gated() -> Self {
        Self {
            gated: 1,
            ..Self::default()
        }
    }

    fn record(&mut self, result: Result<WriteOutcome, ProjectorError>) {
        match result {
            Ok(WriteOutcome::Applied) => self.applied += 1,
            Ok(WriteOutcome::Stale | WriteOutcome::Missing) => self.unchanged += 1,
            Err(_) => self.failed += 1,
        }
    }

    /// Add another report's counts to this one.
    pub fn absorb(&mut self, other: &IngestReport) {
        self.applied += other.applied;
        self.unchanged += other.unchanged;
        self.failed += other.failed;
        self.ignored += other.ignored;
        self.gated += other.gated;
    }

    /// Total write attempts.
    pub fn writes(&self) -> u64 {
        self.applied + self.unchanged + self.failed
    }
}

impl std::fmt::Display for IngestReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "applied={} unchanged={} failed={} ignored={} gated={}",
            self.applied, self.unchanged, self.failed, self.ignored, self.gated
        )
    }
}

// ─── BlockIngestor ───────────────────────────────────────────────────────────

/// Projects blocks into the store behind a [`ProjectionWriter`].
pub struct BlockIngestor {
    writer: ProjectionWriter,
    start_block: u64,
    totals: Mutex<IngestReport>,
}

impl BlockIngestor {
    pub fn new(writer: ProjectionWriter, start_block: u64) -> Self {
        Self {
            writer,
            start_block,
            totals: Mutex::new(IngestReport::default()),
        }
    }

    /// Running totals over every block this ingestor has seen.
    pub fn totals(&self) -> IngestReport {
        *self.totals.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Project one block.
    pub async fn ingest(&self, block: &Block) -> IngestReport {
        let report = if block.number < self.start_block {
            IngestReport::gated()
        } else {
            let mut report = IngestReport::default();
            for applied in block.applied_operations.iter().flatten() {
                self.project(block, applied, &mut report).await;
            }
            report
        };

        self.totals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .absorb(&report);
        report
    }

    async fn project(&self, block: &Block, applied: &AppliedOperation, report: &mut IngestReport) {
        let Some(handler) = classify(&applied.op) else {
            report.ignored += 1;
            return;
        };

        let trx_id = block.transaction_id(applied.trx_in_block);
        let stamp = BlockStamp::new(block.number, block.timestamp, trx_id);
        let writer = &self.writer;
        tracing::trace!(block = block.number, trx = trx_id, handler = handler.name(), "dispatch");

        match handler {
            Handler::ContentCreate(op) => {
                let id = resolve_or_provisional(&applied.result, trx_id);
                report.record(writer.content_create(op, &id, &stamp).await);
            }
            Handler::ContentUpdate(op) => {
                report.record(writer.content_update(op, &stamp).await);
            }
            Handler::ContentRemove(op) => {
                report.record(writer.content_remove(op, &stamp).await);
            }
            Handler::PermissionCreate(op) => {
                let id = resolve_or_provisional(&applied.result, trx_id);
                report.record(writer.permission_create(op, &id, &stamp).await);
            }
            Handler::PermissionCreateBatch(op) => {
                let slots = correlate(&op.permissions, new_objects(&applied.result), trx_id);
                for (grant, id) in slots {
                    report.record(
                        writer
                            .permission_grant(op.subject_account, grant, &id, &stamp)
                            .await,
                    );
                }
            }
            Handler::PermissionRemove(op) => {
                report.record(writer.permission_remove(op, &stamp).await);
            }
        }
    }
}

#[async_trait]
impl BlockHandler for BlockIngestor {
    async fn on_block(&self, block: &Block) {
        let report = self.ingest(block).await;
        if report.failed > 0 {
            tracing::warn!(block = block.number, %report, "block projected with failures");
        } else {
            tracing::debug!(block = block.number, %report, "block projected");
        }
    }

    fn name(&self) -> &str {
        "contentindex"
    }
}
