//! SQLite projection backend.
//!
//! Keeps both relations in a single SQLite file via `sqlx`. The pool is
//! capped at one connection: the projector is the only writer, and an
//! in-memory database only exists on the connection that created it.
//!
//! # Usage
//! ```rust,no_run
//! use contentindex_storage::sqlite::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-backed (persistent)
//! let store = SqliteStore::open("./projection.db").await?;
//!
//! // In-memory (tests / ephemeral)
//! let store = SqliteStore::in_memory().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::{debug, info};

use contentindex_core::error::ProjectorError;
use contentindex_core::record::{
    BlockStamp, ContentRecord, OperationKind, PermissionRecord, WriteOutcome,
};
use contentindex_core::store::ProjectionStore;

use crate::block_num_param;

/// SQLite-backed projection storage.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The path may be a plain file path (`"./projection.db"`) or a full
    /// SQLite URL (`"sqlite:./projection.db?mode=rwc"`).
    pub async fn open(path: &str) -> Result<Self, ProjectorError> {
        if path == "sqlite::memory:" || path == ":memory:" {
            return Self::in_memory().await;
        }
        let url = match path.strip_prefix("sqlite:") {
            Some(_) if path.contains('?') => path.to_string(),
            Some(rest) => format!("sqlite:{rest}?mode=rwc"),
            None => format!("sqlite:{path}?mode=rwc"),
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .map_err(|e| ProjectorError::Connect(format!("sqlite open: {e}")))?;

        info!(url = %url, "SqliteStore opened");
        Ok(Self { pool })
    }

    /// Open an in-memory SQLite database.
    ///
    /// All data is lost when the store is closed or dropped.
    pub async fn in_memory() -> Result<Self, ProjectorError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| ProjectorError::Connect(format!("sqlite open: {e}")))?;

        Ok(Self { pool })
    }

    /// Get the underlying connection pool (for custom queries).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Zero rows changed by a remove: tell a missing row from a newer one.
    async fn classify_untouched(
        &self,
        table: &str,
        key: &str,
        id: &str,
    ) -> Result<WriteOutcome, ProjectorError> {
        let sql = format!("SELECT 1 FROM {table} WHERE {key} = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ProjectorError::Storage(e.to_string()))?;
        Ok(if row.is_some() {
            WriteOutcome::Stale
        } else {
            WriteOutcome::Missing
        })
    }
}

#[async_trait]
impl ProjectionStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn ensure_schema(&self) -> Result<(), ProjectorError> {
        // WAL mode — readers don't block the projector
        sqlx::query("PRAGMA journal_mode=WAL;")
            .execute(&self.pool)
            .await
            .map_err(|e| ProjectorError::Schema(e.to_string()))?;

        let statements = [
            "CREATE TABLE IF NOT EXISTS contentindex_content (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                content_id     TEXT    NOT NULL UNIQUE,
                subject_account TEXT   NOT NULL,
                hash           TEXT,
                url            TEXT,
                content_type   TEXT,
                description    TEXT,
                content_key    TEXT,
                storage_data   TEXT,
                block_num      INTEGER NOT NULL,
                block_time     TEXT    NOT NULL,
                trx_id         TEXT,
                operation_kind TEXT    NOT NULL,
                is_removed     BOOLEAN NOT NULL DEFAULT 0,
                created_at     TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP
            );",
            "CREATE INDEX IF NOT EXISTS idx_content_subject ON contentindex_content (subject_account);",
            "CREATE INDEX IF NOT EXISTS idx_content_block_time ON contentindex_content (block_time DESC);",
            "CREATE INDEX IF NOT EXISTS idx_content_type ON contentindex_content (content_type);",
            "CREATE INDEX IF NOT EXISTS idx_content_removed ON contentindex_content (is_removed);",
            "CREATE TABLE IF NOT EXISTS contentindex_permissions (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                permission_id    TEXT    NOT NULL UNIQUE,
                subject_account  TEXT    NOT NULL,
                operator_account TEXT    NOT NULL,
                permission_type  TEXT,
                object_id        TEXT,
                content_key      TEXT,
                block_num        INTEGER NOT NULL,
                block_time       TEXT    NOT NULL,
                trx_id           TEXT,
                operation_kind   TEXT    NOT NULL,
                is_removed       BOOLEAN NOT NULL DEFAULT 0,
                created_at       TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP
            );",
            "CREATE INDEX IF NOT EXISTS idx_perm_subject ON contentindex_permissions (subject_account);",
            "CREATE INDEX IF NOT EXISTS idx_perm_operator ON contentindex_permissions (operator_account);",
            "CREATE INDEX IF NOT EXISTS idx_perm_object ON contentindex_permissions (object_id);",
            "CREATE INDEX IF NOT EXISTS idx_perm_block_time ON contentindex_permissions (block_time DESC);",
            "CREATE INDEX IF NOT EXISTS idx_perm_removed ON contentindex_permissions (is_removed);",
        ];
        for stmt in statements {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| ProjectorError::Schema(e.to_string()))?;
        }

        debug!("SqliteStore schema initialized");
        Ok(())
    }

    async fn upsert_content(&self, record: &ContentRecord) -> Result<WriteOutcome, ProjectorError> {
        let result = sqlx::query(
            "INSERT INTO contentindex_content
                (content_id, subject_account, hash, url, content_type, description, content_key,
                 storage_data, block_num, block_time, trx_id, operation_kind, is_removed)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
             ON CONFLICT (content_id) DO UPDATE SET
                subject_account = excluded.subject_account,
                hash            = excluded.hash,
                url             = excluded.url,
                content_type    = excluded.content_type,
                description     = excluded.description,
                content_key     = excluded.content_key,
                storage_data    = excluded.storage_data,
                block_num       = excluded.block_num,
                block_time      = excluded.block_time,
                trx_id          = excluded.trx_id,
                operation_kind  = excluded.operation_kind
             WHERE contentindex_content.block_num <= excluded.block_num",
        )
        .bind(&record.id)
        .bind(&record.subject_account)
        .bind(&record.hash)
        .bind(&record.url)
        .bind(&record.content_type)
        .bind(&record.description)
        .bind(&record.content_key)
        .bind(&record.storage_data)
        .bind(block_num_param(record.block_num)?)
        .bind(record.block_time)
        .bind(&record.transaction_id)
        .bind(record.operation_kind.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| ProjectorError::Storage(e.to_string()))?;

        Ok(WriteOutcome::from_upsert_rows(result.rows_affected()))
    }

    async fn remove_content(
        &self,
        id: &str,
        stamp: &BlockStamp,
    ) -> Result<WriteOutcome, ProjectorError> {
        let block_num = block_num_param(stamp.block_num)?;
        let result = sqlx::query(
            "UPDATE contentindex_content SET
                is_removed     = 1,
                block_num      = ?,
                block_time     = ?,
                operation_kind = ?
             WHERE content_id = ? AND block_num <= ?",
        )
        .bind(block_num)
        .bind(stamp.block_time)
        .bind(OperationKind::Removed.as_str())
        .bind(id)
        .bind(block_num)
        .execute(&self.pool)
        .await
        .map_err(|e| ProjectorError::Storage(e.to_string()))?;

        if result.rows_affected() > 0 {
            return Ok(WriteOutcome::Applied);
        }
        self.classify_untouched("contentindex_content", "content_id", id).await
    }

    async fn upsert_permission(
        &self,
        record: &PermissionRecord,
    ) -> Result<WriteOutcome, ProjectorError> {
        let result = sqlx::query(
            "INSERT INTO contentindex_permissions
                (permission_id, subject_account, operator_account, permission_type, object_id,
                 content_key, block_num, block_time, trx_id, operation_kind, is_removed)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
             ON CONFLICT (permission_id) DO UPDATE SET
                subject_account  = excluded.subject_account,
                operator_account = excluded.operator_account,
                permission_type  = excluded.permission_type,
                object_id        = excluded.object_id,
                content_key      = excluded.content_key,
                block_num        = excluded.block_num,
                block_time       = excluded.block_time,
                trx_id           = excluded.trx_id,
                operation_kind   = excluded.operation_kind
             WHERE contentindex_permissions.block_num <= excluded.block_num",
        )
        .bind(&record.id)
        .bind(&record.subject_account)
        .bind(&record.operator_account)
        .bind(&record.permission_type)
        .bind(&record.referenced_object_id)
        .bind(&record.content_key)
        .bind(block_num_param(record.block_num)?)
        .bind(record.block_time)
        .bind(&record.transaction_id)
        .bind(record.operation_kind.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| ProjectorError::Storage(e.to_string()))?;

        Ok(WriteOutcome::from_upsert_rows(result.rows_affected()))
    }

    async fn remove_permission(
        &self,
        id: &str,
        stamp: &BlockStamp,
    ) -> Result<WriteOutcome, ProjectorError> {
        let block_num = block_num_param(stamp.block_num)?;
        let result = sqlx::query(
            "UPDATE contentindex_permissions SET
                is_removed     = 1,
                block_num      = ?,
                block_time     = ?,
                operation_kind = ?
             WHERE permission_id = ? AND block_num <= ?",
        )
        .bind(block_num)
        .bind(stamp.block_time)
        .bind(OperationKind::Removed.as_str())
        .bind(id)
        .bind(block_num)
        .execute(&self.pool)
        .await
        .map_err(|e| ProjectorError::Storage(e.to_string()))?;

        if result.rows_affected() > 0 {
            return Ok(WriteOutcome::Applied);
        }
        self.classify_untouched("contentindex_permissions", "permission_id", id).await
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
