//! contentindex-storage — pluggable projection stores for ContentIndex.
//!
//! Backends:
//! - [`memory`] — in-memory (dev/testing, no persistence)
//! - `sqlite` — SQLite via `sqlx` (embedded, single-file persistence)
//! - `postgres` — PostgreSQL via `sqlx`
//!
//! [`connect`] picks a backend from the connection URL scheme.

use std::sync::Arc;

use contentindex_core::error::ProjectorError;
use contentindex_core::store::ProjectionStore;

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "memory")]
pub use memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

/// Block numbers are stored as signed 64-bit integers.
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub(crate) fn block_num_param(block_num: u64) -> Result<i64, ProjectorError> {
    i64::try_from(block_num).map_err(|_| {
        ProjectorError::Storage(format!("block number {block_num} exceeds the storable range"))
    })
}

/// Storage backend named by a connection URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Sqlite,
    Postgres,
}

impl Backend {
    /// Determine the backend from the URL scheme.
    ///
    /// Accepts `memory:`, `sqlite:` and `postgres://` / `postgresql://`.
    pub fn from_url(url: &str) -> Result<Self, ProjectorError> {
        let url = url.trim();
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Backend::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(Backend::Sqlite)
        } else if url.starts_with("memory:") {
            Ok(Backend::Memory)
        } else {
            Err(ProjectorError::Config(format!(
                "unsupported storage connection url '{url}' (expected postgres://, sqlite: or memory:)"
            )))
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Backend::Memory => "memory",
            Backend::Sqlite => "sqlite",
            Backend::Postgres => "postgres",
        }
    }

    #[cfg_attr(
        all(feature = "memory", feature = "sqlite", feature = "postgres"),
        allow(dead_code)
    )]
    fn not_compiled(self) -> ProjectorError {
        ProjectorError::Config(format!(
            "storage backend '{}' is not enabled in this build",
            self.name()
        ))
    }
}

/// Open a store for `url`. The schema is not created here; call
/// [`ProjectionStore::ensure_schema`] before writing.
pub async fn connect(url: &str) -> Result<Arc<dyn ProjectionStore>, ProjectorError> {
    let backend = Backend::from_url(url)?;
    tracing::debug!(backend = backend.name(), "opening projection store");

    match backend {
        Backend::Memory => {
            #[cfg(feature = "memory")]
            {
                Ok(Arc::new(memory::InMemoryStore::new()))
            }
            #[cfg(not(feature = "memory"))]
            {
                Err(backend.not_compiled())
            }
        }
        Backend::Sqlite => {
            #[cfg(feature = "sqlite")]
            {
                let store = sqlite::SqliteStore::open(url.trim()).await?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "sqlite"))]
            {
                Err(backend.not_compiled())
            }
        }
        Backend::Postgres => {
            #[cfg(feature = "postgres")]
            {
                let store = postgres::PostgresStore::connect(url.trim()).await?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "postgres"))]
            {
                Err(backend.not_compiled())
            }
        }
    }
}
