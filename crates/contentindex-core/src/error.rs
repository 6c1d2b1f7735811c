//! Error types for the contentindex projector.

use thiserror::Error;

/// Errors that can occur while projecting blocks.
#[derive(Debug, Error)]
pub enum ProjectorError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Storage connection failed: {0}")]
    Connect(String),

    #[error("Schema initialization failed: {0}")]
    Schema(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid object id '{0}'")]
    InvalidObjectId(String),
}

impl ProjectorError {
    /// Returns `true` if the error must abort plugin startup.
    ///
    /// Per-write storage failures are logged and skipped by the ingestor;
    /// everything else happens before the plugin becomes active.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Schema(_) | Self::Config(_))
    }
}
