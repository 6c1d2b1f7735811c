//! Projector configuration and plugin status types.

use serde::{Deserialize, Serialize};

/// Configuration for a projector instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectorConfig {
    /// Storage connection URL (`postgresql://…`, `sqlite:…`, `memory:`).
    /// `None` disables the projector.
    #[serde(default)]
    pub storage_connection_url: Option<String>,
    /// Blocks numbered below this are ignored.
    #[serde(default)]
    pub start_block: u64,
}

impl ProjectorConfig {
    /// Returns `true` if a storage URL is configured.
    pub fn is_enabled(&self) -> bool {
        self.storage_connection_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}

/// Lifecycle status of the projector plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginStatus {
    /// Constructed, not started.
    Idle,
    /// No storage URL configured; the plugin is inert.
    Disabled,
    /// Subscribed to the block feed and projecting.
    Active,
    /// Unsubscribed and storage released.
    Stopped,
}

impl std::fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Disabled => write!(f, "disabled"),
            Self::Active => write!(f, "active"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}
