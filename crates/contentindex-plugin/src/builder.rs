//! Fluent builder API for projector configuration.
//!
//! # Example
//!
//! ```rust
//! use contentindex_plugin::ProjectorBuilder;
//!
//! let config = ProjectorBuilder::new()
//!     .storage_connection_url("postgresql://localhost/content")
//!     .start_block(19_000_000)
//!     .build_config();
//! assert!(config.is_enabled());
//! ```

use contentindex_core::config::ProjectorConfig;

use crate::plugin::ContentIndexPlugin;

/// Fluent builder for `ProjectorConfig`.
#[derive(Default)]
pub struct ProjectorBuilder {
    config: ProjectorConfig,
}

impl ProjectorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the storage connection URL. Leaving it unset disables the plugin.
    pub fn storage_connection_url(mut self, url: impl Into<String>) -> Self {
        self.config.storage_connection_url = Some(url.into());
        self
    }

    /// Set the first block to project.
    pub fn start_block(mut self, block: u64) -> Self {
        self.config.start_block = block;
        self
    }

    /// Build the `ProjectorConfig`.
    pub fn build_config(self) -> ProjectorConfig {
        self.config
    }

    /// Build an idle plugin from the configuration.
    pub fn build(self) -> ContentIndexPlugin {
        ContentIndexPlugin::new(self.config)
    }
}
