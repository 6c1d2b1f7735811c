//! Plugin lifecycle: configure, start against a [`BlockFeed`], shut down.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use contentindex_core::feed::BlockFeed;
//! use contentindex_plugin::{ContentIndexPlugin, ProjectorBuilder};
//!
//! # async fn example() -> Result<(), contentindex_core::ProjectorError> {
//! let feed = Arc::new(BlockFeed::new());
//! let config = ProjectorBuilder::new()
//!     .storage_connection_url("sqlite:./projection.db")
//!     .start_block(1_000)
//!     .build_config();
//!
//! let mut plugin = ContentIndexPlugin::new(config);
//! plugin.startup(&feed).await?;
//! // ... the ledger calls feed.apply(&block) for every finalized block ...
//! plugin.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use contentindex_core::config::{PluginStatus, ProjectorConfig};
use contentindex_core::error::ProjectorError;
use contentindex_core::feed::{BlockFeed, SubscriptionId};
use contentindex_core::store::ProjectionStore;
use contentindex_core::writer::ProjectionWriter;

use crate::ingestor::{BlockIngestor, IngestReport};

/// Live resources held while the plugin is active.
struct Running {
    feed: Arc<BlockFeed>,
    subscription: SubscriptionId,
    ingestor: Arc<BlockIngestor>,
    store: Arc<dyn ProjectionStore>,
}

/// Projects content and permission operations into relational storage.
pub struct ContentIndexPlugin {
    config: ProjectorConfig,
    status: PluginStatus,
    running: Option<Running>,
    /// Totals carried over from earlier runs, so they survive shutdown.
    finished: IngestReport,
}

impl ContentIndexPlugin {
    pub fn new(config: ProjectorConfig) -> Self {
        Self {
            config,
            status: PluginStatus::Idle,
            running: None,
            finished: IngestReport::default(),
        }
    }

    pub fn config(&self) -> &ProjectorConfig {
        &self.config
    }

    pub fn status(&self) -> PluginStatus {
        self.status
    }

    /// Connect to the configured store and subscribe to `feed`.
    ///
    /// Without a storage URL the plugin stays inert and reports
    /// [`PluginStatus::Disabled`]. Connection and schema failures are fatal.
    pub async fn startup(&mut self, feed: &Arc<BlockFeed>) -> Result<PluginStatus, ProjectorError> {
        if self.status == PluginStatus::Active {
            return Ok(self.status);
        }
        let url = match self.config.storage_connection_url.as_deref() {
            Some(url) if self.config.is_enabled() => url.to_string(),
            _ => {
                warn!("contentindex: no storage connection url configured, plugin disabled");
                self.status = PluginStatus::Disabled;
                return Ok(self.status);
            }
        };

        let store = contentindex_storage::connect(&url).await?;
        self.startup_with_store(feed, store).await
    }

    /// Start with an already-open store. Used by tests and by embedders that
    /// manage the connection themselves.
    pub async fn startup_with_store(
        &mut self,
        feed: &Arc<BlockFeed>,
        store: Arc<dyn ProjectionStore>,
    ) -> Result<PluginStatus, ProjectorError> {
        if self.status == PluginStatus::Active {
            return Ok(self.status);
        }
        store.ensure_schema().await?;

        let ingestor = Arc::new(BlockIngestor::new(
            ProjectionWriter::new(store.clone()),
            self.config.start_block,
        ));
        let subscription = feed.subscribe(ingestor.clone());

        info!(
            backend = store.backend(),
            start_block = self.config.start_block,
            "contentindex plugin started"
        );

        self.running = Some(Running {
            feed: feed.clone(),
            subscription,
            ingestor,
            store,
        });
        self.status = PluginStatus::Active;
        Ok(self.status)
    }

    /// Totals over every block projected by this plugin.
    pub fn totals(&self) -> IngestReport {
        let mut totals = self.finished;
        if let Some(running) = &self.running {
            totals.absorb(&running.ingestor.totals());
        }
        totals
    }

    /// Unsubscribe and release the store. Calling it again is a no-op.
    pub async fn shutdown(&mut self) {
        let Some(running) = self.running.take() else {
            if self.status == PluginStatus::Active {
                self.status = PluginStatus::Stopped;
            }
            return;
        };

        running.feed.unsubscribe(running.subscription);
        running.store.close().await;
        self.finished.absorb(&running.ingestor.totals());
        self.status = PluginStatus::Stopped;

        info!(totals = %self.finished, "contentindex plugin stopped");
    }
}
