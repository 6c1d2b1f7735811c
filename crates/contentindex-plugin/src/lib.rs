//! contentindex-plugin — block ingestor and plugin lifecycle.

pub mod builder;
pub mod ingestor;
pub mod plugin;

pub use builder::ProjectorBuilder;
pub use ingestor::{BlockIngestor, IngestReport};
pub use plugin::ContentIndexPlugin;
