//! contentindex CLI — manage and exercise the content/permission projection.
//!
//! Usage:
//! ```bash
//! contentindex info
//! contentindex init-schema --storage-connection-url postgresql://localhost/content
//! contentindex replay --blocks blocks.ndjson --storage-connection-url sqlite:./projection.db
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use contentindex_core::config::ProjectorConfig;
use contentindex_core::store::ProjectionStore;

mod cmd_replay;
mod logging;

#[derive(Parser)]
#[command(
    name = "contentindex",
    about = "Project ledger content and permission operations into relational storage",
    long_about = "
ContentIndex CLI: create the projection schema and replay block dumps.

ENVIRONMENT VARIABLES:
  CONTENTINDEX_STORAGE_URL    Storage connection URL (postgresql://, sqlite:, memory:)
  CONTENTINDEX_START_BLOCK    First block to project
  RUST_LOG                    Log filter, overrides --log-level
",
    version
)]
struct Cli {
    /// Default log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ProjectorArgs {
    /// Storage connection URL; without it the projector is disabled
    #[arg(long, env = "CONTENTINDEX_STORAGE_URL")]
    storage_connection_url: Option<String>,

    /// Blocks numbered below this are ignored
    #[arg(long, env = "CONTENTINDEX_START_BLOCK", default_value_t = 0)]
    start_block: u64,
}

impl From<ProjectorArgs> for ProjectorConfig {
    fn from(args: ProjectorArgs) -> Self {
        ProjectorConfig {
            storage_connection_url: args.storage_connection_url,
            start_block: args.start_block,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show version, backends and options
    Info,

    /// Connect to storage and create the projection tables
    #[command(name = "init-schema")]
    InitSchema {
        /// Storage connection URL
        #[arg(long, env = "CONTENTINDEX_STORAGE_URL")]
        storage_connection_url: String,
    },

    /// Apply newline-delimited JSON blocks through the projector
    Replay {
        /// File with one JSON block per line
        #[arg(long)]
        blocks: PathBuf,

        #[command(flatten)]
        projector: ProjectorArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(&logging::LogConfig {
        level: cli.log_level,
        json: cli.json_logs,
    });

    match cli.command {
        Commands::Info => {
            cmd_info();
            Ok(())
        }
        Commands::InitSchema {
            storage_connection_url,
        } => cmd_init_schema(&storage_connection_url).await,
        Commands::Replay { blocks, projector } => cmd_replay::run(&blocks, projector.into()).await,
    }
}

fn cmd_info() {
    println!("ContentIndex v{}", env!("CARGO_PKG_VERSION"));
    println!("  Projects: content create/update/remove, permission create/create-many/remove");
    println!("  Storage backends: memory:, sqlite:<path>, postgresql://");
    println!("  Options:");
    println!("    --storage-connection-url  (env CONTENTINDEX_STORAGE_URL, unset = disabled)");
    println!("    --start-block             (env CONTENTINDEX_START_BLOCK, default 0)");
}

async fn cmd_init_schema(url: &str) -> Result<()> {
    let store = contentindex_storage::connect(url)
        .await
        .context("connect to storage")?;
    let result = store.ensure_schema().await.context("create projection schema");
    store.close().await;
    result?;

    tracing::info!(backend = store.backend(), "projection schema ready");
    println!("Schema ready ({} backend)", store.backend());
    Ok(())
}
