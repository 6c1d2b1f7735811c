//! `contentindex replay` — push a newline-delimited JSON block dump through
//! the plugin, exactly as the ledger would deliver it.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use contentindex_core::config::{PluginStatus, ProjectorConfig};
use contentindex_core::feed::BlockFeed;
use contentindex_core::types::Block;
use contentindex_plugin::ContentIndexPlugin;

pub async fn run(blocks: &Path, config: ProjectorConfig) -> Result<()> {
    let file = tokio::fs::File::open(blocks)
        .await
        .with_context(|| format!("open block file '{}'", blocks.display()))?;

    let feed = Arc::new(BlockFeed::new());
    let mut plugin = ContentIndexPlugin::new(config);
    let status = plugin.startup(&feed).await.context("start projector")?;
    if status == PluginStatus::Disabled {
        println!("No storage connection url given: blocks are parsed but nothing is projected.");
    }

    let mut lines = BufReader::new(file).lines();
    let mut line_no = 0usize;
    let mut applied_blocks = 0u64;
    let mut last_block = None;

    let outcome = async {
        while let Some(line) = lines.next_line().await.context("read block file")? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let block: Block = serde_json::from_str(&line)
                .with_context(|| format!("parse block on line {line_no}"))?;
            feed.apply(&block).await;
            applied_blocks += 1;
            last_block = Some(block.number);
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    plugin.shutdown().await;
    outcome?;

    let totals = plugin.totals();
    println!("Blocks read:     {applied_blocks}");
    if let Some(last) = last_block {
        println!("Last block:      {last}");
    }
    println!("Plugin status:   {}", plugin.status());
    println!("Rows written:    {}", totals.applied);
    println!("Unchanged:       {}", totals.unchanged);
    println!("Failed writes:   {}", totals.failed);
    println!("Ignored ops:     {}", totals.ignored);
    println!("Gated blocks:    {}", totals.gated);
    Ok(())
}
