//! List command - Print the current document list once
//!
//! Starts the metadata observer against the store, waits for the initial
//! gathering and prints the resulting snapshot. Documents with versions in
//! conflict are flagged.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;
use tracing::info;

use docsync_conflict::ConflictResolver;
use docsync_core::{domain::metadata::Snapshot, usecases::CoordinatedAccessGate};
use docsync_sync::{LocalDirectoryStore, MetadataEvent, MetadataObserver};

use crate::commands::CommandContext;
use crate::output::{get_formatter, DocumentRow, OutputFormat};

/// How long to wait for the initial gathering
const GATHER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Args)]
pub struct ListCommand {
    /// Store root (defaults to store.root from the configuration)
    #[arg(long)]
    pub root: Option<PathBuf>,
}

impl ListCommand {
    pub async fn execute(&self, ctx: &CommandContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let store = ctx.open_store(self.root.as_deref());

        info!(root = %store.root().display(), "Listing documents");

        let snapshot = gather_once(ctx, Arc::clone(&store)).await?;

        let resolver = ConflictResolver::new(
            Arc::clone(&store) as _,
            CoordinatedAccessGate::new(Arc::clone(&store) as _),
        );
        let mut rows = Vec::with_capacity(snapshot.len());
        for item in snapshot.iter() {
            let conflicted = match resolver.has_conflicts(item.url().clone()).await {
                Ok(conflicted) => conflicted,
                Err(e) => {
                    formatter.warn(&format!("Could not check {}: {}", item.name(), e));
                    false
                }
            };
            rows.push(DocumentRow { item, conflicted });
        }

        formatter.print_documents(store.root(), &rows);
        Ok(())
    }
}

/// Start an observer, wait for its first snapshot and stop it
async fn gather_once(ctx: &CommandContext, store: Arc<LocalDirectoryStore>) -> Result<Snapshot> {
    let observer = MetadataObserver::new(store as _);
    let (_subscription, mut rx) = observer.subscribe_channel();

    observer.start(ctx.config.query_config())?;

    let event = tokio::time::timeout(GATHER_TIMEOUT, rx.recv()).await;
    observer.stop();

    match event {
        Ok(Some(MetadataEvent::Changed(snapshot))) => Ok(snapshot),
        Ok(Some(MetadataEvent::Unavailable)) | Ok(None) => bail!("Store is unavailable"),
        Err(_) => bail!("Timed out waiting for the store"),
    }
}
