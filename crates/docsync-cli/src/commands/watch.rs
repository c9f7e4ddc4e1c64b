//! Watch command - Follow the document list as it changes
//!
//! Prints the initial snapshot, then the insert/delete/reload operations of
//! every following snapshot until Ctrl-C. With `conflicts.auto_resolve`
//! enabled, documents that appear or change are resolved on the spot.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

use docsync_conflict::{ConflictResolver, WinnerPolicy};
use docsync_core::{domain::metadata::Snapshot, usecases::CoordinatedAccessGate};
use docsync_sync::{reconcile, ListChanges, MetadataEvent, MetadataObserver};

use crate::commands::CommandContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Store root (defaults to store.root from the configuration)
    #[arg(long)]
    pub root: Option<PathBuf>,
}

impl WatchCommand {
    pub async fn execute(&self, ctx: &CommandContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let store = ctx.open_store(self.root.as_deref());

        let resolver = if ctx.config.conflicts.auto_resolve {
            let policy: WinnerPolicy = ctx.config.conflicts.winner_policy.parse()?;
            Some(
                ConflictResolver::new(
                    Arc::clone(&store) as _,
                    CoordinatedAccessGate::new(Arc::clone(&store) as _),
                )
                .with_policy(policy),
            )
        } else {
            None
        };

        let observer = MetadataObserver::new(Arc::clone(&store) as _);
        let (_subscription, mut rx) = observer.subscribe_channel();
        observer.start(ctx.config.query_config())?;

        info!(root = %store.root().display(), "Watching store, press Ctrl-C to stop");
        formatter.success(&format!("Watching {}", store.root().display()));

        let mut previous: Snapshot = Arc::from(Vec::new());
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(MetadataEvent::Changed(snapshot)) => {
                        let changes = reconcile(&previous, &snapshot);
                        if !changes.is_empty() {
                            formatter.print_changes(&previous, &snapshot, &changes);
                        }
                        if let Some(resolver) = &resolver {
                            auto_resolve(resolver, &snapshot, &changes).await;
                        }
                        previous = snapshot;
                    }
                    Some(MetadataEvent::Unavailable) | None => {
                        formatter.error("Store is unavailable");
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, stopping watch");
                    break;
                }
            }
        }

        observer.stop();
        Ok(())
    }
}

/// Resolve conflicts of every inserted or reloaded document
async fn auto_resolve(resolver: &ConflictResolver, snapshot: &Snapshot, changes: &ListChanges) {
    for &i in changes.insertions.iter().chain(&changes.reloads) {
        let item = &snapshot[i];
        let outcome = resolver.resolve(item.url().clone()).await;
        if let Some(error) = &outcome.error {
            warn!(document = %item.url(), error = %error, "Automatic resolution failed");
        } else if outcome.winner.is_some() {
            info!(
                document = %item.url(),
                reload_required = outcome.reload_required,
                "Resolved conflicting versions"
            );
        }
    }
}
