//! Resolve command - Reconcile a document's conflicting versions
//!
//! Keeps the version with the latest modification (the current one on a
//! tie) and removes all others.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use docsync_conflict::{ConflictResolver, WinnerPolicy};
use docsync_core::{domain::newtypes::DocLocation, usecases::CoordinatedAccessGate};

use crate::commands::CommandContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct ResolveCommand {
    /// Document to resolve
    pub path: PathBuf,

    /// Store root (defaults to store.root from the configuration)
    #[arg(long)]
    pub root: Option<PathBuf>,
}

impl ResolveCommand {
    pub async fn execute(&self, ctx: &CommandContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let store = ctx.open_store(self.root.as_deref());
        let location = document_location(&self.path, store.root())?;

        let policy: WinnerPolicy = ctx.config.conflicts.winner_policy.parse()?;
        let resolver = ConflictResolver::new(
            Arc::clone(&store) as _,
            CoordinatedAccessGate::new(Arc::clone(&store) as _),
        )
        .with_policy(policy);

        info!(document = %location, %policy, "Resolving conflicts");
        let outcome = resolver.resolve(location.clone()).await;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "document": location.to_string(),
                "resolved": outcome.is_resolved(),
                "reload_required": outcome.reload_required,
                "winner": outcome.winner.map(|w| w.to_string()),
                "versions_removed": outcome.versions_removed,
                "error": outcome.error.as_ref().map(|e| e.to_string()),
            }));
        } else if let Some(error) = &outcome.error {
            formatter.error(&error.to_string());
            formatter.info("The conflict remains; run the command again to retry.");
        } else if outcome.winner.is_none() {
            formatter.success(&format!("{} has no conflicting versions", location));
        } else {
            formatter.success(&format!(
                "Resolved {} ({} version{} removed)",
                location,
                outcome.versions_removed,
                if outcome.versions_removed == 1 { "" } else { "s" }
            ));
            if outcome.reload_required {
                formatter.info("A newer version was promoted; reopen the document.");
            }
        }

        Ok(())
    }
}

/// Absolute location of `path`, resolving relative paths against the store root
fn document_location(path: &Path, root: &Path) -> Result<DocLocation> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };
    DocLocation::new(absolute).with_context(|| format!("Invalid document path: {}", path.display()))
}
