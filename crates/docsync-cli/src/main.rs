//! docsync CLI - Command-line interface for docsync
//!
//! Provides commands for:
//! - Listing the documents of a store
//! - Watching the document list as it changes
//! - Resolving conflicting versions of a document
//! - Viewing and editing the configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    config::ConfigCommand, list::ListCommand, resolve::ResolveCommand, watch::WatchCommand,
    CommandContext,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "docsync", version, about = "Keep a document list in sync with a replicated store")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the documents in the store
    List(ListCommand),
    /// Follow changes to the document list
    Watch(WatchCommand),
    /// Resolve conflicting versions of a document
    Resolve(ResolveCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Log filter for the given flags, falling back to the configured level
fn log_filter(verbose: u8, quiet: bool, configured: &str) -> String {
    match (verbose, quiet) {
        (0, true) => "warn".to_string(),
        (0, false) => configured.to_string(),
        (1, _) => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = CommandContext::load(cli.config.as_deref())?;

    // Setup tracing
    let filter = log_filter(cli.verbose, cli.quiet, &ctx.config.logging.level);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::List(cmd) => cmd.execute(&ctx, format).await,
        Commands::Watch(cmd) => cmd.execute(&ctx, format).await,
        Commands::Resolve(cmd) => cmd.execute(&ctx, format).await,
        Commands::Config(cmd) => cmd.execute(&ctx, format).await,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(log_filter(0, false, "info"), "info");
        assert_eq!(log_filter(0, true, "info"), "warn");
        assert_eq!(log_filter(1, false, "warn"), "debug");
        assert_eq!(log_filter(3, false, "warn"), "trace");
    }

    #[test]
    fn test_parse_resolve_with_root() {
        let cli = Cli::try_parse_from(["docsync", "resolve", "a.shoebox", "--root", "/store"]).unwrap();
        match cli.command {
            Commands::Resolve(cmd) => {
                assert_eq!(cmd.path, PathBuf::from("a.shoebox"));
                assert_eq!(cmd.root, Some(PathBuf::from("/store")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
