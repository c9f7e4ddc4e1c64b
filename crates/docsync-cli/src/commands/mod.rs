//! CLI subcommands and the helpers they share

pub mod config;
pub mod list;
pub mod resolve;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use docsync_core::config::Config;
use docsync_sync::LocalDirectoryStore;

/// Settings every command needs
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config_path: PathBuf,
    pub config: Config,
}

impl CommandContext {
    /// Load the configuration from `path`, or from the default location
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Config::default_path);
        let config = if config_path.exists() {
            Config::load(&config_path)
                .with_context(|| format!("Failed to load {}", config_path.display()))?
        } else {
            Config::default()
        };
        Ok(Self {
            config_path,
            config,
        })
    }

    /// Store rooted at `root`, falling back to `store.root` from the configuration
    pub fn open_store(&self, root: Option<&Path>) -> Arc<LocalDirectoryStore> {
        let root = root
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.store.root.clone());
        Arc::new(LocalDirectoryStore::new(root))
    }
}
