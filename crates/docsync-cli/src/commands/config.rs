//! Config command - View and manage docsync configuration
//!
//! Provides the `docsync config` CLI command which:
//! 1. Shows the current configuration (YAML or JSON)
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration file and reports errors
//! 4. Prints the configuration file path

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use tracing::info;

use docsync_core::{
    config::Config,
    ports::remote_query::{SearchScope, SortKey},
};

use crate::commands::CommandContext;
use crate::output::{get_formatter, OutputFormat};

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "store.name_suffix")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, ctx: &CommandContext, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx, format),
            ConfigCommand::Set { key, value } => self.execute_set(ctx, key, value, format),
            ConfigCommand::Validate => self.execute_validate(ctx, format),
            ConfigCommand::Path => {
                let formatter = get_formatter(format);
                if format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "config_path": ctx.config_path.display().to_string(),
                        "exists": ctx.config_path.exists(),
                    }));
                } else {
                    println!("{}", ctx.config_path.display());
                }
                Ok(())
            }
        }
    }

    /// Show current configuration
    fn execute_show(&self, ctx: &CommandContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        info!(config_path = %ctx.config_path.display(), "Showing configuration");

        if format.is_json() {
            let json = serde_json::to_value(&ctx.config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
            formatter.info("");

            let yaml = serde_yaml::to_string(&ctx.config)
                .context("Failed to serialize configuration to YAML")?;

            for line in yaml.lines() {
                formatter.info(line);
            }
        }

        Ok(())
    }

    /// Set a configuration value using dot-notation
    fn execute_set(
        &self,
        ctx: &CommandContext,
        key: &str,
        value: &str,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = get_formatter(format);
        let mut config = ctx.config.clone();

        info!(key = %key, value = %value, "Setting configuration value");

        if let Err(e) = apply_config_value(&mut config, key, value) {
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "error": e.to_string(),
                }));
            } else {
                formatter.error(&format!("Failed to set '{}': {}", key, e));
                formatter.info("");
                formatter.info("Supported keys:");
                formatter.info("  store.root                 - Store root directory");
                formatter.info("  store.name_suffix          - Document name suffix, e.g. .shoebox");
                formatter.info("  store.search_scopes        - Comma-separated: data,documents");
                formatter.info("  store.sort_key             - name|modified_at");
                formatter.info("  conflicts.auto_resolve     - true|false");
                formatter.info("  conflicts.winner_policy    - latest_modification");
                formatter.info("  logging.level              - trace|debug|info|warn|error");
            }
            return Ok(());
        }

        // The store root may legitimately not exist yet.
        let errors: Vec<String> = config
            .validate()
            .iter()
            .filter(|e| e.field != "store.root")
            .map(|e| e.to_string())
            .collect();

        if !errors.is_empty() {
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "errors": errors,
                }));
            } else {
                formatter.error(&format!("Invalid value for '{}': {}", key, errors.join("; ")));
            }
            return Ok(());
        }

        if let Some(parent) = ctx.config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
        }
        let yaml = serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
        std::fs::write(&ctx.config_path, yaml).context("Failed to write configuration file")?;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "value": value,
                "config_path": ctx.config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Set {} = {}", key, value));
            formatter.info(&format!("Saved to {}", ctx.config_path.display()));
        }

        Ok(())
    }

    /// Validate configuration file
    fn execute_validate(&self, ctx: &CommandContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let config_path = &ctx.config_path;

        if !config_path.exists() {
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "valid": false,
                    "config_path": config_path.display().to_string(),
                    "errors": ["Configuration file not found. Using defaults."],
                }));
            } else {
                formatter.info(&format!(
                    "Configuration file not found at {}",
                    config_path.display()
                ));
                formatter.info(
                    "Using default configuration. Run 'docsync config set <key> <value>' to create one.",
                );
            }
            return Ok(());
        }

        info!(config_path = %config_path.display(), "Validating configuration");

        let errors = ctx.config.validate();

        if format.is_json() {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", config_path.display()));
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            formatter.info(&format!("File: {}", config_path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }

        Ok(())
    }
}

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- store ---
        "store.root" => {
            config.store.root = PathBuf::from(value);
        }
        "store.name_suffix" => {
            config.store.name_suffix = value.to_string();
        }
        "store.search_scopes" => {
            config.store.search_scopes = value
                .split(',')
                .map(|s| parse_scope(s.trim()))
                .collect::<Result<Vec<_>>>()?;
        }
        "store.sort_key" => {
            config.store.sort_key = match value {
                "name" => SortKey::Name,
                "modified_at" => SortKey::ModifiedAt,
                other => bail!("Unknown sort key '{}'; expected name or modified_at", other),
            };
        }

        // --- conflicts ---
        "conflicts.auto_resolve" => {
            config.conflicts.auto_resolve = value
                .parse::<bool>()
                .context("Expected true or false for conflicts.auto_resolve")?;
        }
        "conflicts.winner_policy" => {
            config.conflicts.winner_policy = value.to_string();
        }

        // --- logging ---
        "logging.level" => {
            config.logging.level = value.to_string();
        }

        _ => bail!("Unknown configuration key: {}", key),
    }

    Ok(())
}

fn parse_scope(value: &str) -> Result<SearchScope> {
    match value {
        "data" => Ok(SearchScope::Data),
        "documents" => Ok(SearchScope::Documents),
        other => bail!("Unknown search scope '{}'; expected data or documents", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_store_root() {
        let mut config = Config::default();
        apply_config_value(&mut config, "store.root", "/custom/path").unwrap();
        assert_eq!(config.store.root, PathBuf::from("/custom/path"));
    }

    #[test]
    fn test_apply_store_name_suffix() {
        let mut config = Config::default();
        apply_config_value(&mut config, "store.name_suffix", ".album").unwrap();
        assert_eq!(config.store.name_suffix, ".album");
    }

    #[test]
    fn test_apply_store_search_scopes() {
        let mut config = Config::default();
        apply_config_value(&mut config, "store.search_scopes", "documents").unwrap();
        assert_eq!(config.store.search_scopes, vec![SearchScope::Documents]);

        apply_config_value(&mut config, "store.search_scopes", "data, documents").unwrap();
        assert_eq!(
            config.store.search_scopes,
            vec![SearchScope::Data, SearchScope::Documents]
        );
    }

    #[test]
    fn test_apply_store_search_scopes_invalid() {
        let mut config = Config::default();
        assert!(apply_config_value(&mut config, "store.search_scopes", "trash").is_err());
    }

    #[test]
    fn test_apply_store_sort_key() {
        let mut config = Config::default();
        apply_config_value(&mut config, "store.sort_key", "modified_at").unwrap();
        assert_eq!(config.store.sort_key, SortKey::ModifiedAt);
        assert!(apply_config_value(&mut config, "store.sort_key", "size").is_err());
    }

    #[test]
    fn test_apply_conflicts_auto_resolve() {
        let mut config = Config::default();
        apply_config_value(&mut config, "conflicts.auto_resolve", "false").unwrap();
        assert!(!config.conflicts.auto_resolve);
    }

    #[test]
    fn test_apply_logging_level() {
        let mut config = Config::default();
        apply_config_value(&mut config, "logging.level", "debug").unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_apply_unknown_key() {
        let mut config = Config::default();
        let result = apply_config_value(&mut config, "sync.poll_interval", "60");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown configuration key"));
    }
}
