//! Configuration module for docsync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ports::remote_query::{QueryConfig, SearchScope, SortKey};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for docsync.
///
/// Missing sections fall back to their defaults, so a config file only needs
/// the values it overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub conflicts: ConflictsConfig,
    pub logging: LoggingConfig,
}

/// Store location and metadata query settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root directory of the replicated store.
    pub root: PathBuf,
    /// Document name suffix the metadata query filters on, e.g. `.shoebox`.
    pub name_suffix: String,
    /// Areas of the store the query searches.
    pub search_scopes: Vec<SearchScope>,
    /// Ascending sort order of published snapshots.
    pub sort_key: SortKey,
}

/// Conflict resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictsConfig {
    /// Resolve version conflicts of documents as `watch` sees them appear or change.
    pub auto_resolve: bool,
    /// Winner selection policy. Only `latest_modification` is supported.
    pub winner_policy: String,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/docsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("docsync")
            .join("config.yaml")
    }

    /// The metadata query described by the `store` section.
    pub fn query_config(&self) -> QueryConfig {
        QueryConfig {
            name_suffix: self.store.name_suffix.clone(),
            search_scopes: self.store.search_scopes.iter().copied().collect(),
            sort_key: self.store.sort_key,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("Shoebox"),
            name_suffix: ".shoebox".to_string(),
            search_scopes: vec![SearchScope::Data, SearchScope::Documents],
            sort_key: SortKey::Name,
        }
    }
}

impl Default for ConflictsConfig {
    fn default() -> Self {
        Self {
            auto_resolve: true,
            winner_policy: "latest_modification".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"store.name_suffix"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `conflicts.winner_policy`.
const VALID_WINNER_POLICIES: &[&str] = &["latest_modification"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- store ---
        // Tilde paths are expanded at runtime, so only check the others.
        let root_str = self.store.root.to_string_lossy();
        if !root_str.starts_with('~') && !self.store.root.exists() {
            errors.push(ValidationError {
                field: "store.root".into(),
                message: format!("directory does not exist: {}", self.store.root.display()),
            });
        }
        if self.store.name_suffix.contains('/') {
            errors.push(ValidationError {
                field: "store.name_suffix".into(),
                message: "must not contain a path separator".into(),
            });
        }
        if self.store.search_scopes.is_empty() {
            errors.push(ValidationError {
                field: "store.search_scopes".into(),
                message: "at least one scope is required".into(),
            });
        }

        // --- conflicts ---
        if !VALID_WINNER_POLICIES.contains(&self.conflicts.winner_policy.as_str()) {
            errors.push(ValidationError {
                field: "conflicts.winner_policy".into(),
                message: format!(
                    "invalid policy '{}'; valid options: {}",
                    self.conflicts.winner_policy,
                    VALID_WINNER_POLICIES.join(", ")
                ),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use docsync_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .store_root(PathBuf::from("/home/user/Shoebox"))
///     .store_name_suffix(".album")
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // -- store --

    pub fn store_root(mut self, root: PathBuf) -> Self {
        self.config.store.root = root;
        self
    }

    pub fn store_name_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.store.name_suffix = suffix.into();
        self
    }

    pub fn store_search_scopes(mut self, scopes: Vec<SearchScope>) -> Self {
        self.config.store.search_scopes = scopes;
        self
    }

    pub fn store_sort_key(mut self, sort_key: SortKey) -> Self {
        self.config.store.sort_key = sort_key;
        self
    }

    // -- conflicts --

    pub fn conflicts_auto_resolve(mut self, auto_resolve: bool) -> Self {
        self.config.conflicts.auto_resolve = auto_resolve;
        self
    }

    // -- logging --

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Consume the builder and return the [`Config`] without validation.
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    // -- Defaults --

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert!(cfg.store.root.to_string_lossy().contains("Shoebox"));
        assert_eq!(cfg.store.name_suffix, ".shoebox");
        assert_eq!(
            cfg.store.search_scopes,
            vec![SearchScope::Data, SearchScope::Documents]
        );
        assert_eq!(cfg.store.sort_key, SortKey::Name);
        assert!(cfg.conflicts.auto_resolve);
        assert_eq!(cfg.conflicts.winner_policy, "latest_modification");
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn default_config_passes_validation() {
        let cfg = Config::default();
        let errors = cfg.validate();
        // store.root may not exist on a CI/test machine, filter that out
        let non_root_errors: Vec<_> = errors.iter().filter(|e| e.field != "store.root").collect();
        assert!(
            non_root_errors.is_empty(),
            "unexpected validation errors: {non_root_errors:?}"
        );
    }

    // -- Loading --

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
store:
  root: /tmp/test-shoebox
  name_suffix: .album
  search_scopes: [documents]
  sort_key: modified_at
conflicts:
  auto_resolve: false
  winner_policy: latest_modification
logging:
  level: debug
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.store.root, PathBuf::from("/tmp/test-shoebox"));
        assert_eq!(cfg.store.name_suffix, ".album");
        assert_eq!(cfg.store.search_scopes, vec![SearchScope::Documents]);
        assert_eq!(cfg.store.sort_key, SortKey::ModifiedAt);
        assert!(!cfg.conflicts.auto_resolve);
        assert_eq!(cfg.logging.level, "debug");
    }

    #[test]
    fn load_partial_yaml_fills_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"logging:\n  level: warn\n").unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.logging.level, "warn");
        assert_eq!(cfg.store.name_suffix, ".shoebox");
    }

    #[test]
    fn load_or_default_returns_default_on_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(cfg.store.name_suffix, ".shoebox");
    }

    #[test]
    fn load_returns_error_on_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"not: [valid: yaml: {{{").unwrap();
        tmp.flush().unwrap();

        let result = Config::load(tmp.path());
        assert!(result.is_err());
    }

    #[test]
    fn query_config_mirrors_store_section() {
        let cfg = ConfigBuilder::new()
            .store_name_suffix(".album")
            .store_search_scopes(vec![SearchScope::Documents])
            .store_sort_key(SortKey::ModifiedAt)
            .build();

        let query = cfg.query_config();
        assert_eq!(query.name_suffix, ".album");
        assert_eq!(query.search_scopes.len(), 1);
        assert!(query.search_scopes.contains(&SearchScope::Documents));
        assert_eq!(query.sort_key, SortKey::ModifiedAt);
    }

    // -- Validation --

    #[test]
    fn validate_catches_missing_root() {
        let cfg = ConfigBuilder::new()
            .store_root(PathBuf::from("/nonexistent/docsync/root"))
            .build();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "store.root"));
    }

    #[test]
    fn validate_accepts_existing_root() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ConfigBuilder::new()
            .store_root(dir.path().to_path_buf())
            .build();
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn validate_catches_separator_in_suffix() {
        let cfg = ConfigBuilder::new().store_name_suffix("a/b").build();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "store.name_suffix"));
    }

    #[test]
    fn validate_catches_empty_scopes() {
        let cfg = ConfigBuilder::new().store_search_scopes(vec![]).build();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "store.search_scopes"));
    }

    #[test]
    fn validate_catches_unknown_winner_policy() {
        let mut cfg = Config::default();
        cfg.conflicts.winner_policy = "merge".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "conflicts.winner_policy"));
    }

    #[test]
    fn validate_catches_invalid_log_level() {
        let cfg = ConfigBuilder::new().logging_level("verbose").build();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "logging.level"));
    }

    #[test]
    fn validate_accepts_all_valid_log_levels() {
        for level in VALID_LOG_LEVELS {
            let cfg = ConfigBuilder::new().logging_level(*level).build();
            let errors = cfg.validate();
            assert!(
                !errors.iter().any(|e| e.field == "logging.level"),
                "level '{level}' should be valid"
            );
        }
    }

    // -- Builder --

    #[test]
    fn builder_starts_from_defaults() {
        let cfg = ConfigBuilder::new().build();
        assert_eq!(cfg.store.name_suffix, ".shoebox");
        assert!(cfg.conflicts.auto_resolve);
    }

    #[test]
    fn builder_build_validated_fails_for_invalid_config() {
        let result = ConfigBuilder::new()
            .store_search_scopes(vec![])
            .logging_level("nope")
            .build_validated();
        assert!(result.is_err());
        let errors = result.unwrap_err();
        assert!(errors.len() >= 2);
    }

    // -- default_path --

    #[test]
    fn default_path_ends_with_config_yaml() {
        let p = Config::default_path();
        assert!(p.ends_with("docsync/config.yaml"));
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError {
            field: "store.search_scopes".into(),
            message: "at least one scope is required".into(),
        };
        assert_eq!(
            err.to_string(),
            "store.search_scopes: at least one scope is required"
        );
    }
}
