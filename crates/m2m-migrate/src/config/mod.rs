//! Configuration loading and validation.
//!
//! Workspace credentials always come from the environment. Everything that
//! shapes a run (catalog scope, renames, retry tuning) can additionally be
//! given in a YAML settings file.

mod types;
mod validation;

pub use types::*;
pub use validation::validate_catalogs;

use crate::error::{MigrateError, Result};
use std::path::Path;

/// Environment variables that must be set before anything else runs.
pub const REQUIRED_ENV_VARS: [&str; 8] = [
    "DATABRICKS_SOURCE_HOST",
    "DATABRICKS_SOURCE_CLIENT_ID",
    "DATABRICKS_SOURCE_CLIENT_SECRET",
    "DATABRICKS_SOURCE_WAREHOUSE_ID",
    "DATABRICKS_DEST_HOST",
    "DATABRICKS_DEST_CLIENT_ID",
    "DATABRICKS_DEST_CLIENT_SECRET",
    "DATABRICKS_DEST_WAREHOUSE_ID",
];

/// Any non-empty value turns on dry run.
pub const DRY_RUN_VAR: &str = "DRY_RUN";

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Every missing or empty required variable is reported in a single
    /// [`MigrateError::MissingEnv`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing: Vec<String> = REQUIRED_ENV_VARS
            .iter()
            .filter(|key| lookup(key).map(|v| v.is_empty()).unwrap_or(true))
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(MigrateError::MissingEnv(missing));
        }

        let var = |key: &str| lookup(key).unwrap_or_default();
        let workspace = |side: &str| WorkspaceConfig {
            host: var(&format!("DATABRICKS_{side}_HOST")),
            client_id: var(&format!("DATABRICKS_{side}_CLIENT_ID")),
            client_secret: var(&format!("DATABRICKS_{side}_CLIENT_SECRET")),
            warehouse_id: var(&format!("DATABRICKS_{side}_WAREHOUSE_ID")),
        };

        let dry_run = lookup(DRY_RUN_VAR).map(|v| !v.is_empty()).unwrap_or(false);

        Ok(Config {
            source: workspace("SOURCE"),
            dest: workspace("DEST"),
            migration: MigrationConfig {
                dry_run,
                ..MigrationConfig::default()
            },
        })
    }

    /// Merge a YAML settings file into the configuration.
    pub fn with_settings_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        self.with_settings_yaml(&content)
    }

    /// Merge YAML settings into the configuration.
    ///
    /// A dry run requested through the environment stays on even when the
    /// settings leave `dry_run` unset.
    pub fn with_settings_yaml(mut self, yaml: &str) -> Result<Self> {
        let mut settings: MigrationConfig = serde_yaml::from_str(yaml)?;
        settings.dry_run |= self.migration.dry_run;
        self.migration = settings;
        Ok(self)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}
