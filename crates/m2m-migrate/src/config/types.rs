//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Root configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    /// Source workspace, read from `DATABRICKS_SOURCE_*`.
    pub source: WorkspaceConfig,

    /// Destination workspace, read from `DATABRICKS_DEST_*`.
    pub dest: WorkspaceConfig,

    /// Migration behavior, from the optional settings file.
    pub migration: MigrationConfig,
}

/// Connection settings for one Databricks workspace.
///
/// Only ever read from the environment, never from or to a file.
#[derive(Clone)]
pub struct WorkspaceConfig {
    /// Workspace URL, e.g. `https://adb-123.4.azuredatabricks.net`.
    pub host: String,

    /// OAuth service principal client id.
    pub client_id: String,

    /// OAuth service principal secret.
    pub client_secret: String,

    /// SQL warehouse used for statement execution.
    pub warehouse_id: String,
}

impl fmt::Debug for WorkspaceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceConfig")
            .field("host", &self.host)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("warehouse_id", &self.warehouse_id)
            .finish()
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MigrationConfig {
    /// Catalogs to migrate. Must be non-empty before discovery starts.
    #[serde(default)]
    pub catalogs: Vec<String>,

    /// Catalogs never enumerated, in addition to the system catalogs.
    #[serde(default)]
    pub excluded_catalogs: Vec<String>,

    /// Source catalog -> destination catalog renames.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub catalog_map: BTreeMap<String, String>,

    /// Source schema -> destination schema renames.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub schema_map: BTreeMap<String, String>,

    /// Log statements instead of executing them on the destination.
    #[serde(default)]
    pub dry_run: bool,

    /// Retry policy for reading creation statements from the source.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Seconds to wait for a single statement to finish (default: 300).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_timeout_secs: Option<u64>,

    /// Per-request HTTP timeout in seconds (default: 60).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl MigrationConfig {
    pub fn get_statement_timeout_secs(&self) -> u64 {
        self.statement_timeout_secs.unwrap_or(300)
    }

    pub fn get_request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs.unwrap_or(60)
    }

    /// Whether any rename rule is configured.
    pub fn has_renames(&self) -> bool {
        !self.catalog_map.is_empty() || !self.schema_map.is_empty()
    }
}

/// Exponential backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first call (default: 5).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Delay before the first retry in milliseconds (default: 100).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for a single delay in milliseconds (default: 2000).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Add random jitter to each delay (default: true).
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: true,
        }
    }
}

// Default value functions for serde
fn default_max_attempts() -> usize {
    5
}

fn default_base_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    2_000
}

fn default_true() -> bool {
    true
}
