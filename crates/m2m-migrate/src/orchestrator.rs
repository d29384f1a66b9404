//! Migration orchestrator - main workflow coordinator.

use crate::apply::apply_migration;
use crate::config::{validate_catalogs, Config};
use crate::discovery::{list_tables_and_views, DiscoveryOptions};
use crate::error::Result;
use crate::retry::RetryPolicy;
use crate::rewrite::{IdentityNaming, MappedNaming, NamingPolicy};
use crate::table::TableInfo;
use crate::workspace::{Api, Workspace};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Migration orchestrator.
pub struct Orchestrator {
    config: Config,
    api: Api,
    naming: Box<dyn NamingPolicy>,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status: `completed` or `dry_run`.
    pub status: String,

    /// Whether destination writes were suppressed.
    pub dry_run: bool,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Number of tables created (or planned, in a dry run).
    pub tables_total: usize,

    /// Destination names of those tables.
    pub tables: Vec<String>,
}

/// Connectivity of both workspaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub source_connected: bool,
    pub source_latency_ms: u64,
    pub source_error: Option<String>,
    pub dest_connected: bool,
    pub dest_latency_ms: u64,
    pub dest_error: Option<String>,
    pub healthy: bool,
}

impl Orchestrator {
    /// Validate the configuration and build clients for both workspaces.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let api = Api::from_config(&config)?;
        Ok(Self::with_api(config, api))
    }

    /// Use prebuilt workspace handles instead of HTTP clients.
    pub fn with_api(config: Config, api: Api) -> Self {
        let naming: Box<dyn NamingPolicy> = if config.migration.has_renames() {
            Box::new(MappedNaming::from(&config.migration))
        } else {
            Box::new(IdentityNaming)
        };

        Self {
            config,
            api,
            naming,
        }
    }

    /// Replace the naming policy.
    pub fn with_naming(mut self, naming: impl NamingPolicy + 'static) -> Self {
        self.naming = Box::new(naming);
        self
    }

    fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            catalogs: self.config.migration.catalogs.clone(),
            excluded_catalogs: self.config.migration.excluded_catalogs.clone(),
            retry: RetryPolicy::from(&self.config.migration.retry),
        }
    }

    /// Run the migration.
    ///
    /// `dry_run` is combined with the configured dry run; either one turns
    /// destination writes off.
    pub async fn run(&self, dry_run: bool) -> Result<MigrationResult> {
        let dry_run = dry_run || self.config.migration.dry_run;
        validate_catalogs(&self.config.migration.catalogs)?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        info!(
            "Starting migration run {} (catalogs: {}{})",
            run_id,
            self.config.migration.catalogs.join(", "),
            if dry_run { ", dry run" } else { "" }
        );

        let tables = list_tables_and_views(&self.api, self.discovery_options())?;
        let summary = apply_migration(&self.api, tables, self.naming.as_ref(), dry_run).await?;

        let completed_at = Utc::now();
        let duration = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        let result = MigrationResult {
            run_id,
            status: if dry_run { "dry_run" } else { "completed" }.to_string(),
            dry_run,
            duration_seconds: duration,
            started_at,
            completed_at,
            tables_total: summary.tables.len(),
            tables: summary.tables.iter().map(ToString::to_string).collect(),
        };

        info!(
            "Migration {}: {} tables in {:.1}s",
            result.status, result.tables_total, result.duration_seconds
        );

        Ok(result)
    }

    /// Enumerate external tables without touching the destination.
    pub async fn list_tables(&self) -> Result<Vec<TableInfo>> {
        list_tables_and_views(&self.api, self.discovery_options())?
            .try_collect()
            .await
    }

    /// Authenticate against both workspaces and list their catalogs.
    pub async fn health_check(&self) -> Result<HealthCheckResult> {
        let (source_connected, source_latency_ms, source_error) =
            probe(self.api.source.as_ref()).await;
        let (dest_connected, dest_latency_ms, dest_error) = probe(self.api.dest.as_ref()).await;

        Ok(HealthCheckResult {
            source_connected,
            source_latency_ms,
            source_error,
            dest_connected,
            dest_latency_ms,
            dest_error,
            healthy: source_connected && dest_connected,
        })
    }
}

async fn probe(workspace: &dyn Workspace) -> (bool, u64, Option<String>) {
    let start = Instant::now();
    let result = workspace.list_catalogs().await;
    let latency = start.elapsed().as_millis() as u64;

    match result {
        Ok(catalogs) => {
            info!(
                "{}: reachable, {} catalogs visible ({}ms)",
                workspace.host(),
                catalogs.len(),
                latency
            );
            (true, latency, None)
        }
        Err(e) => (false, latency, Some(e.to_string())),
    }
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
