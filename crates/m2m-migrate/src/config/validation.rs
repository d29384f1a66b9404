//! Configuration validation.

use super::{Config, WorkspaceConfig};
use crate::error::{MigrateError, Result};
use tracing::warn;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    validate_workspace("source", &config.source)?;
    validate_workspace("dest", &config.dest)?;

    let retry = &config.migration.retry;
    if retry.max_attempts == 0 {
        return Err(MigrateError::Config(
            "retry.max_attempts must be at least 1".into(),
        ));
    }
    if retry.base_delay_ms > retry.max_delay_ms {
        return Err(MigrateError::Config(format!(
            "retry.base_delay_ms ({}) must not exceed retry.max_delay_ms ({})",
            retry.base_delay_ms, retry.max_delay_ms
        )));
    }

    if let Some(0) = config.migration.statement_timeout_secs {
        return Err(MigrateError::Config(
            "statement_timeout_secs must be at least 1".into(),
        ));
    }
    if let Some(0) = config.migration.request_timeout_secs {
        return Err(MigrateError::Config(
            "request_timeout_secs must be at least 1".into(),
        ));
    }

    if config
        .migration
        .catalogs
        .iter()
        .chain(&config.migration.excluded_catalogs)
        .any(|c| c.trim().is_empty())
    {
        return Err(MigrateError::Config("catalog names cannot be empty".into()));
    }

    if same_workspace(&config.source, &config.dest) && !config.migration.has_renames() {
        warn!(
            "Source and destination point at the same workspace and no renames are configured; \
             every statement will be a no-op"
        );
    }

    Ok(())
}

/// Require an explicit, non-empty catalog scope.
pub fn validate_catalogs(catalogs: &[String]) -> Result<()> {
    if catalogs.is_empty() {
        return Err(MigrateError::Config(
            "no catalogs selected: pass --catalog or list `catalogs` in the settings file".into(),
        ));
    }
    Ok(())
}

fn validate_workspace(side: &str, workspace: &WorkspaceConfig) -> Result<()> {
    if !(workspace.host.starts_with("https://") || workspace.host.starts_with("http://")) {
        return Err(MigrateError::Config(format!(
            "{}.host must be a URL starting with https://, got '{}'",
            side, workspace.host
        )));
    }
    if workspace.warehouse_id.trim().is_empty() {
        return Err(MigrateError::Config(format!(
            "{}.warehouse_id is required",
            side
        )));
    }
    Ok(())
}

fn same_workspace(a: &WorkspaceConfig, b: &WorkspaceConfig) -> bool {
    a.host.trim_end_matches('/') == b.host.trim_end_matches('/')
}
