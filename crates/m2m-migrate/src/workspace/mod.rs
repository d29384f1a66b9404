//! Databricks workspace access.

mod client;
mod types;

pub use client::WorkspaceClient;
pub use types::*;

use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Catalog listing and statement execution against one workspace.
#[async_trait]
pub trait Workspace: Send + Sync {
    /// Workspace URL, used in log lines.
    fn host(&self) -> &str;

    /// List every catalog visible to the principal.
    async fn list_catalogs(&self) -> Result<Vec<CatalogInfo>>;

    /// List the schemas of a catalog.
    async fn list_schemas(&self, catalog: &str) -> Result<Vec<SchemaInfo>>;

    /// List the tables and views of a schema.
    async fn list_tables(&self, catalog: &str, schema: &str) -> Result<Vec<TableSummary>>;

    /// Execute a statement on the workspace's SQL warehouse and wait for it.
    ///
    /// Returns an error unless the statement reaches `SUCCEEDED`.
    async fn execute_statement(&self, statement: &str) -> Result<StatementResult>;
}

/// The source and destination workspace handles for one run.
#[derive(Clone)]
pub struct Api {
    pub source: Arc<dyn Workspace>,
    pub dest: Arc<dyn Workspace>,
}

impl Api {
    pub fn new(source: Arc<dyn Workspace>, dest: Arc<dyn Workspace>) -> Self {
        Self { source, dest }
    }

    /// Build HTTP clients for both workspaces. No request is sent until the
    /// first API call.
    pub fn from_config(config: &Config) -> Result<Self> {
        let request_timeout = Duration::from_secs(config.migration.get_request_timeout_secs());
        let statement_timeout =
            Duration::from_secs(config.migration.get_statement_timeout_secs());

        let source = WorkspaceClient::new(config.source.clone(), request_timeout)?
            .with_statement_timeout(statement_timeout);
        let dest = WorkspaceClient::new(config.dest.clone(), request_timeout)?
            .with_statement_timeout(statement_timeout);

        Ok(Self::new(Arc::new(source), Arc::new(dest)))
    }
}
