//! # m2m-migrate
//!
//! Copy external table definitions between Databricks Unity Catalog
//! workspaces.
//!
//! A run has three steps:
//!
//! - **Discovery** walks the selected catalogs on the source and fetches the
//!   `SHOW CREATE TABLE` output of every external table
//! - **Rewrite** renames catalog and schema through a [`NamingPolicy`] and
//!   turns the statement into `CREATE TABLE IF NOT EXISTS`
//! - **Apply** executes the statement on the destination warehouse, or only
//!   logs it in a dry run
//!
//! ## Example
//!
//! ```rust,no_run
//! use m2m_migrate::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> m2m_migrate::Result<()> {
//!     let mut config = Config::from_env()?;
//!     config.migration.catalogs = vec!["main".to_string()];
//!     let orchestrator = Orchestrator::new(config)?;
//!     let result = orchestrator.run(false).await?;
//!     println!("Created {} tables", result.tables_total);
//!     Ok(())
//! }
//! ```

pub mod apply;
pub mod config;
pub mod discovery;
pub mod error;
pub mod orchestrator;
pub mod retry;
pub mod rewrite;
pub mod table;
pub mod workspace;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use apply::{apply_migration, ApplySummary};
pub use config::{Config, MigrationConfig, RetryConfig, WorkspaceConfig};
pub use discovery::{list_tables_and_views, DiscoveryOptions, SYSTEM_CATALOGS};
pub use error::{MigrateError, Result};
pub use orchestrator::{HealthCheckResult, MigrationResult, Orchestrator};
pub use retry::RetryPolicy;
pub use rewrite::{IdentityNaming, MappedNaming, NamingPolicy, RewrittenTable};
pub use table::{QualifiedName, TableInfo};
pub use workspace::{Api, TableType, Workspace, WorkspaceClient};
