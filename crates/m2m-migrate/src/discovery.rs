//! Walk catalogs, schemas and tables on the source workspace and collect
//! the creation statement of every external table.

use crate::config::validate_catalogs;
use crate::error::{MigrateError, Result};
use crate::retry::RetryPolicy;
use crate::table::{QualifiedName, TableInfo};
use crate::workspace::{Api, TableType, Workspace};
use async_stream::try_stream;
use futures::Stream;
use tracing::{debug, info, warn};

/// Catalogs managed by the platform. Never enumerated.
pub const SYSTEM_CATALOGS: [&str; 3] = ["system", "system_billing_usage", "hive_metastore"];

/// What to enumerate and how to retry statement fetches.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// Catalogs to walk. Must not be empty.
    pub catalogs: Vec<String>,
    /// Extra catalogs to skip besides [`SYSTEM_CATALOGS`].
    pub excluded_catalogs: Vec<String>,
    pub retry: RetryPolicy,
}

impl DiscoveryOptions {
    pub fn new(catalogs: Vec<String>) -> Self {
        Self {
            catalogs,
            ..Self::default()
        }
    }

    fn is_excluded(&self, catalog: &str) -> bool {
        SYSTEM_CATALOGS
            .iter()
            .copied()
            .chain(self.excluded_catalogs.iter().map(String::as_str))
            .any(|excluded| excluded.eq_ignore_ascii_case(catalog))
    }
}

/// Lazily enumerate the external tables of the selected catalogs.
///
/// The scope is checked before anything is sent. The returned stream makes
/// its API calls as it is polled, one table at a time, and stops at the
/// first error. It cannot be restarted; enumerating again means calling
/// this function again, which repeats every API call.
pub fn list_tables_and_views(
    api: &Api,
    options: DiscoveryOptions,
) -> Result<impl Stream<Item = Result<TableInfo>> + Send + '_> {
    validate_catalogs(&options.catalogs)?;

    Ok(try_stream! {
        for catalog in &options.catalogs {
            if options.is_excluded(catalog) {
                info!("Skipping excluded catalog {}", catalog);
                continue;
            }

            info!("Listing tables and views in catalog {}", catalog);
            for schema in api.source.list_schemas(catalog).await? {
                info!("Listing tables and views in schema {}", schema.name);

                for table in api.source.list_tables(catalog, &schema.name).await? {
                    if table.table_type != TableType::External {
                        warn!(
                            "Skipping object {} because it is not an external table ({})",
                            table.name, table.table_type
                        );
                        continue;
                    }

                    let name = QualifiedName::new(
                        &table.catalog_name,
                        &table.schema_name,
                        &table.name,
                    );
                    let create_statement =
                        get_create_statement(api.source.as_ref(), &name, &options.retry).await?;

                    yield TableInfo {
                        catalog_name: table.catalog_name,
                        schema_name: table.schema_name,
                        table_name: table.name,
                        table_type: table.table_type,
                        create_statement,
                    };
                }
            }
        }
    })
}

/// Fetch `SHOW CREATE TABLE` output for one table under `retry`.
pub async fn get_create_statement(
    source: &dyn Workspace,
    name: &QualifiedName,
    retry: &RetryPolicy,
) -> Result<String> {
    let statement = format!("SHOW CREATE TABLE {}", name);
    debug!("{}", statement);

    retry
        .run(&format!("Fetching creation statement for {}", name), || async {
            let result = source.execute_statement(&statement).await?;
            result
                .first_value()
                .map(str::to_owned)
                .ok_or_else(|| MigrateError::EmptyResult(statement.clone()))
        })
        .await
        .map_err(|e| MigrateError::create_statement(name.to_string(), e))
}
