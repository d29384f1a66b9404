//! Replay rewritten creation statements on the destination workspace.

use crate::error::{MigrateError, Result};
use crate::rewrite::{rewrite, NamingPolicy};
use crate::table::{QualifiedName, TableInfo};
use crate::workspace::Api;
use futures::{pin_mut, Stream, TryStreamExt};
use tracing::info;

/// Tables handled by one apply pass, in processing order.
#[derive(Debug, Clone, Default)]
pub struct ApplySummary {
    pub tables: Vec<QualifiedName>,
}

/// Rewrite and execute each table's statement on the destination.
///
/// With `dry_run` the statement is only logged. Execution is not retried;
/// the first failure stops the pass and tables created before it stay.
pub async fn apply_migration<S>(
    api: &Api,
    tables: S,
    naming: &dyn NamingPolicy,
    dry_run: bool,
) -> Result<ApplySummary>
where
    S: Stream<Item = Result<TableInfo>>,
{
    pin_mut!(tables);
    let mut summary = ApplySummary::default();

    while let Some(table) = tables.try_next().await? {
        let rewritten = rewrite(&table, naming);
        let target = &rewritten.target;
        info!("Creating table {}", target);

        if dry_run {
            info!("{}", rewritten.statement);
            info!("Table {} not created (dry run)", target);
        } else {
            api.dest
                .execute_statement(&rewritten.statement)
                .await
                .map_err(|e| MigrateError::destination_write(target.to_string(), e))?;
            info!("Table {} created", target);
        }

        summary.tables.push(rewritten.target);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::{IdentityNaming, MappedNaming};
    use crate::testing::{capture_logs, shared, statement_failed, FakeWorkspace};
    use crate::workspace::TableType;
    use futures::stream;
    use std::collections::BTreeMap;

    const ORDERS_DDL: &str = "CREATE TABLE main.sales.orders (id INT) LOCATION 's3://bucket/orders'";

    fn orders() -> TableInfo {
        TableInfo {
            catalog_name: "main".to_string(),
            schema_name: "sales".to_string(),
            table_name: "orders".to_string(),
            table_type: TableType::External,
            create_statement: ORDERS_DDL.to_string(),
        }
    }

    fn returns() -> TableInfo {
        TableInfo {
            table_name: "returns".to_string(),
            create_statement: "CREATE TABLE main.sales.returns (id INT)".to_string(),
            ..orders()
        }
    }

    #[tokio::test]
    async fn test_submits_rewritten_statement() {
        let dest = shared(FakeWorkspace::new());
        let api = Api::new(shared(FakeWorkspace::new()), dest.clone());

        let summary = apply_migration(
            &api,
            stream::iter(vec![Ok(orders())]),
            &IdentityNaming,
            false,
        )
        .await
        .unwrap();

        assert_eq!(
            dest.executed(),
            vec!["CREATE TABLE IF NOT EXISTS main.sales.orders (id INT) LOCATION 's3://bucket/orders'"]
        );
        assert_eq!(summary.tables, vec![QualifiedName::new("main", "sales", "orders")]);
    }

    #[tokio::test]
    async fn test_dry_run_never_executes() {
        let (logs, _guard) = capture_logs();
        let dest = shared(FakeWorkspace::new());
        let api = Api::new(shared(FakeWorkspace::new()), dest.clone());

        let summary = apply_migration(
            &api,
            stream::iter(vec![Ok(orders())]),
            &IdentityNaming,
            true,
        )
        .await
        .unwrap();

        assert!(dest.executed().is_empty());
        assert_eq!(summary.tables.len(), 1);
        assert!(logs.contains(
            "INFO",
            "CREATE TABLE IF NOT EXISTS main.sales.orders (id INT) LOCATION 's3://bucket/orders'"
        ));
        assert!(logs.contains("INFO", "Table main.sales.orders not created (dry run)"));
    }

    #[tokio::test]
    async fn test_applying_twice_is_idempotent() {
        let dest = shared(FakeWorkspace::new());
        let api = Api::new(shared(FakeWorkspace::new()), dest.clone());

        for _ in 0..2 {
            apply_migration(
                &api,
                stream::iter(vec![Ok(orders())]),
                &IdentityNaming,
                false,
            )
            .await
            .unwrap();
        }

        assert_eq!(dest.executed().len(), 2);
        assert_eq!(dest.created().len(), 1);
    }

    #[tokio::test]
    async fn test_existing_destination_table_is_not_an_error() {
        let dest = shared(FakeWorkspace::new().with_existing("main.sales.orders"));
        let api = Api::new(shared(FakeWorkspace::new()), dest.clone());

        let result = apply_migration(
            &api,
            stream::iter(vec![Ok(orders())]),
            &IdentityNaming,
            false,
        )
        .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_destination_failure_stops_remaining_tables() {
        let dest = shared(FakeWorkspace::new());
        dest.fail_next([statement_failed("PERMISSION_DENIED")]);
        let api = Api::new(shared(FakeWorkspace::new()), dest.clone());

        let err = apply_migration(
            &api,
            stream::iter(vec![Ok(orders()), Ok(returns())]),
            &IdentityNaming,
            false,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MigrateError::DestinationWrite { ref table, .. } if table == "main.sales.orders"));
        assert_eq!(dest.executed().len(), 1, "no retry and no further tables");
    }

    #[tokio::test]
    async fn test_discovery_error_propagates() {
        let dest = shared(FakeWorkspace::new());
        let api = Api::new(shared(FakeWorkspace::new()), dest.clone());

        let err = apply_migration(
            &api,
            stream::iter(vec![
                Ok(orders()),
                Err(MigrateError::Config("boom".into())),
                Ok(returns()),
            ]),
            &IdentityNaming,
            false,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MigrateError::Config(_)));
        assert_eq!(dest.created().len(), 1, "tables created before the failure stay");
    }

    #[tokio::test]
    async fn test_renamed_target() {
        let dest = shared(FakeWorkspace::new());
        let api = Api::new(shared(FakeWorkspace::new()), dest.clone());
        let naming = MappedNaming::new(
            BTreeMap::from([("main".to_string(), "main_copy".to_string())]),
            BTreeMap::new(),
        );

        apply_migration(&api, stream::iter(vec![Ok(orders())]), &naming, false)
            .await
            .unwrap();

        assert_eq!(
            dest.created().into_iter().collect::<Vec<_>>(),
            vec!["main_copy.sales.orders"]
        );
    }
}
