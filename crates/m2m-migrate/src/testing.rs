//! In-memory workspace and log capture for unit tests.

use crate::error::{MigrateError, Result};
use crate::workspace::{
    CatalogInfo, SchemaInfo, StatementResult, TableSummary, TableType, Workspace,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::Write as FmtWrite;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// Workspace double that serves listings from memory and enforces
/// `CREATE TABLE` / `CREATE TABLE IF NOT EXISTS` semantics.
#[derive(Default)]
pub struct FakeWorkspace {
    schemas: BTreeMap<String, Vec<String>>,
    tables: BTreeMap<(String, String), Vec<TableSummary>>,
    create_statements: BTreeMap<String, String>,
    failures: Mutex<VecDeque<MigrateError>>,
    executed: Mutex<Vec<String>>,
    listed_catalogs: Mutex<Vec<String>>,
    created: Mutex<BTreeSet<String>>,
}

impl FakeWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table together with its `SHOW CREATE TABLE` output.
    pub fn with_table(
        mut self,
        catalog: &str,
        schema: &str,
        table: &str,
        table_type: TableType,
        create_statement: &str,
    ) -> Self {
        let schemas = self.schemas.entry(catalog.to_string()).or_default();
        if !schemas.iter().any(|s| s == schema) {
            schemas.push(schema.to_string());
        }
        self.tables
            .entry((catalog.to_string(), schema.to_string()))
            .or_default()
            .push(TableSummary {
                name: table.to_string(),
                catalog_name: catalog.to_string(),
                schema_name: schema.to_string(),
                table_type,
                storage_location: None,
            });
        self.create_statements.insert(
            format!("{}.{}.{}", catalog, schema, table),
            create_statement.to_string(),
        );
        self
    }

    /// Mark a table as already present on this workspace.
    pub fn with_existing(self, qualified_name: &str) -> Self {
        self.created
            .lock()
            .unwrap()
            .insert(qualified_name.to_string());
        self
    }

    /// Fail the next statement executions with these errors, in order.
    pub fn fail_next(&self, errors: impl IntoIterator<Item = MigrateError>) {
        self.failures.lock().unwrap().extend(errors);
    }

    /// Every statement submitted so far.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    /// Catalogs whose schemas were listed.
    pub fn listed_catalogs(&self) -> Vec<String> {
        self.listed_catalogs.lock().unwrap().clone()
    }

    pub fn created(&self) -> BTreeSet<String> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl Workspace for FakeWorkspace {
    fn host(&self) -> &str {
        "https://fake.cloud.databricks.com"
    }

    async fn list_catalogs(&self) -> Result<Vec<CatalogInfo>> {
        Ok(self
            .schemas
            .keys()
            .map(|name| CatalogInfo {
                name: name.clone(),
                catalog_type: None,
                comment: None,
            })
            .collect())
    }

    async fn list_schemas(&self, catalog: &str) -> Result<Vec<SchemaInfo>> {
        self.listed_catalogs.lock().unwrap().push(catalog.to_string());
        Ok(self
            .schemas
            .get(catalog)
            .map(|schemas| {
                schemas
                    .iter()
                    .map(|name| SchemaInfo {
                        name: name.clone(),
                        catalog_name: catalog.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_tables(&self, catalog: &str, schema: &str) -> Result<Vec<TableSummary>> {
        Ok(self
            .tables
            .get(&(catalog.to_string(), schema.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn execute_statement(&self, statement: &str) -> Result<StatementResult> {
        self.executed.lock().unwrap().push(statement.to_string());
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }

        if let Some(name) = statement.strip_prefix("SHOW CREATE TABLE ") {
            return match self.create_statements.get(name.trim()) {
                Some(ddl) => Ok(StatementResult {
                    statement_id: "show".to_string(),
                    rows: vec![vec![Some(ddl.clone())]],
                }),
                None => Err(statement_failed("TABLE_OR_VIEW_NOT_FOUND")),
            };
        }

        if let Some(rest) = statement.strip_prefix("CREATE TABLE ") {
            let (if_not_exists, rest) = match rest.strip_prefix("IF NOT EXISTS ") {
                Some(rest) => (true, rest),
                None => (false, rest),
            };
            let name: String = rest
                .chars()
                .take_while(|c| !c.is_whitespace() && *c != '(')
                .collect();
            let mut created = self.created.lock().unwrap();
            if created.contains(&name) && !if_not_exists {
                return Err(statement_failed("TABLE_ALREADY_EXISTS"));
            }
            created.insert(name);
            return Ok(StatementResult {
                statement_id: "create".to_string(),
                rows: Vec::new(),
            });
        }

        Err(statement_failed("UNSUPPORTED_STATEMENT"))
    }
}

pub fn statement_failed(message: &str) -> MigrateError {
    MigrateError::Statement {
        statement_id: "fake".to_string(),
        state: "FAILED".to_string(),
        message: message.to_string(),
    }
}

pub fn unavailable() -> MigrateError {
    MigrateError::Api {
        status: 503,
        message: "TEMPORARILY_UNAVAILABLE".to_string(),
    }
}

pub fn shared(workspace: FakeWorkspace) -> Arc<FakeWorkspace> {
    Arc::new(workspace)
}

/// Captured log lines, formatted as `LEVEL message`.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CapturedLogs {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, level: &str, needle: &str) -> bool {
        self.lines()
            .iter()
            .any(|line| line.starts_with(level) && line.contains(needle))
    }
}

struct CaptureLayer {
    logs: CapturedLogs,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let line = format!("{} {}", event.metadata().level(), visitor.message);
        self.logs.lines.lock().unwrap().push(line);
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        }
    }
}

/// Route this thread's log events into a buffer until the guard drops.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::registry().with(CaptureLayer { logs: logs.clone() });
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}
