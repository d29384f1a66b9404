//! Unity Catalog and SQL Statement Execution API types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A catalog as returned by the catalogs listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogInfo {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// A schema inside a catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub name: String,
    pub catalog_name: String,
}

/// A table entry from the tables listing. Carries no DDL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSummary {
    pub name: String,
    pub catalog_name: String,
    pub schema_name: String,

    #[serde(default)]
    pub table_type: TableType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<String>,
}

/// Unity Catalog table type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableType {
    Managed,
    External,
    View,
    MaterializedView,
    StreamingTable,
    ManagedShallowClone,
    ExternalShallowClone,
    Foreign,
    MetricView,
    /// A type this tool does not know about yet.
    #[default]
    #[serde(other)]
    Unknown,
}

impl TableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableType::Managed => "MANAGED",
            TableType::External => "EXTERNAL",
            TableType::View => "VIEW",
            TableType::MaterializedView => "MATERIALIZED_VIEW",
            TableType::StreamingTable => "STREAMING_TABLE",
            TableType::ManagedShallowClone => "MANAGED_SHALLOW_CLONE",
            TableType::ExternalShallowClone => "EXTERNAL_SHALLOW_CLONE",
            TableType::Foreign => "FOREIGN",
            TableType::MetricView => "METRIC_VIEW",
            TableType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a submitted statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Closed,
    /// A state this client does not know. Treated as terminal.
    #[serde(other)]
    Unknown,
}

impl StatementState {
    /// Whether the statement will not change state anymore.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StatementState::Pending | StatementState::Running)
    }
}

impl fmt::Display for StatementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatementState::Pending => "PENDING",
            StatementState::Running => "RUNNING",
            StatementState::Succeeded => "SUCCEEDED",
            StatementState::Failed => "FAILED",
            StatementState::Canceled => "CANCELED",
            StatementState::Closed => "CLOSED",
            StatementState::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// A statement that finished successfully, with its inline result rows.
#[derive(Debug, Clone, Default)]
pub struct StatementResult {
    pub statement_id: String,
    pub rows: Vec<Vec<Option<String>>>,
}

impl StatementResult {
    /// First column of the first row, if any.
    pub fn first_value(&self) -> Option<&str> {
        self.rows.first()?.first()?.as_deref()
    }
}

// Wire types below are private to the client.

#[derive(Debug, Deserialize)]
pub(crate) struct CatalogsPage {
    #[serde(default)]
    pub catalogs: Vec<CatalogInfo>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SchemasPage {
    #[serde(default)]
    pub schemas: Vec<SchemaInfo>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TablesPage {
    #[serde(default)]
    pub tables: Vec<TableSummary>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExecuteStatementRequest<'a> {
    pub statement: &'a str,
    pub warehouse_id: &'a str,
    pub wait_timeout: &'a str,
    pub on_wait_timeout: &'a str,
    pub disposition: &'a str,
    pub format: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatementResponse {
    pub statement_id: String,
    pub status: StatementStatus,
    #[serde(default)]
    pub result: Option<ResultData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatementStatus {
    pub state: StatementState,
    #[serde(default)]
    pub error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServiceError {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error_code, &self.message) {
            (Some(code), Some(msg)) => write!(f, "{}: {}", code, msg),
            (Some(code), None) => f.write_str(code),
            (None, Some(msg)) => f.write_str(msg),
            (None, None) => f.write_str("no error details"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResultData {
    #[serde(default)]
    pub data_array: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}
