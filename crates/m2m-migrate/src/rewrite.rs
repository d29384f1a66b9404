//! Destination naming and creation statement rewriting.

use crate::config::MigrationConfig;
use crate::table::{QualifiedName, TableInfo};
use std::collections::BTreeMap;

const CREATE_TABLE: &str = "CREATE TABLE";
const CREATE_TABLE_IF_NOT_EXISTS: &str = "CREATE TABLE IF NOT EXISTS";

/// Decides the destination catalog and schema of a migrated table.
pub trait NamingPolicy: Send + Sync {
    fn catalog_name(&self, existing: &str) -> String {
        existing.to_string()
    }

    fn schema_name(&self, existing: &str) -> String {
        existing.to_string()
    }
}

/// Keep every name as it is on the source.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityNaming;

impl NamingPolicy for IdentityNaming {}

/// Rename through explicit lookup tables. Names without an entry are kept.
#[derive(Debug, Clone, Default)]
pub struct MappedNaming {
    catalogs: BTreeMap<String, String>,
    schemas: BTreeMap<String, String>,
}

impl MappedNaming {
    pub fn new(catalogs: BTreeMap<String, String>, schemas: BTreeMap<String, String>) -> Self {
        Self { catalogs, schemas }
    }
}

impl From<&MigrationConfig> for MappedNaming {
    fn from(config: &MigrationConfig) -> Self {
        Self::new(config.catalog_map.clone(), config.schema_map.clone())
    }
}

impl NamingPolicy for MappedNaming {
    fn catalog_name(&self, existing: &str) -> String {
        self.catalogs
            .get(existing)
            .cloned()
            .unwrap_or_else(|| existing.to_string())
    }

    fn schema_name(&self, existing: &str) -> String {
        self.schemas
            .get(existing)
            .cloned()
            .unwrap_or_else(|| existing.to_string())
    }
}

/// A creation statement ready to run on the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenTable {
    pub source: QualifiedName,
    pub target: QualifiedName,
    pub statement: String,
}

/// Compute the destination name of `table` and rewrite its statement.
pub fn rewrite(table: &TableInfo, naming: &dyn NamingPolicy) -> RewrittenTable {
    let source = table.qualified_name();
    let target = QualifiedName::new(
        naming.catalog_name(&table.catalog_name),
        naming.schema_name(&table.schema_name),
        &table.table_name,
    );

    let statement = make_idempotent(&table.create_statement);
    let statement = replace_qualified_name(&statement, &source, &target);

    RewrittenTable {
        source,
        target,
        statement,
    }
}

/// Turn the first `CREATE TABLE` into `CREATE TABLE IF NOT EXISTS`.
///
/// This is a plain substring match, not a SQL parse. Statements that already
/// carry `IF NOT EXISTS` right after the keyword are returned unchanged.
pub fn make_idempotent(statement: &str) -> String {
    match statement.find(CREATE_TABLE) {
        Some(pos) if statement[pos..].starts_with(CREATE_TABLE_IF_NOT_EXISTS) => {
            statement.to_string()
        }
        Some(_) => statement.replacen(CREATE_TABLE, CREATE_TABLE_IF_NOT_EXISTS, 1),
        None => statement.to_string(),
    }
}

/// Substitute every literal occurrence of `from` with `to`.
///
/// Not SQL aware: the dotted name is also replaced inside comments, string
/// literals or table properties that happen to contain it.
pub fn replace_qualified_name(statement: &str, from: &QualifiedName, to: &QualifiedName) -> String {
    if from == to {
        return statement.to_string();
    }
    statement.replace(&from.to_string(), &to.to_string())
}
