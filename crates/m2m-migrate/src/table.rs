//! Table identity types shared by discovery, rewrite and apply.

use crate::workspace::TableType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Three-part `catalog.schema.table` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedName {
    pub catalog: String,
    pub schema: String,
    pub table: String,
}

impl QualifiedName {
    pub fn new(
        catalog: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.catalog, self.schema, self.table)
    }
}

/// Snapshot of one source table and its creation statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub catalog_name: String,
    pub schema_name: String,
    pub table_name: String,
    pub table_type: TableType,
    pub create_statement: String,
}

impl TableInfo {
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(&self.catalog_name, &self.schema_name, &self.table_name)
    }
}
