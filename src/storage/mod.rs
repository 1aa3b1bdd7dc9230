pub mod sqlite;

pub use sqlite::SqliteStorage;

use std::collections::HashMap;

use crate::api::middleware::AppError;
use crate::models::{Column, Database, ParsedTable, Schema, Table};

/// Catalog table and its ordered columns, keyed by the parsed table they match
pub type TableColumns = HashMap<ParsedTable, (Table, Vec<Column>)>;

/// Catalog (metaserv) lookups needed to route and describe a query
#[async_trait::async_trait]
pub trait MetadataStore: Send + Sync {
    async fn find_database_by_name(&self, name: &str) -> Result<Option<Database>, AppError>;

    async fn find_default_schema_by_database_id(
        &self,
        database_id: i64,
    ) -> Result<Option<Schema>, AppError>;

    /// Match each parsed table to a catalog table.
    ///
    /// Three-part names carry their own database and schema; shorter names are
    /// resolved within `instance`, using its default schema for bare table
    /// names. Tables with no catalog entry are left out of the result.
    async fn find_tables_and_columns(
        &self,
        instance: &str,
        tables: &[ParsedTable],
    ) -> Result<TableColumns, AppError>;
}
