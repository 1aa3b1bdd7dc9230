use rusqlite::{Connection, OptionalExtension, Result as SqliteResult};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::api::middleware::AppError;
use crate::models::{Column, Database, NewColumn, ParsedTable, Schema, Table};
use crate::storage::{MetadataStore, TableColumns};

/// SQLite storage for the catalog of database instances, schemas, tables and columns
/// Uses tokio::Mutex for async-friendly locking
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    pub async fn new<P: AsRef<Path>>(db_path: P) -> SqliteResult<Self> {
        // Handle SQLite URL format (sqlite:./path or sqlite://path)
        let path_str = db_path.as_ref().to_string_lossy();
        let clean_path: &str = if path_str.starts_with("sqlite:") {
            let mut cleaned = path_str.trim_start_matches("sqlite:");
            cleaned = cleaned.trim_start_matches("//");
            cleaned
        } else {
            path_str.as_ref()
        };

        let conn = Connection::open(clean_path)?;
        let storage = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// In-memory catalog, mostly useful for tests and local experiments
    pub async fn in_memory() -> SqliteResult<Self> {
        Self::new(":memory:").await
    }

    /// Initialize catalog schema
    async fn init_schema(&self) -> SqliteResult<()> {
        let conn = self.conn.lock().await;

        conn.execute("PRAGMA foreign_keys = ON", [])?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS databases (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL,
                host TEXT NOT NULL,
                port INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS schemas (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                database_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                is_default INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (database_id) REFERENCES databases(id) ON DELETE CASCADE,
                UNIQUE(database_id, name)
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS tables (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                schema_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                FOREIGN KEY (schema_id) REFERENCES schemas(id) ON DELETE CASCADE,
                UNIQUE(schema_id, name)
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS columns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                table_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                datatype TEXT NOT NULL,
                description TEXT,
                ucd TEXT,
                unit TEXT,
                ordinal INTEGER NOT NULL,
                FOREIGN KEY (table_id) REFERENCES tables(id) ON DELETE CASCADE,
                UNIQUE(table_id, name)
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_schemas_database_default ON schemas(database_id, is_default)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_columns_table_ordinal ON columns(table_id, ordinal)",
            [],
        )?;

        Ok(())
    }

    /// Register a database instance
    pub async fn create_database(&self, name: &str, host: &str, port: u16) -> SqliteResult<Database> {
        let db_conn = self.conn.lock().await;
        db_conn.execute(
            "INSERT INTO databases (name, host, port) VALUES (?1, ?2, ?3)",
            rusqlite::params![name, host, port],
        )?;
        Ok(Database {
            id: db_conn.last_insert_rowid(),
            name: name.to_string(),
            host: host.to_string(),
            port,
        })
    }

    /// Register a schema; at most one schema per database should be the default
    pub async fn create_schema(
        &self,
        database_id: i64,
        name: &str,
        is_default: bool,
    ) -> SqliteResult<Schema> {
        let db_conn = self.conn.lock().await;
        db_conn.execute(
            "INSERT INTO schemas (database_id, name, is_default) VALUES (?1, ?2, ?3)",
            rusqlite::params![database_id, name, is_default],
        )?;
        Ok(Schema {
            id: db_conn.last_insert_rowid(),
            database_id,
            name: name.to_string(),
            is_default,
        })
    }

    pub async fn create_table(
        &self,
        schema_id: i64,
        name: &str,
        description: Option<&str>,
    ) -> SqliteResult<Table> {
        let db_conn = self.conn.lock().await;
        db_conn.execute(
            "INSERT INTO tables (schema_id, name, description) VALUES (?1, ?2, ?3)",
            rusqlite::params![schema_id, name, description],
        )?;
        Ok(Table {
            id: db_conn.last_insert_rowid(),
            schema_id,
            name: name.to_string(),
            description: description.map(str::to_string),
        })
    }

    /// Register columns of a table, in the given order
    pub async fn create_columns(&self, table: &Table, columns: &[NewColumn]) -> SqliteResult<Vec<Column>> {
        let mut db_conn = self.conn.lock().await;
        let tx = db_conn.transaction()?;
        let mut created = Vec::with_capacity(columns.len());
        for (index, column) in columns.iter().enumerate() {
            let ordinal = index as i64 + 1;
            tx.execute(
                r#"
                INSERT INTO columns (table_id, name, datatype, description, ucd, unit, ordinal)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                rusqlite::params![
                    table.id,
                    column.name,
                    column.datatype,
                    column.description,
                    column.ucd,
                    column.unit,
                    ordinal,
                ],
            )?;
            created.push(Column {
                id: tx.last_insert_rowid(),
                table_id: table.id,
                name: column.name.clone(),
                datatype: column.datatype.clone(),
                description: column.description.clone(),
                ucd: column.ucd.clone(),
                unit: column.unit.clone(),
                table_name: table.name.clone(),
                ordinal,
            });
        }
        tx.commit()?;
        Ok(created)
    }

    fn database_by_name(conn: &Connection, name: &str) -> SqliteResult<Option<Database>> {
        conn.query_row(
            "SELECT id, name, host, port FROM databases WHERE name = ?1",
            rusqlite::params![name],
            |row| {
                Ok(Database {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    host: row.get(2)?,
                    port: row.get(3)?,
                })
            },
        )
        .optional()
    }

    fn default_schema(conn: &Connection, database_id: i64) -> SqliteResult<Option<Schema>> {
        conn.query_row(
            "SELECT id, database_id, name, is_default FROM schemas WHERE database_id = ?1 AND is_default = 1 ORDER BY id LIMIT 1",
            rusqlite::params![database_id],
            Self::map_schema,
        )
        .optional()
    }

    fn schema_by_name(conn: &Connection, database_id: i64, name: &str) -> SqliteResult<Option<Schema>> {
        conn.query_row(
            "SELECT id, database_id, name, is_default FROM schemas WHERE database_id = ?1 AND name = ?2",
            rusqlite::params![database_id, name],
            Self::map_schema,
        )
        .optional()
    }

    fn map_schema(row: &rusqlite::Row<'_>) -> SqliteResult<Schema> {
        Ok(Schema {
            id: row.get(0)?,
            database_id: row.get(1)?,
            name: row.get(2)?,
            is_default: row.get(3)?,
        })
    }

    fn table_by_name(conn: &Connection, schema_id: i64, name: &str) -> SqliteResult<Option<Table>> {
        conn.query_row(
            "SELECT id, schema_id, name, description FROM tables WHERE schema_id = ?1 AND name = ?2",
            rusqlite::params![schema_id, name],
            |row| {
                Ok(Table {
                    id: row.get(0)?,
                    schema_id: row.get(1)?,
                    name: row.get(2)?,
                    description: row.get(3)?,
                })
            },
        )
        .optional()
    }

    fn columns_of(conn: &Connection, table: &Table) -> SqliteResult<Vec<Column>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, table_id, name, datatype, description, ucd, unit, ordinal
            FROM columns
            WHERE table_id = ?1
            ORDER BY ordinal
            "#,
        )?;

        let rows = stmt.query_map(rusqlite::params![table.id], |row| {
            Ok(Column {
                id: row.get(0)?,
                table_id: row.get(1)?,
                name: row.get(2)?,
                datatype: row.get(3)?,
                description: row.get(4)?,
                ucd: row.get(5)?,
                unit: row.get(6)?,
                table_name: table.name.clone(),
                ordinal: row.get(7)?,
            })
        })?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(row?);
        }
        Ok(columns)
    }

    /// Resolve one parsed table to its catalog entry
    fn resolve_table(conn: &Connection, instance: &str, table: &ParsedTable) -> SqliteResult<Option<Table>> {
        let parts = table.qualified_name.parts();
        let (database_name, schema_name, table_name) = match parts {
            [database, schema, name] => (database.as_str(), Some(schema.as_str()), name.as_str()),
            [schema, name] => (instance, Some(schema.as_str()), name.as_str()),
            [name] => (instance, None, name.as_str()),
            _ => return Ok(None),
        };

        let Some(database) = Self::database_by_name(conn, database_name)? else {
            return Ok(None);
        };
        let schema = match schema_name {
            Some(name) => Self::schema_by_name(conn, database.id, name)?,
            None => Self::default_schema(conn, database.id)?,
        };
        match schema {
            Some(schema) => Self::table_by_name(conn, schema.id, table_name),
            None => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl MetadataStore for SqliteStorage {
    async fn find_database_by_name(&self, name: &str) -> Result<Option<Database>, AppError> {
        let db_conn = self.conn.lock().await;
        Ok(Self::database_by_name(&db_conn, name)?)
    }

    async fn find_default_schema_by_database_id(
        &self,
        database_id: i64,
    ) -> Result<Option<Schema>, AppError> {
        let db_conn = self.conn.lock().await;
        Ok(Self::default_schema(&db_conn, database_id)?)
    }

    async fn find_tables_and_columns(
        &self,
        instance: &str,
        tables: &[ParsedTable],
    ) -> Result<TableColumns, AppError> {
        let db_conn = self.conn.lock().await;
        let mut found = TableColumns::new();
        for parsed_table in tables {
            if let Some(table) = Self::resolve_table(&db_conn, instance, parsed_table)? {
                let columns = Self::columns_of(&db_conn, &table)?;
                tracing::debug!(
                    "Matched {} to catalog table {} ({} columns)",
                    parsed_table.qualified_name,
                    table.name,
                    columns.len()
                );
                found.insert(parsed_table.clone(), (table, columns));
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QualifiedName;
    use tempfile::tempdir;

    async fn seeded() -> SqliteStorage {
        let storage = SqliteStorage::in_memory().await.unwrap();
        let db = storage.create_database("lsst", "db.example.org", 3306).await.unwrap();
        let main = storage.create_schema(db.id, "dr1", true).await.unwrap();
        let other = storage.create_schema(db.id, "dr2", false).await.unwrap();
        let object = storage.create_table(main.id, "Object", Some("Objects")).await.unwrap();
        storage
            .create_columns(
                &object,
                &[
                    NewColumn::new("objectId", "long").with_description("Unique id"),
                    NewColumn::new("ra", "double").with_unit("deg").with_ucd("pos.eq.ra"),
                ],
            )
            .await
            .unwrap();
        let source = storage.create_table(other.id, "Source", None).await.unwrap();
        storage
            .create_columns(&source, &[NewColumn::new("sourceId", "long")])
            .await
            .unwrap();
        storage
    }

    fn parsed(parts: Vec<&str>, position: usize) -> ParsedTable {
        ParsedTable::new(QualifiedName::from(parts), None, position)
    }

    #[test]
    fn test_sqlite_storage_creation() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("catalog.db");
        let rt = tokio::runtime::Runtime::new().unwrap();
        let storage = rt.block_on(async { SqliteStorage::new(&db_path).await });
        assert!(storage.is_ok());
    }

    #[test]
    fn test_schema_initialization() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("catalog.db");
        let rt = tokio::runtime::Runtime::new().unwrap();
        let storage = rt.block_on(async { SqliteStorage::new(&db_path).await.unwrap() });

        let conn = rt.block_on(async { storage.conn.lock().await });
        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('databases', 'schemas', 'tables', 'columns')",
            )
            .unwrap();

        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(tables.len(), 4);
    }

    #[tokio::test]
    async fn test_find_database_and_default_schema() {
        let storage = seeded().await;

        let db = storage.find_database_by_name("lsst").await.unwrap().unwrap();
        assert_eq!(db.host, "db.example.org");
        assert_eq!(db.port, 3306);

        let schema = storage
            .find_default_schema_by_database_id(db.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(schema.name, "dr1");

        assert!(storage.find_database_by_name("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_database_without_default_schema() {
        let storage = seeded().await;
        let db = storage.create_database("bare", "h", 1).await.unwrap();
        storage.create_schema(db.id, "only", false).await.unwrap();
        assert!(storage
            .find_default_schema_by_database_id(db.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_find_tables_and_columns() {
        let storage = seeded().await;
        let three_part = parsed(vec!["lsst", "dr1", "Object"], 1);
        let two_part = parsed(vec!["dr2", "Source"], 2);
        let bare = parsed(vec!["Object"], 3);
        let unknown = parsed(vec!["lsst", "dr1", "Nope"], 4);

        let found = storage
            .find_tables_and_columns(
                "lsst",
                &[three_part.clone(), two_part.clone(), bare.clone(), unknown.clone()],
            )
            .await
            .unwrap();

        assert_eq!(found.len(), 3);
        let (table, columns) = &found[&three_part];
        assert_eq!(table.name, "Object");
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["objectId", "ra"]);
        assert_eq!(columns[1].unit.as_deref(), Some("deg"));
        assert_eq!(columns[1].table_name, "Object");

        assert_eq!(found[&two_part].0.name, "Source");
        assert_eq!(found[&bare].0.name, "Object");
        assert!(!found.contains_key(&unknown));
    }
}
