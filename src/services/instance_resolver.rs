// Instance Resolver
//
// Maps the first fully instance-qualified table of a query to the backend
// connection URI it must run against.

use url::Url;

use crate::api::middleware::AppError;
use crate::models::{ParsedTable, QualifiedName};
use crate::storage::MetadataStore;

/// Wire scheme of every backend connection URI
pub const BACKEND_SCHEME: &str = "mysql";

/// Prefix marking an instance segment that is itself a connection authority
const LITERAL_URI_PREFIX: &str = "//";

pub struct InstanceResolver;

impl InstanceResolver {
    /// First table whose name has exactly three segments, `instance.schema.table`
    pub fn find_instance_identifying_table(
        tables: &[ParsedTable],
    ) -> Result<&QualifiedName, AppError> {
        tables
            .iter()
            .map(|table| &table.qualified_name)
            .find(|name| name.len() == 3)
            .ok_or_else(|| AppError::Semantic("Unable to determine a table".to_string()))
    }

    /// Connection URI of the backend targeted by `tables`.
    ///
    /// A `//host:port` instance segment yields a literal URI, but a catalog
    /// database of the same name always takes precedence over it.
    pub async fn get_database_uri(
        metadata: &dyn MetadataStore,
        tables: &[ParsedTable],
    ) -> Result<Url, AppError> {
        let instance_table = Self::find_instance_identifying_table(tables)?;
        let instance = instance_table.first().unwrap_or_default();

        let mut database_uri = None;
        if instance.starts_with(LITERAL_URI_PREFIX) {
            database_uri = Self::literal_uri(instance);
        }

        if let Some(database) = metadata.find_database_by_name(instance).await? {
            let default_schema = metadata
                .find_default_schema_by_database_id(database.id)
                .await?;
            let schema_name = default_schema.map(|schema| schema.name).unwrap_or_default();
            tracing::debug!(
                "Instance {} resolved through catalog to {}:{}",
                instance,
                database.host,
                database.port
            );
            database_uri = Some(Self::build_uri(&database.host, Some(database.port), &schema_name)?);
        }

        database_uri.ok_or_else(|| {
            AppError::Semantic(format!("No database instance identified: {}", instance_table))
        })
    }

    /// Parse `//host[:port][/path]`, keeping only host and port
    fn literal_uri(instance: &str) -> Option<Url> {
        let given = match Url::parse(&format!("{}:{}", BACKEND_SCHEME, instance)) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Instance {} is not a valid connection URI: {}", instance, e);
                return None;
            }
        };
        let host = given.host_str()?;
        Self::build_uri(host, given.port(), "").ok()
    }

    fn build_uri(host: &str, port: Option<u16>, path: &str) -> Result<Url, AppError> {
        let authority = match port {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let uri = if path.is_empty() {
            format!("{}://{}", BACKEND_SCHEME, authority)
        } else {
            format!("{}://{}/{}", BACKEND_SCHEME, authority, path)
        };
        Url::parse(&uri)
            .map_err(|e| AppError::Semantic(format!("Invalid database URI {}: {}", uri, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;

    fn tables(names: &[&str]) -> Vec<ParsedTable> {
        names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                ParsedTable::new(QualifiedName::from(name.split('.').collect::<Vec<_>>()), None, index + 1)
            })
            .collect()
    }

    #[test]
    fn test_find_instance_identifying_table() {
        let tables = tables(&["sch.a", "inst.sch.b", "c"]);
        let found = InstanceResolver::find_instance_identifying_table(&tables).unwrap();
        assert_eq!(found.to_string(), "inst.sch.b");
    }

    #[test]
    fn test_find_instance_identifying_table_fails_without_three_parts() {
        let tables = tables(&["sch.a", "c"]);
        match InstanceResolver::find_instance_identifying_table(&tables) {
            Err(AppError::Semantic(message)) => assert_eq!(message, "Unable to determine a table"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_literal_uri_without_catalog_entry() {
        let catalog = SqliteStorage::in_memory().await.unwrap();
        let mut tables = tables(&["x.sch.tbl"]);
        tables[0].qualified_name = QualifiedName::from(vec!["//host:1234", "sch", "tbl"]);

        let uri = InstanceResolver::get_database_uri(&catalog, &tables).await.unwrap();
        assert_eq!(uri.scheme(), "mysql");
        assert_eq!(uri.host_str(), Some("host"));
        assert_eq!(uri.port(), Some(1234));
        assert_eq!(uri.path(), "");
    }

    #[tokio::test]
    async fn test_catalog_entry_overrides_literal_uri() {
        let catalog = SqliteStorage::in_memory().await.unwrap();
        let db = catalog.create_database("//host:1234", "catalog-host", 4321).await.unwrap();
        catalog.create_schema(db.id, "dr1", true).await.unwrap();
        let tables = vec![ParsedTable::new(
            QualifiedName::from(vec!["//host:1234", "sch", "tbl"]),
            None,
            1,
        )];

        let uri = InstanceResolver::get_database_uri(&catalog, &tables).await.unwrap();
        assert_eq!(uri.host_str(), Some("catalog-host"));
        assert_eq!(uri.port(), Some(4321));
        assert_eq!(uri.path(), "/dr1");
    }

    #[tokio::test]
    async fn test_catalog_entry_without_default_schema() {
        let catalog = SqliteStorage::in_memory().await.unwrap();
        catalog.create_database("inst", "h", 3306).await.unwrap();

        let uri = InstanceResolver::get_database_uri(&catalog, &tables(&["inst.sch.tbl"]))
            .await
            .unwrap();
        assert_eq!(uri.as_str(), "mysql://h:3306");
    }

    #[tokio::test]
    async fn test_unknown_instance() {
        let catalog = SqliteStorage::in_memory().await.unwrap();
        match InstanceResolver::get_database_uri(&catalog, &tables(&["nope.sch.tbl"])).await {
            Err(AppError::Semantic(message)) => {
                assert_eq!(message, "No database instance identified: nope.sch.tbl")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
