// Query task
//
// Runs one rewritten statement on its backend, enriches the column metadata
// from the catalog and persists the result artifact.

use std::sync::Arc;
use std::time::Instant;

use url::Url;

use crate::api::middleware::AppError;
use crate::models::{QueryResponse, ResponseMetadata};
use crate::services::analyzer::Analysis;
use crate::services::connection_pool::ConnectionPoolManager;
use crate::services::database::QueryExecutor;
use crate::services::metadata_helper::QueryMetadataHelper;
use crate::services::result_store::ResultStore;
use crate::storage::MetadataStore;

pub struct QueryTask {
    pub query_id: String,
    pub database_uri: Url,
    /// Instance segment the query was routed by, used to resolve shorter table names
    pub instance: String,
    pub analysis: Analysis,
    pub sql: String,
    pub metadata: Arc<dyn MetadataStore>,
    pub executor: Arc<dyn QueryExecutor>,
    pub results: ResultStore,
}

impl QueryTask {
    pub async fn run(self) -> Result<(), AppError> {
        let start_time = Instant::now();
        match self.execute().await {
            Ok(row_count) => {
                tracing::info!(
                    "Query {} completed with {} rows in {}ms",
                    self.query_id,
                    row_count,
                    start_time.elapsed().as_millis()
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!("Query {} failed: {}", self.query_id, e);
                Err(e)
            }
        }
    }

    async fn execute(&self) -> Result<usize, AppError> {
        tracing::debug!(
            "Executing query {} on {}: {}",
            self.query_id,
            ConnectionPoolManager::mask_credentials(self.database_uri.as_str()),
            self.sql
        );
        let backend = self.executor.execute(&self.database_uri, &self.sql).await?;

        let tables_and_columns = self
            .metadata
            .find_tables_and_columns(&self.instance, &self.analysis.tables)
            .await?;
        let columns = QueryMetadataHelper::new(&self.analysis)
            .associate_metadata(&backend.columns, &tables_and_columns);

        let row_count = backend.rows.len();
        let response = QueryResponse {
            metadata: ResponseMetadata { columns },
            results: backend.rows,
        };
        self.results.write(&self.query_id, &response).await?;
        Ok(row_count)
    }
}
