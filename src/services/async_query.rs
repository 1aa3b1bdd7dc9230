// Async query orchestration
//
// Submission parses, analyzes, routes and rewrites a statement, then hands it
// to a spawned task under a fresh identifier. Retrieval waits on that task
// and serves the persisted artifact.

use std::sync::Arc;

use uuid::Uuid;

use crate::api::middleware::AppError;
use crate::models::{QueryPhase, QueryStatusResponse, SubmittedQuery};
use crate::services::analyzer::Analyzer;
use crate::services::database::QueryExecutor;
use crate::services::instance_resolver::InstanceResolver;
use crate::services::query_registry::{OutstandingQuery, QueryRegistry};
use crate::services::query_task::QueryTask;
use crate::services::result_store::ResultStore;
use crate::services::rewriter::TableNameRewriter;
use crate::storage::MetadataStore;
use crate::validation::SqlValidator;

#[derive(Clone)]
pub struct AsyncQueryService {
    metadata: Arc<dyn MetadataStore>,
    executor: Arc<dyn QueryExecutor>,
    registry: QueryRegistry,
    results: ResultStore,
}

impl AsyncQueryService {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        executor: Arc<dyn QueryExecutor>,
        registry: QueryRegistry,
        results: ResultStore,
    ) -> Self {
        Self {
            metadata,
            executor,
            registry,
            results,
        }
    }

    pub fn registry(&self) -> &QueryRegistry {
        &self.registry
    }

    /// Validate and route `sql`, then start executing it in the background.
    /// Syntax and routing errors are returned here and never reach the registry.
    pub async fn create_query(&self, sql: &str) -> Result<SubmittedQuery, AppError> {
        let statement = SqlValidator::parse_select(sql)?;
        let analysis = Analyzer::analyze_query(&statement);

        let database_uri =
            InstanceResolver::get_database_uri(self.metadata.as_ref(), &analysis.tables).await?;
        let instance = InstanceResolver::find_instance_identifying_table(&analysis.tables)?
            .first()
            .unwrap_or_default()
            .to_string();

        let rewritten_sql = TableNameRewriter::process(&statement).to_string();
        let query_id = Uuid::new_v4().to_string();

        let task = QueryTask {
            query_id: query_id.clone(),
            database_uri: database_uri.clone(),
            instance,
            analysis,
            sql: rewritten_sql.clone(),
            metadata: self.metadata.clone(),
            executor: self.executor.clone(),
            results: self.results.clone(),
        };
        self.registry
            .insert(query_id.clone(), OutstandingQuery::spawn(task.run()))
            .await;

        tracing::info!("Submitted query {}: {}", query_id, rewritten_sql);

        Ok(SubmittedQuery {
            query_id,
            database_uri,
            rewritten_sql,
        })
    }

    /// Wait for the query to finish if it is outstanding, then return its artifact
    pub async fn get_query(&self, query_id: &str) -> Result<Vec<u8>, AppError> {
        let query_id = Self::canonical_id(query_id)?;
        let query_id = query_id.as_str();
        if let Some(query) = self.registry.get(query_id).await {
            query.wait().await.map_err(|e| match e {
                AppError::Execution(_) => e,
                other => AppError::Execution(other.to_string()),
            })?;
        }

        self.results
            .read(query_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Query {} not found", query_id)))
    }

    /// Phase of a query without waiting for it
    pub async fn get_query_status(&self, query_id: &str) -> Result<QueryStatusResponse, AppError> {
        let query_id = Self::canonical_id(query_id)?;
        let query_id = query_id.as_str();
        if let Some(query) = self.registry.get(query_id).await {
            return Ok(QueryStatusResponse {
                id: query_id.to_string(),
                phase: query.phase(),
                submitted_at: Some(query.submitted_at),
            });
        }

        if self.results.exists(query_id).await {
            return Ok(QueryStatusResponse {
                id: query_id.to_string(),
                phase: QueryPhase::Completed,
                submitted_at: None,
            });
        }

        Err(AppError::NotFound(format!("Query {} not found", query_id)))
    }

    /// Identifiers are registered in hyphenated lowercase form; any other
    /// spelling of the same UUID refers to the same query
    fn canonical_id(query_id: &str) -> Result<String, AppError> {
        Uuid::parse_str(query_id)
            .map(|id| id.hyphenated().to_string())
            .map_err(|_| AppError::NotFound(format!("Query {} not found", query_id)))
    }
}
