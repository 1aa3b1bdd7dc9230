// Backend execution trait
use crate::api::middleware::AppError;
use crate::models::BackendColumn;
use serde_json::Value;
use url::Url;

/// Raw outcome of running one statement on a backend
#[derive(Debug, Clone, Default)]
pub struct BackendResult {
    /// Column descriptors in ordinal order
    pub columns: Vec<BackendColumn>,
    pub rows: Vec<Vec<Value>>,
}

/// Runs a rewritten statement against the backend a URI points to
#[async_trait::async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, database_uri: &Url, sql: &str) -> Result<BackendResult, AppError>;
}
