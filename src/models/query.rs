use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Column description reported by the backend driver for one result column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendColumn {
    /// 1-based position in the result set
    pub ordinal: usize,
    pub name: String,
    /// Wire type code reported by the backend
    pub jdbc_type: i32,
    /// Originating table reported by the backend, empty for computed columns
    pub table_name: String,
}

/// Output column metadata, backend descriptor enriched with catalog data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub datatype: String,
    pub description: String,
    pub ucd: Option<String>,
    pub unit: Option<String>,
    pub table_name: String,
    pub jdbc_type: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub columns: Vec<ColumnMetadata>,
}

/// Result artifact persisted for every completed query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub metadata: ResponseMetadata,
    pub results: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryPhase {
    Executing,
    Completed,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryStatusResponse {
    pub id: String,
    pub phase: QueryPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Outcome of a successful submission
#[derive(Debug, Clone)]
pub struct SubmittedQuery {
    pub query_id: String,
    pub database_uri: url::Url,
    pub rewritten_sql: String,
}

impl SubmittedQuery {
    /// Location the client is redirected to for the result
    pub fn result_location(&self) -> String {
        format!("/async/{}/results/result", self.query_id)
    }
}
