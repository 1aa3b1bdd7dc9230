// Result artifact storage
//
// Each completed query leaves one JSON document at `{base}/{id}/result`.

use std::path::PathBuf;

use uuid::Uuid;

use crate::api::middleware::AppError;
use crate::models::QueryResponse;

const RESULT_FILE_NAME: &str = "result";

#[derive(Debug, Clone)]
pub struct ResultStore {
    base_path: PathBuf,
}

impl ResultStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Artifact path for an identifier; only UUIDs are accepted so an
    /// identifier can never escape the base directory
    pub fn result_path(&self, query_id: &str) -> Result<PathBuf, AppError> {
        let id = Uuid::parse_str(query_id)
            .map_err(|_| AppError::NotFound(format!("Query {} not found", query_id)))?;
        Ok(self
            .base_path
            .join(id.hyphenated().to_string())
            .join(RESULT_FILE_NAME))
    }

    /// Persist the artifact; readers never observe a partially written file
    pub async fn write(&self, query_id: &str, response: &QueryResponse) -> Result<PathBuf, AppError> {
        let path = self.result_path(query_id)?;
        let directory = path
            .parent()
            .ok_or_else(|| AppError::Internal(format!("Invalid result path {}", path.display())))?;
        tokio::fs::create_dir_all(directory).await?;

        let body = serde_json::to_vec(response)?;
        let staging = directory.join(format!("{}.tmp", RESULT_FILE_NAME));
        tokio::fs::write(&staging, body).await?;
        tokio::fs::rename(&staging, &path).await?;

        tracing::debug!("Wrote result for query {} to {}", query_id, path.display());
        Ok(path)
    }

    /// Raw artifact bytes, or `None` when nothing has been written for the id
    pub async fn read(&self, query_id: &str) -> Result<Option<Vec<u8>>, AppError> {
        let path = match self.result_path(query_id) {
            Ok(path) => path,
            Err(AppError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists(&self, query_id: &str) -> bool {
        match self.result_path(query_id) {
            Ok(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }
}
