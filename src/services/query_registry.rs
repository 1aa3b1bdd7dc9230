// Outstanding query registry
//
// Maps query identifiers to the shared completion handle of their task.
// Entries are inserted once at submission and never removed.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::RwLock;

use crate::api::middleware::AppError;
use crate::models::QueryPhase;

pub type TaskOutcome = Result<(), AppError>;

/// Handle to a spawned query task, cloneable by every poller
#[derive(Clone)]
pub struct OutstandingQuery {
    pub submitted_at: DateTime<Utc>,
    completion: Shared<BoxFuture<'static, TaskOutcome>>,
}

impl OutstandingQuery {
    /// Spawn `task` on the runtime; a panic inside it becomes an execution error
    pub fn spawn<F>(task: F) -> Self
    where
        F: Future<Output = TaskOutcome> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        Self::from_completion(async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(AppError::Execution(format!("Query task failed: {}", e))),
            }
        })
    }

    fn from_completion<F>(completion: F) -> Self
    where
        F: Future<Output = TaskOutcome> + Send + 'static,
    {
        Self {
            submitted_at: Utc::now(),
            completion: completion.boxed().shared(),
        }
    }

    /// Wait until the task is terminal and observe its outcome
    pub async fn wait(&self) -> TaskOutcome {
        self.completion.clone().await
    }

    /// Current phase, without waiting
    pub fn phase(&self) -> QueryPhase {
        match self.completion.clone().now_or_never() {
            None => QueryPhase::Executing,
            Some(Ok(())) => QueryPhase::Completed,
            Some(Err(_)) => QueryPhase::Error,
        }
    }
}

impl std::fmt::Debug for OutstandingQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutstandingQuery")
            .field("submitted_at", &self.submitted_at)
            .field("phase", &self.phase())
            .finish()
    }
}

#[derive(Clone, Default)]
pub struct QueryRegistry {
    queries: Arc<RwLock<HashMap<String, OutstandingQuery>>>,
}

impl QueryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, query_id: String, query: OutstandingQuery) {
        let mut queries = self.queries.write().await;
        queries.insert(query_id, query);
    }

    pub async fn get(&self, query_id: &str) -> Option<OutstandingQuery> {
        let queries = self.queries.read().await;
        queries.get(query_id).cloned()
    }

    pub async fn len(&self) -> usize {
        let queries = self.queries.read().await;
        queries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
