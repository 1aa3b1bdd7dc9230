use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::handlers::{async_query, AppState};
use crate::services::AsyncQueryService;

/// Create router with application state
pub fn create_router_with_state(query_service: AsyncQueryService) -> Router {
    let state = AppState { query_service };

    Router::new()
        .route("/health", get(health_check))
        .route("/async", post(async_query::create_query))
        .route("/async/{id}", get(async_query::get_query_status))
        .route("/async/{id}/results/result", get(async_query::get_query_result))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
