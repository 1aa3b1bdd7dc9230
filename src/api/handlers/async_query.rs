use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    Json,
};

use crate::api::middleware::AppError;
use crate::models::QueryStatusResponse;
use crate::services::AsyncQueryService;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const QUERY_FIELD: &str = "query";

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub query_service: AsyncQueryService,
}

/// Submit a query; redirects (303) to the location its result will be served from
pub async fn create_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Redirect, AppError> {
    let sql = query_text(&headers, body);
    tracing::debug!("Received query: {}", sql);

    let submitted = state.query_service.create_query(&sql).await?;
    tracing::info!(
        "Query {} routed to {}",
        submitted.query_id,
        crate::services::ConnectionPoolManager::mask_credentials(submitted.database_uri.as_str())
    );

    Ok(Redirect::to(&submitted.result_location()))
}

/// Result artifact of a query, waiting for the query to finish first
pub async fn get_query_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let body = state.query_service.get_query(&id).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

pub async fn get_query_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QueryStatusResponse>, AppError> {
    Ok(Json(state.query_service.get_query_status(&id).await?))
}

/// Statement text of a submission body: raw SQL, or a form with a `query` field
fn query_text(headers: &HeaderMap, body: String) -> String {
    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with(FORM_CONTENT_TYPE))
        .unwrap_or(false);

    if is_form && body.starts_with(&format!("{}=", QUERY_FIELD)) {
        if let Some((_, sql)) = url::form_urlencoded::parse(body.as_bytes()).find(|(key, _)| key == QUERY_FIELD) {
            return sql.into_owned();
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn form_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        headers
    }

    #[test]
    fn test_raw_body_is_the_query() {
        let sql = "SELECT a FROM i.s.t WHERE b = 'query=x'";
        assert_eq!(query_text(&HeaderMap::new(), sql.to_string()), sql);
        assert_eq!(query_text(&form_headers(), sql.to_string()), sql);
    }

    #[test]
    fn test_form_field_is_decoded() {
        assert_eq!(
            query_text(&form_headers(), "query=SELECT+a+FROM+i.s.t%3B".to_string()),
            "SELECT a FROM i.s.t;"
        );
    }

    #[test]
    fn test_form_prefix_without_form_content_type_is_kept() {
        assert_eq!(
            query_text(&HeaderMap::new(), "query=SELECT+1".to_string()),
            "query=SELECT+1"
        );
    }
}
