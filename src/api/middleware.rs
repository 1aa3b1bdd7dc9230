use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Location of a syntax error in the submitted statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: u64,
    pub column: u64,
}

impl SourcePosition {
    /// Extract the `Line: N, Column: M` suffix that the SQL parser appends to its messages
    pub fn from_parser_message(message: &str) -> Option<Self> {
        let line = Self::number_after(message, "Line: ")?;
        let column = Self::number_after(message, "Column: ")?;
        Some(Self { line, column })
    }

    fn number_after(message: &str, marker: &str) -> Option<u64> {
        let start = message.rfind(marker)? + marker.len();
        let digits: String = message[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }
}

/// Application error types
#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("{message}")]
    Syntax {
        message: String,
        position: Option<SourcePosition>,
    },

    #[error("Only Select Queries allowed: {0}")]
    NotSelectStatement(String),

    #[error("{0}")]
    Semantic(String),

    #[error("Query execution failed: {0}")]
    Execution(String),

    #[error("Catalog error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<SourcePosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            position: None,
            details: None,
        }
    }

    pub fn with_position(mut self, position: Option<SourcePosition>) -> Self {
        self.position = position;
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Syntax { .. } | AppError::NotSelectStatement(_) | AppError::Semantic(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Connection(_) => StatusCode::BAD_GATEWAY,
            AppError::Execution(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Syntax { .. } => "SYNTAX_ERROR",
            AppError::NotSelectStatement(_) => "NOT_SELECT_STATEMENT",
            AppError::Semantic(_) => "SEMANTIC_ERROR",
            AppError::Execution(_) => "EXECUTION_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Connection(_) => "CONNECTION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_detail = match &self {
            AppError::Syntax { message, position } => ErrorDetail::new(self.code(), "SQL parsing error")
                .with_position(*position)
                .with_details(message.clone()),
            AppError::NotSelectStatement(found) => {
                ErrorDetail::new(self.code(), "Only Select Queries allowed").with_details(found.clone())
            }
            AppError::Execution(msg) => {
                tracing::error!("Query execution error: {}", msg);
                ErrorDetail::new(self.code(), self.to_string())
            }
            AppError::Database(msg) | AppError::Internal(msg) => {
                tracing::error!("{}: {}", self.code(), msg);
                ErrorDetail::new(self.code(), self.to_string())
            }
            _ => ErrorDetail::new(self.code(), self.to_string()),
        };

        let body = Json(ErrorResponse {
            error: error_detail,
        });

        (status, body).into_response()
    }
}

/// Convert anyhow::Error to AppError
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Convert rusqlite::Error to AppError
impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<sqlparser::parser::ParserError> for AppError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        let message = err.to_string();
        AppError::Syntax {
            position: SourcePosition::from_parser_message(&message),
            message,
        }
    }
}

/// Backend driver failures; transport problems are reported as connection errors
impl From<mysql_async::Error> for AppError {
    fn from(err: mysql_async::Error) -> Self {
        match err {
            mysql_async::Error::Io(_) | mysql_async::Error::Url(_) => AppError::Connection(err.to_string()),
            other => AppError::Execution(other.to_string()),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("I/O error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("Serialization error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_format() {
        let error = AppError::NotFound("Query abc not found".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_submission_errors_are_bad_requests() {
        let syntax = AppError::Syntax {
            message: "unexpected token".to_string(),
            position: None,
        };
        assert_eq!(syntax.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::NotSelectStatement("INSERT".to_string()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Semantic("Unable to determine a table".to_string()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_execution_error_is_server_error() {
        let response = AppError::Execution("backend gone".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_detail_creation() {
        let detail = ErrorDetail::new("TEST_CODE", "Test message");
        assert_eq!(detail.code, "TEST_CODE");
        assert_eq!(detail.message, "Test message");
        assert!(detail.details.is_none());
        assert!(detail.position.is_none());
    }

    #[test]
    fn test_position_from_parser_message() {
        let position =
            SourcePosition::from_parser_message("Expected: an expression, found: FROM at Line: 1, Column: 8");
        assert_eq!(position, Some(SourcePosition { line: 1, column: 8 }));
        assert_eq!(SourcePosition::from_parser_message("no position here"), None);
    }
}
