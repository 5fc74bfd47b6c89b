//! HTTP error mapping
//!
//! Failures leave the API as `{"detail": "..."}`:
//! - blank request parameters: 400, detail is the bare message
//! - malformed requests (missing parameter or file field): 422
//! - everything else: 500, detail is `"<category>: <message>"`

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dataproc_rdbc::ErrorCategory;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable failure description
    pub detail: String,
}

/// Errors returned by request handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failure inside the data layer
    #[error(transparent)]
    Rdbc(#[from] dataproc_rdbc::Error),

    /// The request itself could not be decoded
    #[error("{detail}")]
    Request {
        /// Response status
        status: StatusCode,
        /// Response detail
        detail: String,
    },
}

impl ApiError {
    /// Malformed request (422)
    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self::Request {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: detail.into(),
        }
    }

    /// Statement the database rejected, when the failure came from one
    pub fn failed_statement(&self) -> Option<&str> {
        match self {
            Self::Rdbc(e) => e.sql_text(),
            Self::Request { .. } => None,
        }
    }

    /// Status code and body for this error
    pub fn to_response(&self) -> (StatusCode, Json<ErrorResponse>) {
        let (status, detail) = match self {
            Self::Rdbc(e) if e.category() == ErrorCategory::Validation => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            Self::Rdbc(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.detail()),
            Self::Request { status, detail } => (*status, detail.clone()),
        };
        (status, Json(ErrorResponse { detail }))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.to_response();
        if status.is_server_error() {
            error!("{}", body.detail);
            if let Some(sql) = self.failed_statement() {
                debug!("Failed statement: {}", sql);
            }
        }
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataproc_rdbc::Error;

    #[test]
    fn test_validation_is_bad_request_with_bare_message() {
        let (status, body) = ApiError::from(Error::validation("SQL user must not be empty.")).to_response();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.detail, "SQL user must not be empty.");
    }

    #[test]
    fn test_data_layer_failures_are_internal_errors() {
        let cases = [
            (Error::database("Invalid object name 'x'."), "Database error: Invalid object name 'x'."),
            (Error::sql("Incorrect syntax near 'FROM'."), "SQL error: Incorrect syntax near 'FROM'."),
            (Error::unexpected("boom"), "Unexpected error: boom"),
            (
                Error::connection("Failed to connect to SQL Server after several attempts."),
                "Connection error: Failed to connect to SQL Server after several attempts.",
            ),
        ];
        for (err, expected) in cases {
            let (status, body) = ApiError::from(err).to_response();
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body.detail, expected);
        }
    }

    #[test]
    fn test_failed_statement() {
        let rejected = Error::Database {
            message: "Incorrect syntax near 'TABL'.".into(),
            sql: Some("DROP TABL t".into()),
            source: None,
        };
        assert_eq!(ApiError::from(rejected).failed_statement(), Some("DROP TABL t"));
        assert_eq!(ApiError::unprocessable("x").failed_statement(), None);
    }

    #[test]
    fn test_unprocessable() {
        let (status, body) = ApiError::unprocessable("Field required: data").to_response();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.detail, "Field required: data");
    }
}
