use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::db::AnalysisStatus;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing required field or disallowed file. Correctable by the caller.
    #[error("{0}")]
    Validation(String),

    #[error("submission not found: {0}")]
    NotFound(String),

    #[error("not authorized to view submission {0}")]
    Forbidden(String),

    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// Malformed content for a supported file type.
    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("submission {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: AnalysisStatus,
        to: AnalysisStatus,
    },

    #[error("analysis service error: {0}")]
    Analyzer(String),

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::Store(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for Error {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Error::Store(e.to_string())
    }
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidTransition { .. } => StatusCode::CONFLICT,
            Error::Extraction(_) | Error::Analyzer(_) | Error::Store(_) | Error::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = Json(serde_json::json!({ "message": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_http_status() {
        assert_eq!(
            Error::Validation("title is required".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(Error::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Error::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            Error::Unauthorized("no token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            Error::Store("connection refused".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn transition_error_names_both_states() {
        let err = Error::InvalidTransition {
            id: "20250101_abcd1234".into(),
            from: AnalysisStatus::Completed,
            to: AnalysisStatus::Analyzing,
        };
        assert_eq!(
            err.to_string(),
            "submission 20250101_abcd1234 cannot move from completed to analyzing"
        );
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }
}
