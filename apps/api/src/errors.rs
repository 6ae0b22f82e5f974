use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::matching::MatchError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Infra failures are shown as "temporarily unavailable, try again"; shape and
/// argument failures as "could not process your request" with no retry prompt.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Temporarily unavailable: {0}")]
    TemporarilyUnavailable(String),

    #[error("No jobs available")]
    NoJobsAvailable,

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

impl From<MatchError> for AppError {
    fn from(err: MatchError) -> Self {
        if err.is_retryable() {
            return AppError::TemporarilyUnavailable(err.to_string());
        }
        match err {
            MatchError::EmptyIndex => AppError::NoJobsAvailable,
            _ => AppError::Validation(err.to_string()),
        }
    }
}

/// Unparsable or mistyped request bodies are shape failures like any other.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                format!("Could not process your request: {msg}"),
            ),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                format!("Could not process your request: {msg}"),
            ),
            AppError::TemporarilyUnavailable(msg) => {
                tracing::error!("Dependency unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "TEMPORARILY_UNAVAILABLE",
                    "Job matching is temporarily unavailable, try again".to_string(),
                )
            }
            AppError::NoJobsAvailable => (
                StatusCode::NOT_FOUND,
                "NO_JOBS_AVAILABLE",
                "No jobs are available".to_string(),
            ),
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "LLM_ERROR",
                    "Resume analysis is temporarily unavailable, try again".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
            AppError::NotImplemented(msg) => (
                StatusCode::NOT_IMPLEMENTED,
                "NOT_IMPLEMENTED",
                msg.clone(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
