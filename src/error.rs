use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("document not available: {0}")]
    DocumentNotAvailable(String),

    #[error("agent {0} is not available")]
    AgentUnavailable(String),

    #[error("no agents available")]
    NoAvailableAgents,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage temporarily unavailable: {0}")]
    TransientStorage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable code rendered alongside the human-readable message.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::InvalidState(_) => "invalid_state",
            AppError::InvalidTransition(_) => "invalid_transition",
            AppError::NotFound(_) => "not_found",
            AppError::DocumentNotAvailable(_) => "document_not_available",
            AppError::AgentUnavailable(_) => "agent_unavailable",
            AppError::NoAvailableAgents => "no_available_agents",
            AppError::Conflict(_) => "conflict",
            AppError::TransientStorage(_) => "transient_storage",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidState(_)
            | AppError::InvalidTransition(_)
            | AppError::AgentUnavailable(_)
            | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) | AppError::DocumentNotAvailable(_) => StatusCode::NOT_FOUND,
            AppError::NoAvailableAgents | AppError::TransientStorage(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable(msg) => AppError::TransientStorage(msg),
            StorageError::Conflict(msg) => AppError::Conflict(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::AppError;
    use crate::storage::StorageError;

    #[test]
    fn storage_unavailability_becomes_transient_error() {
        let err: AppError = StorageError::Unavailable("db down".to_string()).into();
        assert_eq!(err.kind(), "transient_storage");
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn missing_document_is_distinct_from_missing_application() {
        let missing_doc = AppError::DocumentNotAvailable("id_back".to_string());
        let missing_app = AppError::NotFound("application".to_string());
        assert_eq!(missing_doc.status_code(), missing_app.status_code());
        assert_ne!(missing_doc.kind(), missing_app.kind());
    }
}
