//! Error types for the ContractFlow server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use contractflow_core::{
    BundleError, DatasetError, GenerationError, ProviderError, SummaryError, TemplateError,
};

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Every row failed
    #[error("{0}")]
    GenerationFailed(String),

    #[error("Upstream service error: {0}")]
    Provider(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ServerError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg),
            ServerError::GenerationFailed(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "GENERATION_FAILED", msg)
            }
            ServerError::Provider(msg) => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", msg),
            ServerError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
        };

        if status.is_server_error() {
            error!(code, "{}", message);
        }

        let body = ErrorResponse {
            success: false,
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<TemplateError> for ServerError {
    fn from(err: TemplateError) -> Self {
        ServerError::InvalidRequest(err.to_string())
    }
}

impl From<DatasetError> for ServerError {
    fn from(err: DatasetError) -> Self {
        ServerError::InvalidRequest(err.to_string())
    }
}

impl From<GenerationError> for ServerError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::NoRows => ServerError::InvalidRequest(err.to_string()),
            GenerationError::NoDocuments { ref failures } => {
                // Surface the first provider message; it is usually the same for every row.
                let detail = failures
                    .first()
                    .map(|f| format!("{}. First error: {}", err, f.message))
                    .unwrap_or_else(|| err.to_string());
                ServerError::GenerationFailed(detail)
            }
        }
    }
}

impl From<ProviderError> for ServerError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Config(msg) => ServerError::Internal(msg),
            other => ServerError::Provider(other.to_string()),
        }
    }
}

impl From<SummaryError> for ServerError {
    fn from(err: SummaryError) -> Self {
        match err {
            SummaryError::EmptyInput => ServerError::InvalidRequest(err.to_string()),
            SummaryError::Provider(inner) => inner.into(),
            SummaryError::EmptySummary => ServerError::Provider(err.to_string()),
        }
    }
}

impl From<BundleError> for ServerError {
    fn from(err: BundleError) -> Self {
        match err {
            BundleError::NoDocuments => ServerError::InvalidRequest(err.to_string()),
            other => ServerError::Internal(other.to_string()),
        }
    }
}
