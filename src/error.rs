use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::llm::ModelError;

/// Errors surfaced by the HTTP handlers.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Input(String),

    #[error("Failed to analyze image: {0}")]
    Upstream(#[source] ModelError),

    #[error("You must be logged in to access scans")]
    Unauthorized,

    #[error("You do not have permission to delete this scan")]
    Forbidden,

    #[error("Scan not found")]
    NotFound,

    #[error("Upload exceeds the size limit")]
    PayloadTooLarge,

    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Configuration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Input(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "Configuration Error",
            AppError::Input(_) => "Bad Request",
            AppError::Upstream(_) => "Failed to analyze image",
            AppError::Unauthorized => "Unauthorized",
            AppError::Forbidden => "Forbidden",
            AppError::NotFound => "Not Found",
            AppError::PayloadTooLarge => "Payload Too Large",
            AppError::Internal(_) => "Internal Server Error",
        }
    }

    fn body(&self) -> ErrorBody {
        let (message, details) = match self {
            AppError::Upstream(source) => (source.to_string(), upstream_details(source)),
            // Internal detail stays in the log
            AppError::Internal(_) => ("An unexpected error occurred".to_string(), None),
            other => (other.to_string(), None),
        };
        ErrorBody {
            error: self.label(),
            message,
            details,
        }
    }
}

fn upstream_details(err: &ModelError) -> Option<String> {
    match err {
        ModelError::Exhausted { model, .. } => Some(format!("last model tried: {model}")),
        ModelError::Status { status, .. } => Some(format!("upstream status {status}")),
        _ => None,
    }
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::MissingApiKey(_) => AppError::Configuration(err.to_string()),
            other => AppError::Upstream(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}
