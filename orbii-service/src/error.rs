use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("Database error")]
    Database(#[from] DatabaseError),

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Inference backend errors
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Connection failed to inference backend at {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Generation failed (status {status}): {message}")]
    Generation { status: u16, message: String },

    #[error("Invalid response from inference backend")]
    InvalidResponse {
        #[source]
        source: serde_json::Error,
    },

    #[error("Inference timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Inference returned an empty response")]
    EmptyResponse,
}

/// Database errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed")]
    Connection(#[source] rusqlite::Error),

    #[error("Cannot create database directory {path}")]
    Directory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Query failed")]
    Query(#[source] rusqlite::Error),

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("Serialization failed")]
    Serialization(#[source] serde_json::Error),
}

/// API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            ServiceError::Inference(InferenceError::Timeout { .. }) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ServiceError::Inference(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ServiceError::Inference(InferenceError::Connection { .. }) => "inference_connection",
            ServiceError::Inference(InferenceError::Generation { .. }) => "inference_generation",
            ServiceError::Inference(InferenceError::InvalidResponse { .. }) => {
                "inference_invalid_response"
            }
            ServiceError::Inference(InferenceError::Timeout { .. }) => "inference_timeout",
            ServiceError::Inference(InferenceError::EmptyResponse) => "inference_empty_response",
            ServiceError::Database(_) => "database_error",
            ServiceError::InvalidRequest { .. } => "invalid_request",
            ServiceError::Config { .. } => "config_error",
            ServiceError::Internal { .. } => "internal_error",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code().to_string();

        // Internal details stay in the logs
        let message = match &self {
            ServiceError::InvalidRequest { message } => message.clone(),
            _ => "Something went wrong. Please try again.".to_string(),
        };

        (
            status,
            Json(ErrorResponse {
                message,
                code: Some(code),
            }),
        )
            .into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Render an error and its `source()` chain as `outer: inner: root`.
pub fn format_error_chain_ref(error: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut current = error.source();
    while let Some(source) = current {
        rendered.push_str(": ");
        rendered.push_str(&source.to_string());
        current = source.source();
    }
    rendered
}
