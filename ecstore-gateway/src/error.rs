//! HTTP error mapping for the gateway

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ecstore_core::EcStoreError;
use serde_json::json;
use thiserror::Error;

/// Gateway API error types
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("No file provided")]
    MissingFile,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("File not found in metadata: {0}")]
    NotFound(String),

    #[error("File corrupted. Too many nodes down: {0}")]
    Corrupted(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<EcStoreError> for GatewayError {
    fn from(err: EcStoreError) -> Self {
        match err {
            EcStoreError::NotFound(name) => GatewayError::NotFound(name),
            EcStoreError::InvalidInput(msg) => GatewayError::BadRequest(msg),
            EcStoreError::Unrecoverable { .. }
            | EcStoreError::IncompleteInput { .. }
            | EcStoreError::IntegrityMismatch => GatewayError::Corrupted(err.to_string()),
            EcStoreError::PlacementChanged { .. } | EcStoreError::Configuration(_) => {
                GatewayError::Unavailable(err.to_string())
            }
            other => GatewayError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            GatewayError::MissingFile => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "No file provided" }),
            ),
            GatewayError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            GatewayError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "File not found in metadata" }),
            ),
            GatewayError::Corrupted(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "File corrupted. Too many nodes down.",
                    "details": details,
                }),
            ),
            GatewayError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, json!({ "error": msg }))
            }
            GatewayError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
