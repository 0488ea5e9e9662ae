//! API error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use coordination_store::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors a handler can surface to a client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Coordination store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid resource payload: {0}")]
    BadPayload(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(err) => {
                error!(error = %err, "Store error while handling request");
                StatusCode::BAD_GATEWAY
            }
            ApiError::BadPayload(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
