//! HTTP error mapping. Validation problems echo their message to the caller;
//! internal failures are logged and return a generic body.

use crate::services::bundle::BundleError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("too many requests")]
    RateLimited,
    #[error("document rendering failed: {0}")]
    Render(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "too many requests, try again later".to_string(),
            ),
            ApiError::Render(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(err) => {
                tracing::error!(error = ?err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<BundleError> for ApiError {
    fn from(err: BundleError) -> Self {
        match err {
            BundleError::EmptyMembers => ApiError::Validation(err.to_string()),
            BundleError::Render(inner) => ApiError::Render(inner.to_string()),
            BundleError::Sign(inner) => ApiError::Internal(inner.into()),
            BundleError::Zip(msg) => ApiError::Internal(anyhow::anyhow!(msg)),
        }
    }
}
