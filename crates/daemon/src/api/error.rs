//! HTTP error mapping for the request surface (SPEC_FULL.md §4.3 / §7).
//!
//! Registry operations never raise for business conditions; they return
//! `bool`/`Option`/`Result<_, RegistryError>`. This module is the one place
//! those outcomes become status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use claimd_core::RegistryError;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl ApiError {
    pub fn release_precondition() -> Self {
        Self::BadRequest(
            "Cannot release: either path doesn't exist or agent doesn't own it".to_string(),
        )
    }

    pub fn leave_queue_precondition() -> Self {
        Self::BadRequest("Agent not in queue for this path".to_string())
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
