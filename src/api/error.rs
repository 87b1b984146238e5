//--------------------------------------------------------------------------------------------------
// ENUMS
//--------------------------------------------------------------------------------------------------
// | Name            | Description                                      | Key Methods         |
// |-----------------|--------------------------------------------------|---------------------|
// | ApiError        | Error types for the ingress adapter              | into_response       |
//--------------------------------------------------------------------------------------------------

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::engine::SubmitError;
use crate::store::StoreError;
use crate::types::TypeError;

/// Type alias for Result with ApiError
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors the ingress adapter reports back to clients.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    /// The order message is malformed (bad enum, bad decimal, bad sign).
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// The user id is not present in the users table.
    #[error("unknown user: {0}")]
    UnknownUser(i64),

    /// The inbound queue is full; the client should retry later.
    #[error("engine busy: {0}")]
    Unavailable(String),

    /// Internal server error
    #[error("internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            Self::InvalidOrder(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::UnknownUser(user_id) => (
                StatusCode::BAD_REQUEST,
                format!("user {} does not exist", user_id),
            ),
            Self::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "code": status.as_u16()
            }
        }));

        (status, body).into_response()
    }
}

impl From<TypeError> for ApiError {
    fn from(err: TypeError) -> Self {
        Self::InvalidOrder(err.to_string())
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::QueueFull => Self::Unavailable("inbound queue full".to_string()),
            SubmitError::Closed => Self::Internal("engine stopped".to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}
