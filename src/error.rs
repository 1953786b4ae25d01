//! Error types for the key-value service
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

// == KV Error Enum ==
/// Unified error type for repository and API operations.
#[derive(Error, Debug)]
pub enum KvError {
    /// Request body is not a JSON object of key-value pairs
    #[error("Bad payload: {0}")]
    BadPayload(String),

    /// Key filter is not a valid regular expression
    #[error("Invalid filter regex: {0}")]
    InvalidFilter(String),

    /// Expiry parameter is not a positive whole number of seconds
    #[error("Invalid expiry: {0}")]
    InvalidExpiry(String),

    /// Requested key(s) not present
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Backing store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

// == IntoResponse Implementation ==
impl IntoResponse for KvError {
    fn into_response(self) -> Response {
        let status = match &self {
            KvError::BadPayload(_) | KvError::InvalidFilter(_) | KvError::InvalidExpiry(_) => {
                StatusCode::BAD_REQUEST
            }
            KvError::NotFound(_) => StatusCode::NOT_FOUND,
            KvError::Store(err) => {
                error!("Store failure while serving request: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the key-value service.
pub type Result<T> = std::result::Result<T, KvError>;
