use crate::models::CommandStatus;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures of the command broker and its stores.
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Command not found: {0}")]
    NotFound(String),

    #[error("Command {id} is {status}, cannot move to {target}")]
    InvalidState {
        id: String,
        status: CommandStatus,
        target: CommandStatus,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = core::result::Result<T, BrokerError>;

impl From<sqlx::Error> for BrokerError {
    fn from(err: sqlx::Error) -> Self {
        BrokerError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for BrokerError {
    fn from(err: serde_json::Error) -> Self {
        BrokerError::Storage(err.to_string())
    }
}

/// Errors surfaced by the HTTP handlers.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": {
                "message": error_message
            }
        }));

        (status, body).into_response()
    }
}

impl From<BrokerError> for ApiError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::InvalidInput(_) => ApiError::BadRequest(err.to_string()),
            BrokerError::NotFound(_) => ApiError::NotFound(err.to_string()),
            BrokerError::InvalidState { .. } => ApiError::Conflict(err.to_string()),
            BrokerError::Storage(_) => ApiError::Internal(err.to_string()),
        }
    }
}
