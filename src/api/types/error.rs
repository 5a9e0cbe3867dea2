//! Failure envelope and status mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use super::response::ResponseStatus;
use crate::domain::{DomainError, FieldErrors, RepositoryError};

pub const SERVER_ERROR_MESSAGE: &str = "Error while processing data";
pub const UNCLASSIFIED_ERROR_MESSAGE: &str = "Request failed due to a server error";

/// Why a request failed: a message, or per-field reasons
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FailureReason {
    Message(String),
    Fields(FieldErrors),
}

/// `{"status": "failed", "reason": ...}`
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorResponse {
    pub status: ResponseStatus,
    pub reason: FailureReason,
}

/// API error with status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ApiErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, reason: FailureReason) -> Self {
        Self {
            status,
            response: ApiErrorResponse {
                status: ResponseStatus::Failed,
                reason,
            },
        }
    }

    fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, FailureReason::Message(message.into()))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::message(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::message(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::message(StatusCode::NOT_FOUND, message)
    }

    pub fn method_not_allowed() -> Self {
        Self::message(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::message(StatusCode::CONFLICT, message)
    }

    /// Backend failure; detail stays in the logs
    pub fn internal() -> Self {
        Self::message(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_MESSAGE)
    }

    /// Failure no other mapping covers
    pub fn unclassified() -> Self {
        Self::message(StatusCode::INTERNAL_SERVER_ERROR, UNCLASSIFIED_ERROR_MESSAGE)
    }

    /// The reason text, when it is a plain message
    pub fn reason_message(&self) -> Option<&str> {
        match &self.response.reason {
            FailureReason::Message(message) => Some(message),
            FailureReason::Fields(_) => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidInput { message } => Self::bad_request(message),
            DomainError::Repository(RepositoryError::Validation { fields }) => {
                Self::new(StatusCode::BAD_REQUEST, FailureReason::Fields(fields))
            }
            DomainError::Repository(RepositoryError::Conflict { fields }) => {
                Self::new(StatusCode::CONFLICT, FailureReason::Fields(fields))
            }
            DomainError::Repository(RepositoryError::Server { message }) => {
                error!(error = %message, "Storage failure");
                Self::internal()
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.response.reason {
            FailureReason::Message(message) => write!(f, "{}: {}", self.status, message),
            FailureReason::Fields(fields) => write!(f, "{}: {:?}", self.status, fields),
        }
    }
}

impl std::error::Error for ApiError {}
