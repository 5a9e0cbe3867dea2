//! JSON extractor whose rejections use the failure envelope

use axum::{
    extract::{rejection::JsonRejection as AxumJsonRejection, FromRequest, Request},
    response::{IntoResponse, Response},
    Json as AxumJson,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::ApiError;

pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON";

/// Wrapper around `axum::Json` answering malformed bodies with
/// `400 {"status": "failed", "reason": "Invalid JSON"}`
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

/// Rejection raised for unreadable or non-JSON bodies
#[derive(Debug)]
pub struct JsonRejection {
    detail: String,
}

impl IntoResponse for JsonRejection {
    fn into_response(self) -> Response {
        debug!(detail = %self.detail, "Rejected request body");
        ApiError::bad_request(INVALID_JSON_MESSAGE).into_response()
    }
}

impl From<AxumJsonRejection> for JsonRejection {
    fn from(rejection: AxumJsonRejection) -> Self {
        Self {
            detail: rejection.body_text(),
        }
    }
}

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = JsonRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let AxumJson(value) = AxumJson::<T>::from_request(req, state).await?;
        Ok(Json(value))
    }
}

impl<T> IntoResponse for Json<T>
where
    T: serde::Serialize,
{
    fn into_response(self) -> Response {
        AxumJson(self.0).into_response()
    }
}
