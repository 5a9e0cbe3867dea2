//! Success envelope

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::{DtoData, DtoOut};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// `{"status": "success", "data": ...}`
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    #[serde(skip)]
    code: StatusCode,
    pub status: ResponseStatus,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: StatusCode::OK,
            status: ResponseStatus::Success,
            data,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            code: StatusCode::CREATED,
            ..Self::ok(data)
        }
    }
}

impl<T> ApiResponse<DtoData<T>> {
    pub fn from_dto(out: DtoOut<T>) -> Self {
        Self::ok(out.data)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.code, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope() {
        let response = ApiResponse::ok("User deleted successfully");

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({ "status": "success", "data": "User deleted successfully" })
        );
    }

    #[test]
    fn test_created_status() {
        let response = ApiResponse::created(1).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn test_from_dto_collection() {
        let response = ApiResponse::from_dto(DtoOut::collection(vec![1, 2]));

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({ "status": "success", "data": [1, 2] })
        );
    }
}
