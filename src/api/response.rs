//! Success envelope shared by all API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// `{ statusCode, data, message, success }` JSON body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip)]
    status: StatusCode,
    status_code: u16,
    data: T,
    message: &'static str,
    success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: &'static str) -> Self {
        Self {
            status,
            status_code: status.as_u16(),
            data,
            message,
            success: status.as_u16() < 400,
        }
    }

    pub fn ok(data: T, message: &'static str) -> Self {
        Self::new(StatusCode::OK, data, message)
    }

    pub fn created(data: T, message: &'static str) -> Self {
        Self::new(StatusCode::CREATED, data, message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Empty JSON object used as `data` when there is nothing to return.
#[derive(Debug, Serialize)]
pub struct Empty {}
