//! JSON error responses.
//!
//! Every failure renders as `{"success": false, "error": <status>, "message": …}`.
//! Auth failures add `code` and `description` from [`AuthError`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("resource not found")]
    NotFound,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("unprocessable: {0}")]
    Unprocessable(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("internal: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(_) | StoreError::Invalid(_) => Self::Unprocessable(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Auth(e) => e.status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::NotFound => json!({
                "success": false,
                "error": status.as_u16(),
                "message": "resource not found",
            }),
            Self::MethodNotAllowed => json!({
                "success": false,
                "error": status.as_u16(),
                "message": "method not allowed",
            }),
            Self::Unprocessable(detail) => json!({
                "success": false,
                "error": status.as_u16(),
                "message": "unprocessable",
                "description": detail,
            }),
            Self::Auth(e) => json!({
                "success": false,
                "error": status.as_u16(),
                "message": match status {
                    StatusCode::FORBIDDEN => "Forbidden",
                    StatusCode::BAD_REQUEST => "Bad Request",
                    _ => "Unauthorized",
                },
                "code": e.code,
                "description": e.description,
            }),
            Self::Internal(detail) => {
                error!("request failed: {detail}");
                json!({
                    "success": false,
                    "error": status.as_u16(),
                    "message": "internal server error",
                })
            }
        };
        (status, Json(body)).into_response()
    }
}
