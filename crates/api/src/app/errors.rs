use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use authn_auth::AuthError;

use crate::store::StoreError;

/// Error body shared by every endpoint: `{status, code, message}`.
pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "status": status.as_u16(),
            "code": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn auth_error_to_response(err: &AuthError) -> Response {
    let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    json_error(status, err.code(), err.message())
}

pub fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::DuplicateEmail(_) => {
            json_error(StatusCode::BAD_REQUEST, "duplicate_email", err.to_string())
        }
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
        StoreError::Poisoned => {
            tracing::error!(error = %err, "user store unavailable");
            internal_error()
        }
    }
}

pub fn internal_error() -> Response {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "internal server error",
    )
}

/// 400 with per-field messages under `errors`.
pub fn validation_error(errors: serde_json::Map<String, serde_json::Value>) -> Response {
    let status = StatusCode::BAD_REQUEST;
    (
        status,
        axum::Json(json!({
            "status": status.as_u16(),
            "code": "invalid_request",
            "message": "invalid request",
            "errors": errors,
        })),
    )
        .into_response()
}
