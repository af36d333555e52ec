//! JSON error bodies: `{"message": "...", "code": "..."}`.

use axum::{extract::rejection::JsonRejection, http::StatusCode, Json};
use homestock_core::HomestockError;
use homestock_store::StoreError;
use serde_json::{json, Value};
use tracing::error;

pub type ApiError = (StatusCode, Json<Value>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

fn error_body(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(json!({ "message": message.into(), "code": code })),
    )
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    rejected(HomestockError::validation(message))
}

pub fn not_found(kind: &str) -> ApiError {
    error_body(
        StatusCode::NOT_FOUND,
        StoreError::NOT_FOUND,
        format!("{kind} not found"),
    )
}

fn rejected(err: HomestockError) -> ApiError {
    let status = match err {
        HomestockError::Validation(_) => StatusCode::BAD_REQUEST,
        HomestockError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_body(status, err.code(), err.to_string())
}

/// Map a persistence failure to its HTTP status.
pub fn store_error(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound { kind, .. } => not_found(kind),
        StoreError::Rejected(e) => rejected(e),
        other => {
            error!(error = %other, "storage failure");
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                other.code(),
                other.to_string(),
            )
        }
    }
}

/// Unwrap a JSON body, turning a malformed payload into a 400.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| bad_request(rejection.body_text()))
}

/// Deleted-resource confirmation body.
pub fn deleted(kind: &str) -> Json<Value> {
    Json(json!({ "message": format!("{kind} deleted") }))
}
