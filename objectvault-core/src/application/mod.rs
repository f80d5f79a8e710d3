//! Application services: the two pipelines plus the HTTP surfaces that
//! front them.

pub mod aggregator_api;
pub mod aggregator_pipeline;
pub mod lb_api;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use objectvault_domain::ObjectVaultError;

/// Thin newtype so the HTTP surfaces can implement `IntoResponse` for the
/// domain error without running into the orphan rule - `ObjectVaultError`
/// itself lives in `objectvault-domain`.
pub struct ApiError(pub ObjectVaultError);

impl From<ObjectVaultError> for ApiError {
    fn from(err: ObjectVaultError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = if matches!(self.0, ObjectVaultError::Internal(_)) {
            json!({"error": "internal error"})
        } else {
            json!({"error": self.0.to_string()})
        };
        (status, Json(body)).into_response()
    }
}
