//! HTTP API handlers for scoutlink-ingest

pub mod health;
pub mod targets;
pub mod webhook;
pub mod worker;

pub use health::health_routes;
pub use targets::target_routes;
pub use webhook::webhook_routes;
pub use worker::worker_routes;

use axum::http::HeaderMap;

use crate::error::ApiError;
use crate::AppState;

/// Authorize an internal (scheduler/dashboard) request: a scheduler bearer
/// token, the worker shared-secret header, or the same secret as a query
/// parameter all pass.
pub(crate) fn authorize_internal(
    state: &AppState,
    headers: &HeaderMap,
    secret_param: Option<&str>,
) -> Result<(), ApiError> {
    if let Some(expected) = &state.config.worker_bearer_token {
        if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
            if auth.strip_prefix("Bearer ") == Some(expected.as_str()) {
                return Ok(());
            }
        }
    }

    let expected = state.config.worker_secret.as_str();
    if let Some(secret) = headers.get("x-worker-secret").and_then(|v| v.to_str().ok()) {
        if secret == expected {
            return Ok(());
        }
    }
    if secret_param == Some(expected) {
        return Ok(());
    }

    Err(ApiError::Unauthorized)
}
