//! Worker trigger endpoint
//!
//! The resolution worker is a stateless function; this endpoint is the
//! HTTP adapter an external scheduler calls. GET and POST behave
//! identically so any cron-style invoker works.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::authorize_internal;
use crate::error::{ApiError, ApiResult};
use crate::services::ResolutionWorker;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WorkerQuery {
    /// Shared secret as query parameter, for schedulers that cannot set headers
    pub secret: Option<String>,
}

/// Worker run response
#[derive(Debug, Serialize)]
pub struct WorkerRunResponse {
    /// Number of targets advanced this pass
    pub processed: usize,
}

/// GET/POST /worker/run
pub async fn run_worker(
    State(state): State<AppState>,
    Query(query): Query<WorkerQuery>,
    headers: HeaderMap,
) -> ApiResult<Json<WorkerRunResponse>> {
    authorize_internal(&state, &headers, query.secret.as_deref())?;

    let worker = ResolutionWorker::new(
        state.db.clone(),
        state.directory.clone(),
        state.gateway.clone(),
        state.config.worker_settings(),
    );

    let processed = worker
        .run_once()
        .await
        .map_err(|e| ApiError::Internal(format!("Worker run failed: {}", e)))?;

    Ok(Json(WorkerRunResponse { processed }))
}

/// Build worker trigger routes
pub fn worker_routes() -> Router<AppState> {
    Router::new().route("/worker/run", get(run_worker).post(run_worker))
}
