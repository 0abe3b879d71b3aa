//! Target listing endpoint
//!
//! Read-only view of recent targets for the dashboard: raw status, the
//! resolved player when there is one, and the last error for failed rows.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::authorize_internal;
use crate::db::TargetStore;
use crate::error::ApiResult;
use crate::models::InboundTarget;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TargetListQuery {
    pub tenant_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub secret: Option<String>,
}

/// One target in the listing
#[derive(Debug, Serialize)]
pub struct TargetView {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub source_url: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sportmonks_player_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_player_name: Option<String>,
    pub resolve_attempts: i64,
    pub fetch_attempts: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<InboundTarget> for TargetView {
    fn from(target: InboundTarget) -> Self {
        Self {
            id: target.id,
            tenant_id: target.tenant_id,
            source_url: target.source_url,
            status: target.status.as_str().to_string(),
            sportmonks_player_id: target.sportmonks_player_id,
            resolved_player_name: target.resolved_player_name,
            resolve_attempts: target.resolve_attempts,
            fetch_attempts: target.fetch_attempts,
            last_error: target.last_error,
            created_at: target.created_at,
            updated_at: target.updated_at,
        }
    }
}

/// GET /targets
pub async fn list_targets(
    State(state): State<AppState>,
    Query(query): Query<TargetListQuery>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<TargetView>>> {
    authorize_internal(&state, &headers, query.secret.as_deref())?;

    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let targets = TargetStore::new(state.db.clone())
        .list_recent(query.tenant_id, limit)
        .await?;

    Ok(Json(targets.into_iter().map(TargetView::from).collect()))
}

/// Build target listing routes
pub fn target_routes() -> Router<AppState> {
    Router::new().route("/targets", get(list_targets))
}
