//! scoutlink-ingest library interface
//!
//! Exposes the pipeline components and the router for integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::config::IngestConfig;
pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::services::{MessagingGateway, PlayerDirectory};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, the single source of truth
    pub db: SqlitePool,
    pub config: Arc<IngestConfig>,
    /// External player database collaborator
    pub directory: Arc<dyn PlayerDirectory>,
    /// Messaging provider collaborator
    pub gateway: Arc<dyn MessagingGateway>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        config: Arc<IngestConfig>,
        directory: Arc<dyn PlayerDirectory>,
        gateway: Arc<dyn MessagingGateway>,
    ) -> Self {
        Self {
            db,
            config,
            directory,
            gateway,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::webhook_routes())
        .merge(api::worker_routes())
        .merge(api::target_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
