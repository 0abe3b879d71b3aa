//! Shared integration test fixtures: in-memory app with fake collaborators

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::util::ServiceExt;
use uuid::Uuid;

use scoutlink_ingest::db::{self, TenantStore};
use scoutlink_ingest::services::messaging::{GatewayError, MessagingGateway};
use scoutlink_ingest::services::sportmonks_client::{
    DirectoryError, DirectoryPlayer, PlayerDirectory, PlayerRecord,
};
use scoutlink_ingest::{build_router, AppState, IngestConfig};

pub const WEBHOOK_SECRET: &str = "test-webhook-secret";
pub const WORKER_SECRET: &str = "test-worker-secret";
pub const SCOUT_PHONE: &str = "+4915112345678";

/// Player directory fake with scriptable search hits and failures
#[derive(Default)]
pub struct FakeDirectory {
    pub search_hits: Mutex<Vec<DirectoryPlayer>>,
    /// When set, every search fails with a network error carrying this text
    pub search_error: Mutex<Option<String>>,
    pub search_calls: AtomicUsize,
    pub players: Mutex<HashMap<i64, PlayerRecord>>,
    /// When set, every fetch fails with a network error carrying this text
    pub fetch_error: Mutex<Option<String>>,
}

impl FakeDirectory {
    pub fn set_search_hits(&self, hits: Vec<DirectoryPlayer>) {
        *self.search_hits.lock().unwrap() = hits;
    }

    pub fn set_search_error(&self, reason: Option<&str>) {
        *self.search_error.lock().unwrap() = reason.map(str::to_string);
    }

    pub fn set_fetch_error(&self, reason: Option<&str>) {
        *self.fetch_error.lock().unwrap() = reason.map(str::to_string);
    }

    pub fn add_player(&self, record: PlayerRecord) {
        self.players.lock().unwrap().insert(record.id, record);
    }

    pub fn search_call_count(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlayerDirectory for FakeDirectory {
    async fn search_players(&self, _name: &str) -> Result<Vec<DirectoryPlayer>, DirectoryError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.search_error.lock().unwrap().clone() {
            return Err(DirectoryError::Network(reason));
        }
        Ok(self.search_hits.lock().unwrap().clone())
    }

    async fn fetch_player(&self, id: i64) -> Result<PlayerRecord, DirectoryError> {
        if let Some(reason) = self.fetch_error.lock().unwrap().clone() {
            return Err(DirectoryError::Network(reason));
        }
        self.players
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::PlayerNotFound(id))
    }
}

pub fn hit(id: i64, name: &str, club: Option<&str>) -> DirectoryPlayer {
    DirectoryPlayer {
        id,
        display_name: name.to_string(),
        club_name: club.map(str::to_string),
    }
}

pub fn record(id: i64, name: &str) -> PlayerRecord {
    PlayerRecord {
        id,
        display_name: name.to_string(),
        club_name: Some("FC Example".to_string()),
        position: Some("Centre-Forward".to_string()),
        nationality: None,
        date_of_birth: None,
        payload: serde_json::json!({ "id": id, "display_name": name }),
    }
}

/// Messaging gateway fake recording every outbound text
#[derive(Default)]
pub struct RecordingGateway {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingGateway {
    pub fn bodies(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn last_body(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|(_, body)| body.clone())
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn send_text(&self, to_phone: &str, body: &str) -> Result<(), GatewayError> {
        self.sent
            .lock()
            .unwrap()
            .push((to_phone.to_string(), body.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub app: axum::Router,
    pub pool: SqlitePool,
    pub tenant_id: Uuid,
    pub directory: Arc<FakeDirectory>,
    pub gateway: Arc<RecordingGateway>,
}

pub async fn test_app() -> TestApp {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create in-memory database");
    db::init_tables(&pool)
        .await
        .expect("Failed to initialize database schema");

    let tenant = TenantStore::new(pool.clone())
        .create("Test Club", true)
        .await
        .expect("Failed to create test tenant");

    let config = IngestConfig {
        database_path: PathBuf::from(":memory:"),
        bind_host: "127.0.0.1".to_string(),
        bind_port: 0,
        webhook_secret: WEBHOOK_SECRET.to_string(),
        worker_secret: WORKER_SECRET.to_string(),
        worker_bearer_token: None,
        player_api_base: None,
        player_api_token: "test-token".to_string(),
        messaging_api_base: "http://localhost".to_string(),
        messaging_api_token: "test-token".to_string(),
        messaging_sender_id: "12345".to_string(),
        staleness_minutes: 10,
        confirmation_expiry_hours: 72,
        worker_batch_size: 10,
    };

    let directory = Arc::new(FakeDirectory::default());
    let gateway = Arc::new(RecordingGateway::default());

    let state = AppState::new(
        pool.clone(),
        Arc::new(config),
        directory.clone(),
        gateway.clone(),
    );

    TestApp {
        app: build_router(state),
        pool,
        tenant_id: tenant.id,
        directory,
        gateway,
    }
}

/// POST a generic-shape message to the webhook, returning status and body
pub async fn send_webhook(
    app: &axum::Router,
    tenant_id: Uuid,
    from: &str,
    text: &str,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(format!("/webhook/{}", tenant_id))
        .header("content-type", "application/json")
        .header("x-webhook-secret", WEBHOOK_SECRET)
        .body(Body::from(
            serde_json::json!({ "from": from, "text": text }).to_string(),
        ))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);

    (status, json)
}

/// Trigger one worker pass over HTTP, returning the touched-target count
pub async fn run_worker(app: &axum::Router) -> u64 {
    let request = Request::builder()
        .method("POST")
        .uri("/worker/run")
        .header("x-worker-secret", WORKER_SECRET)
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    json["processed"].as_u64().unwrap()
}
