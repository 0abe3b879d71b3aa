//! scoutlink-ingest - Inbound Target Resolution Service
//!
//! Receives scout messages from the messaging provider webhook, resolves
//! Transfermarkt profile links against the external player database, and
//! materializes player records. The resolution worker is driven by an
//! external scheduler through `/worker/run`.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use scoutlink_common::config::load_toml_config;
use scoutlink_ingest::db::{TargetStore, TenantStore};
use scoutlink_ingest::services::{SportmonksClient, WhatsAppGateway};
use scoutlink_ingest::{AppState, IngestConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; RUST_LOG overrides the default level
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting scoutlink-ingest");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let toml = load_toml_config()?;
    let config = Arc::new(IngestConfig::resolve(&toml)?);
    info!("Database: {}", config.database_path.display());

    let db_pool = scoutlink_ingest::db::init_database_pool(&config.database_path).await?;
    scoutlink_ingest::db::init_tables(&db_pool).await?;
    info!("Database connection established");

    // Seed a default tenant on a fresh database so the webhook has a
    // routable tenant id out of the box
    let tenant = TenantStore::new(db_pool.clone()).ensure_default().await?;
    info!(tenant_id = %tenant.id, "Default tenant ready");

    // Startup recovery is implicit: in-flight rows are picked up by the
    // next worker pass via the staleness cutoff. Log how many are waiting.
    let in_flight = TargetStore::new(db_pool.clone()).count_in_flight().await?;
    if in_flight > 0 {
        info!(count = in_flight, "In-flight targets will be resumed by the worker");
    }

    let directory = SportmonksClient::new(
        config.player_api_base.clone(),
        config.player_api_token.clone(),
    )
    .map_err(|e| anyhow::anyhow!("Failed to build player directory client: {}", e))?;

    let gateway = WhatsAppGateway::new(
        config.messaging_api_base.clone(),
        config.messaging_api_token.clone(),
        config.messaging_sender_id.clone(),
    )
    .map_err(|e| anyhow::anyhow!("Failed to build messaging gateway: {}", e))?;

    let state = AppState::new(
        db_pool,
        config.clone(),
        Arc::new(directory),
        Arc::new(gateway),
    );

    let app = scoutlink_ingest::build_router(state);

    let bind_addr = format!("{}:{}", config.bind_host, config.bind_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
