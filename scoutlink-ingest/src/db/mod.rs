//! Database access for scoutlink-ingest
//!
//! SQLite is the single source of truth shared by the webhook ingest path
//! and the resolution worker. Timestamps are stored as RFC3339 TEXT;
//! candidate lists are JSON-in-TEXT.

pub mod messages;
pub mod players;
pub mod targets;
pub mod tenants;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::Path;

pub use messages::MessageStore;
pub use players::PlayerStore;
pub use targets::{Admission, TargetStore};
pub use tenants::TenantStore;

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the pipeline tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tenants (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            ingest_enabled INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS inbound_messages (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            from_phone TEXT NOT NULL,
            body TEXT NOT NULL,
            extracted_url TEXT,
            target_id TEXT,
            received_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS inbound_targets (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            source_url TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'received',
            sportmonks_player_id INTEGER,
            resolved_player_name TEXT,
            candidates TEXT,
            resolve_attempts INTEGER NOT NULL DEFAULT 0,
            fetch_attempts INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            last_attempt_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // At most one active (non-terminal) target per (tenant, url)
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_targets_active_url
        ON inbound_targets (tenant_id, source_url)
        WHERE status NOT IN ('ready', 'failed')
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS players (
            tenant_id TEXT NOT NULL,
            sportmonks_id INTEGER NOT NULL,
            display_name TEXT NOT NULL,
            club_name TEXT,
            position TEXT,
            nationality TEXT,
            date_of_birth TEXT,
            payload TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (tenant_id, sportmonks_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (tenants, inbound_messages, inbound_targets, players)");

    Ok(())
}

/// Parse an RFC3339 TEXT column into a UTC timestamp
pub(crate) fn parse_ts(s: &str) -> scoutlink_common::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| scoutlink_common::Error::Internal(format!("Failed to parse timestamp '{}': {}", s, e)))
}

// A second connection to ":memory:" would see a different, empty
// database, so the test pool is capped at one connection.
#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .unwrap();
    init_tables(&pool).await.unwrap();
    pool
}
