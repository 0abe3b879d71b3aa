//! Materialized player persistence

use chrono::{NaiveDate, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use scoutlink_common::{Error, Result};

use crate::models::Player;

/// Repository for materialized player records
#[derive(Clone)]
pub struct PlayerStore {
    db: SqlitePool,
}

impl PlayerStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Upsert keyed on (tenant, external id); repeated resolutions of the
    /// same player overwrite instead of duplicating
    pub async fn upsert(&self, player: &Player) -> Result<()> {
        let payload = serde_json::to_string(&player.payload)
            .map_err(|e| Error::Internal(format!("Failed to serialize player payload: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO players (
                tenant_id, sportmonks_id, display_name, club_name,
                position, nationality, date_of_birth, payload, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(tenant_id, sportmonks_id) DO UPDATE SET
                display_name = excluded.display_name,
                club_name = excluded.club_name,
                position = excluded.position,
                nationality = excluded.nationality,
                date_of_birth = excluded.date_of_birth,
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(player.tenant_id.to_string())
        .bind(player.sportmonks_id)
        .bind(&player.display_name)
        .bind(&player.club_name)
        .bind(&player.position)
        .bind(&player.nationality)
        .bind(player.date_of_birth.map(|d| d.to_string()))
        .bind(&payload)
        .bind(player.created_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Load one player by (tenant, external id)
    pub async fn get(&self, tenant_id: Uuid, sportmonks_id: i64) -> Result<Option<Player>> {
        let row = sqlx::query("SELECT * FROM players WHERE tenant_id = ? AND sportmonks_id = ?")
            .bind(tenant_id.to_string())
            .bind(sportmonks_id)
            .fetch_optional(&self.db)
            .await?;

        row.map(player_from_row).transpose()
    }
}

fn player_from_row(row: SqliteRow) -> Result<Player> {
    let tenant_str: String = row.get("tenant_id");
    let payload: String = row.get("payload");
    let date_of_birth: Option<String> = row.get("date_of_birth");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Player {
        tenant_id: Uuid::parse_str(&tenant_str)
            .map_err(|e| Error::Internal(format!("Invalid tenant id in database: {}", e)))?,
        sportmonks_id: row.get("sportmonks_id"),
        display_name: row.get("display_name"),
        club_name: row.get("club_name"),
        position: row.get("position"),
        nationality: row.get("nationality"),
        date_of_birth: date_of_birth
            .map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d"))
            .transpose()
            .map_err(|e| Error::Internal(format!("Invalid date_of_birth in database: {}", e)))?,
        payload: serde_json::from_str(&payload)
            .map_err(|e| Error::Internal(format!("Failed to deserialize player payload: {}", e)))?,
        created_at: super::parse_ts(&created_at)?,
        updated_at: super::parse_ts(&updated_at)?,
    })
}
