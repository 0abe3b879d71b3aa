//! Player materialization
//!
//! Given a confirmed external player id, fetches the full record from the
//! player directory and upserts it into tenant storage.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use scoutlink_common::{Error, Result};

use crate::db::PlayerStore;
use crate::models::Player;
use crate::services::sportmonks_client::PlayerDirectory;

/// Materializes full player records from the directory
pub struct PlayerMaterializer {
    directory: Arc<dyn PlayerDirectory>,
    players: PlayerStore,
}

impl PlayerMaterializer {
    pub fn new(directory: Arc<dyn PlayerDirectory>, players: PlayerStore) -> Self {
        Self { directory, players }
    }

    /// Fetch the player and upsert the tenant-scoped record.
    ///
    /// The provider error detail stays in the returned error for logging;
    /// callers surface only a generic reason to the sender.
    pub async fn materialize(&self, tenant_id: Uuid, sportmonks_id: i64) -> Result<Player> {
        let record = self
            .directory
            .fetch_player(sportmonks_id)
            .await
            .map_err(|e| Error::Internal(format!("player fetch failed: {}", e)))?;

        let now = Utc::now();
        let player = Player {
            tenant_id,
            sportmonks_id: record.id,
            display_name: record.display_name,
            club_name: record.club_name,
            position: record.position,
            nationality: record.nationality,
            date_of_birth: record.date_of_birth,
            payload: record.payload,
            created_at: now,
            updated_at: now,
        };

        self.players.upsert(&player).await?;

        tracing::info!(
            tenant_id = %tenant_id,
            player_id = player.sportmonks_id,
            player = %player.display_name,
            "Materialized player record"
        );

        Ok(player)
    }
}
