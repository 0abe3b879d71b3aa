//! Materialized player record
//!
//! Written only by the player materializer, keyed on
//! (tenant, external player id). Repeated resolutions of the same player
//! overwrite the row instead of duplicating it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Full player record as materialized from the external player database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub tenant_id: Uuid,
    /// External player database id
    pub sportmonks_id: i64,
    pub display_name: String,
    pub club_name: Option<String>,
    pub position: Option<String>,
    pub nationality: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    /// Opaque full payload from the external database, kept verbatim
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
