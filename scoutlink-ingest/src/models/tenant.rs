//! Tenant model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One tenant (club / scouting organization) using the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    /// When false, the webhook rejects inbound messages for this tenant
    pub ingest_enabled: bool,
    pub created_at: DateTime<Utc>,
}
