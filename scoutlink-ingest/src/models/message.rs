//! Inbound message audit model
//!
//! One row per raw message received over the webhook. Rows are immutable
//! once written and retained for audit and support; only the ingest path
//! and the confirmation correlator append them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One raw inbound message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Normalized sender phone number
    pub from_phone: String,
    /// Raw message text as received
    pub body: String,
    /// Profile URL extracted from the body, when one was found
    pub extracted_url: Option<String>,
    /// Target this message created or replied to
    pub target_id: Option<Uuid>,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(
        tenant_id: Uuid,
        from_phone: impl Into<String>,
        body: impl Into<String>,
        extracted_url: Option<String>,
        target_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            from_phone: from_phone.into(),
            body: body.into(),
            extracted_url,
            target_id,
            received_at: Utc::now(),
        }
    }
}
