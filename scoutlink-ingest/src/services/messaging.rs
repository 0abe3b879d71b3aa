//! Messaging gateway and outbound text catalog
//!
//! Every outbound send is best-effort: a delivery failure is logged and
//! never rolls back state already committed or fails the HTTP response.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::models::PlayerCandidate;

/// Messaging gateway errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),
}

/// Send text messages to a phone number
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send_text(&self, to_phone: &str, body: &str) -> Result<(), GatewayError>;
}

/// WhatsApp Cloud API gateway
pub struct WhatsAppGateway {
    http_client: reqwest::Client,
    base_url: String,
    api_token: String,
    sender_id: String,
}

impl WhatsAppGateway {
    pub fn new(
        base_url: String,
        api_token: String,
        sender_id: String,
    ) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            api_token,
            sender_id,
        })
    }
}

#[async_trait]
impl MessagingGateway for WhatsAppGateway {
    async fn send_text(&self, to_phone: &str, body: &str) -> Result<(), GatewayError> {
        let url = format!("{}/{}/messages", self.base_url, self.sender_id);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&json!({
                "messaging_product": "whatsapp",
                "to": to_phone,
                "type": "text",
                "text": { "body": body },
            }))
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api(status.as_u16(), error_text));
        }

        tracing::debug!(to = %to_phone, "Outbound message delivered");

        Ok(())
    }
}

/// Fire-and-forget send: logs failures, never propagates them.
///
/// State transitions commit first; the notification afterwards is allowed
/// to fail without affecting them.
pub async fn send_best_effort(gateway: &dyn MessagingGateway, to_phone: &str, body: &str) {
    if let Err(e) = gateway.send_text(to_phone, body).await {
        tracing::warn!(to = %to_phone, error = %e, "Failed to send outbound message");
    }
}

/// Fixed outbound texts sent to scouts over the messaging channel
pub mod texts {
    use super::PlayerCandidate;

    /// Acknowledgement when a new target is created
    pub const RECEIVED_ACK: &str = "Got it! Fetching the player details now, this can take a few minutes.";

    /// Notice when the same link is sent again while still in flight
    pub const DUPLICATE_NOTICE: &str = "We already received this player link and are working on it.";

    /// Prompt after a definitive resolution failure
    pub const COULD_NOT_MATCH: &str =
        "We could not match this player. Please resend with the player's full name and current club.";

    /// Prompt when a bare-digit reply collides with several pending confirmations
    pub const AMBIGUOUS_REPLY: &str =
        "Several players are waiting for confirmation. Please reply with the 6-character code followed by your pick, e.g. ABC123 2.";

    /// Numbered candidate list plus the correlation code
    pub fn confirmation_prompt(code: &str, candidates: &[PlayerCandidate]) -> String {
        let mut lines = vec!["We found several possible matches:".to_string()];

        for (i, candidate) in candidates.iter().enumerate() {
            let line = match &candidate.club_name {
                Some(club) => format!("{}. {} ({})", i + 1, candidate.display_name, club),
                None => format!("{}. {}", i + 1, candidate.display_name),
            };
            lines.push(line);
        }

        lines.push(format!(
            "Reply with {} and the number of the right player, e.g. {} 1.",
            code, code
        ));

        lines.join("\n")
    }

    /// Acknowledgement after a successful disambiguation
    pub fn confirmed(player_name: &str) -> String {
        format!("Thanks, confirmed {}. Fetching the player details now.", player_name)
    }
}
