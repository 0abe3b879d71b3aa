//! Webhook ingest endpoint
//!
//! Entry point for inbound messages from the messaging provider. Replies
//! matching a confirmation grammar go to the correlator; everything else
//! goes through link extraction. All database writes commit before the
//! acknowledgement send, which is best-effort and never fails the
//! response.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use scoutlink_common::phone;

use crate::db::{MessageStore, TargetStore, TenantStore};
use crate::error::{ApiError, ApiResult};
use crate::models::InboundMessage;
use crate::services::correlator::{parse_reply, ConfirmationCorrelator, CorrelationOutcome};
use crate::services::link_extractor;
use crate::services::messaging::{send_best_effort, texts};
use crate::AppState;

/// Provider payload shapes, auto-detected by field presence
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WebhookPayload {
    /// Business-messaging-platform style (nested entry/changes/messages)
    Meta { entry: Vec<MetaEntry> },
    /// SMS-style provider
    Sms {
        #[serde(rename = "Body")]
        body: String,
        #[serde(rename = "From")]
        from: String,
    },
    /// Generic shape
    Generic { from: String, text: String },
}

#[derive(Debug, Deserialize)]
pub struct MetaEntry {
    #[serde(default)]
    changes: Vec<MetaChange>,
}

#[derive(Debug, Deserialize)]
pub struct MetaChange {
    value: MetaValue,
}

#[derive(Debug, Deserialize)]
pub struct MetaValue {
    #[serde(default)]
    messages: Vec<MetaMessage>,
}

#[derive(Debug, Deserialize)]
pub struct MetaMessage {
    from: String,
    text: Option<MetaText>,
}

#[derive(Debug, Deserialize)]
pub struct MetaText {
    body: String,
}

impl WebhookPayload {
    /// Normalize to `{from_phone, text}`
    fn normalize(self) -> Result<(String, String), ApiError> {
        match self {
            WebhookPayload::Sms { body, from } => Ok((phone::normalize(&from), body)),
            WebhookPayload::Generic { from, text } => Ok((phone::normalize(&from), text)),
            WebhookPayload::Meta { entry } => {
                for e in entry {
                    for change in e.changes {
                        for message in change.value.messages {
                            if let Some(text) = message.text {
                                return Ok((phone::normalize(&message.from), text.body));
                            }
                        }
                    }
                }
                Err(ApiError::BadRequest("No text message in payload".to_string()))
            }
        }
    }
}

/// Webhook response body
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<Uuid>,
}

/// POST /webhook/:tenant_id
pub async fn inbound_webhook(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<WebhookPayload>,
) -> ApiResult<Json<WebhookResponse>> {
    // Shared-secret check before anything else
    let secret = headers
        .get("x-webhook-secret")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;
    if secret != state.config.webhook_secret {
        return Err(ApiError::Unauthorized);
    }

    let tenant = TenantStore::new(state.db.clone())
        .get(tenant_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Unknown tenant: {}", tenant_id)))?;
    if !tenant.ingest_enabled {
        return Err(ApiError::Forbidden(
            "Inbound ingestion is disabled for this tenant".to_string(),
        ));
    }

    let (from_phone, text) = payload.normalize()?;

    tracing::info!(tenant_id = %tenant_id, from = %from_phone, "Inbound message received");

    if let Some(reply) = parse_reply(&text) {
        return handle_reply(&state, tenant_id, &from_phone, &text, &reply).await;
    }

    handle_fresh_message(&state, tenant_id, &from_phone, &text).await
}

/// Confirmation reply path: delegate to the correlator, then notify
async fn handle_reply(
    state: &AppState,
    tenant_id: Uuid,
    from_phone: &str,
    text: &str,
    reply: &crate::services::Reply,
) -> ApiResult<Json<WebhookResponse>> {
    let correlator = ConfirmationCorrelator::new(
        TargetStore::new(state.db.clone()),
        MessageStore::new(state.db.clone()),
    );

    let outcome = correlator
        .correlate(tenant_id, from_phone, text, reply)
        .await?;

    let response = match outcome {
        CorrelationOutcome::Confirmed { target, candidate } => {
            send_best_effort(
                state.gateway.as_ref(),
                from_phone,
                &texts::confirmed(&candidate.display_name),
            )
            .await;
            WebhookResponse {
                status: "confirmed",
                target_id: Some(target.id),
            }
        }
        CorrelationOutcome::NoMatch => WebhookResponse {
            status: "no_matching_confirmation",
            target_id: None,
        },
        CorrelationOutcome::AmbiguousPending => {
            send_best_effort(state.gateway.as_ref(), from_phone, texts::AMBIGUOUS_REPLY).await;
            WebhookResponse {
                status: "ambiguous_reply",
                target_id: None,
            }
        }
        CorrelationOutcome::InvalidSelection => WebhookResponse {
            status: "invalid_selection",
            target_id: None,
        },
    };

    Ok(Json(response))
}

/// Fresh message path: record the message, create a target when a link is
/// found, acknowledge
async fn handle_fresh_message(
    state: &AppState,
    tenant_id: Uuid,
    from_phone: &str,
    text: &str,
) -> ApiResult<Json<WebhookResponse>> {
    let targets = TargetStore::new(state.db.clone());
    let messages = MessageStore::new(state.db.clone());

    let url = match link_extractor::extract(text) {
        Some(url) => url,
        None => {
            // Still recorded for audit; no target, no acknowledgement
            messages
                .insert(&InboundMessage::new(tenant_id, from_phone, text, None, None))
                .await?;
            tracing::debug!(tenant_id = %tenant_id, "Inbound message without a profile link");
            return Ok(Json(WebhookResponse {
                status: "no_link",
                target_id: None,
            }));
        }
    };

    if let Some(existing) = targets.find_active_by_url(tenant_id, &url).await? {
        messages
            .insert(&InboundMessage::new(
                tenant_id,
                from_phone,
                text,
                Some(url.clone()),
                Some(existing.id),
            ))
            .await?;
        tracing::info!(tenant_id = %tenant_id, target_id = %existing.id, url = %url, "Duplicate link for active target");
        send_best_effort(state.gateway.as_ref(), from_phone, texts::DUPLICATE_NOTICE).await;
        return Ok(Json(WebhookResponse {
            status: "duplicate",
            target_id: Some(existing.id),
        }));
    }

    let target = match targets.create(tenant_id, &url).await {
        Ok(target) => target,
        // Lost a create race; re-query the winning row so the audit trail
        // and response link it exactly like the ordinary duplicate branch
        Err(scoutlink_common::Error::DuplicateTarget(_)) => {
            let winner_id = targets
                .find_active_by_url(tenant_id, &url)
                .await?
                .map(|t| t.id);
            messages
                .insert(&InboundMessage::new(
                    tenant_id,
                    from_phone,
                    text,
                    Some(url),
                    winner_id,
                ))
                .await?;
            send_best_effort(state.gateway.as_ref(), from_phone, texts::DUPLICATE_NOTICE).await;
            return Ok(Json(WebhookResponse {
                status: "duplicate",
                target_id: winner_id,
            }));
        }
        Err(e) => return Err(e.into()),
    };

    messages
        .insert(&InboundMessage::new(
            tenant_id,
            from_phone,
            text,
            Some(url),
            Some(target.id),
        ))
        .await?;

    send_best_effort(state.gateway.as_ref(), from_phone, texts::RECEIVED_ACK).await;

    Ok(Json(WebhookResponse {
        status: "target_created",
        target_id: Some(target.id),
    }))
}

/// Build webhook routes
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhook/:tenant_id", post(inbound_webhook))
}
