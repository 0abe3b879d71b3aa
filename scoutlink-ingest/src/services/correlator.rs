//! Confirmation reply correlation
//!
//! Maps a short inbound reply to exactly one pending ambiguous target.
//! Two grammars, checked in order: `CODE DIGIT` (six-character id prefix
//! plus a 1-5 pick) and bare `DIGIT` for the low-friction path. The bare
//! form is only honored when a single confirmation is pending; with two or
//! more the correlator never guesses.

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use scoutlink_common::Result;

use crate::db::{MessageStore, TargetStore};
use crate::models::{InboundMessage, InboundTarget, PlayerCandidate, TargetStatus};

static CODED_REPLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9]{6})\s+([1-5])$").expect("coded reply regex must compile")
});

static BARE_REPLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([1-5])$").expect("bare reply regex must compile"));

/// A parsed confirmation reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `CODE DIGIT`: id prefix plus 1-based candidate pick
    Coded { code: String, index: usize },
    /// Bare `DIGIT`
    Bare { index: usize },
}

/// Parse inbound text as a confirmation reply.
///
/// Anything that matches neither grammar is a fresh inbound message, not
/// a reply.
pub fn parse_reply(text: &str) -> Option<Reply> {
    let trimmed = text.trim();

    if let Some(caps) = CODED_REPLY.captures(trimmed) {
        let index: usize = caps[2].parse().ok()?;
        return Some(Reply::Coded {
            code: caps[1].to_string(),
            index,
        });
    }

    if let Some(caps) = BARE_REPLY.captures(trimmed) {
        let index: usize = caps[1].parse().ok()?;
        return Some(Reply::Bare { index });
    }

    None
}

/// Outcome of correlating one reply
#[derive(Debug)]
pub enum CorrelationOutcome {
    /// The reply selected a candidate; target advanced to `ready_for_fetch`
    Confirmed {
        target: InboundTarget,
        candidate: PlayerCandidate,
    },
    /// No pending confirmation matches; nothing changed
    NoMatch,
    /// More than one pending confirmation could be meant; nothing changed,
    /// sender is asked for the coded form
    AmbiguousPending,
    /// Index out of range for the stored candidate list; nothing changed
    InvalidSelection,
}

/// Correlates confirmation replies with pending targets
pub struct ConfirmationCorrelator {
    targets: TargetStore,
    messages: MessageStore,
}

impl ConfirmationCorrelator {
    pub fn new(targets: TargetStore, messages: MessageStore) -> Self {
        Self { targets, messages }
    }

    /// Correlate one reply for a tenant. On a valid single match the chosen
    /// candidate is adopted and an audit message row is appended; every
    /// other outcome leaves all state untouched.
    pub async fn correlate(
        &self,
        tenant_id: Uuid,
        from_phone: &str,
        raw_text: &str,
        reply: &Reply,
    ) -> Result<CorrelationOutcome> {
        let (target, index) = match reply {
            Reply::Coded { code, index } => {
                let mut hits = self.targets.find_confirmations_by_code(tenant_id, code).await?;
                match hits.len() {
                    0 => {
                        tracing::info!(tenant_id = %tenant_id, code = %code, "No confirmation target for code");
                        return Ok(CorrelationOutcome::NoMatch);
                    }
                    1 => (hits.remove(0), *index),
                    // Prefix collision: a distinct outcome from "no match"
                    _ => {
                        tracing::warn!(tenant_id = %tenant_id, code = %code, hits = hits.len(), "Confirmation code prefix collision");
                        return Ok(CorrelationOutcome::AmbiguousPending);
                    }
                }
            }
            Reply::Bare { index } => {
                let mut pending = self.targets.pending_confirmations(tenant_id, 2).await?;
                match pending.len() {
                    0 => return Ok(CorrelationOutcome::NoMatch),
                    1 => (pending.remove(0), *index),
                    _ => return Ok(CorrelationOutcome::AmbiguousPending),
                }
            }
        };

        let candidate = match target.candidate_at(index) {
            Some(candidate) => candidate.clone(),
            None => {
                tracing::info!(target_id = %target.id, index, "Confirmation index out of range");
                return Ok(CorrelationOutcome::InvalidSelection);
            }
        };

        let adopted = self
            .targets
            .mark_ready_for_fetch(
                target.id,
                TargetStatus::NeedsConfirmation,
                candidate.sportmonks_id,
                &candidate.display_name,
            )
            .await?;

        if !adopted {
            // The target moved under us (expired or raced); treat as gone
            return Ok(CorrelationOutcome::NoMatch);
        }

        // Audit row for every correlator invocation that changed state
        let audit = InboundMessage::new(tenant_id, from_phone, raw_text, None, Some(target.id));
        self.messages.insert(&audit).await?;

        tracing::info!(
            target_id = %target.id,
            player_id = candidate.sportmonks_id,
            player = %candidate.display_name,
            "Confirmation adopted candidate"
        );

        let target = self
            .targets
            .get(target.id)
            .await?
            .unwrap_or(target);

        Ok(CorrelationOutcome::Confirmed { target, candidate })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[test]
    fn parses_coded_replies() {
        assert_eq!(
            parse_reply("abc123 2"),
            Some(Reply::Coded { code: "abc123".to_string(), index: 2 })
        );
        assert_eq!(
            parse_reply("  ABC123   5  "),
            Some(Reply::Coded { code: "ABC123".to_string(), index: 5 })
        );
    }

    #[test]
    fn parses_bare_replies() {
        assert_eq!(parse_reply("3"), Some(Reply::Bare { index: 3 }));
        assert_eq!(parse_reply(" 1 "), Some(Reply::Bare { index: 1 }));
    }

    #[test]
    fn rejects_everything_else() {
        assert_eq!(parse_reply("6"), None);
        assert_eq!(parse_reply("0"), None);
        assert_eq!(parse_reply("abc12 2"), None);
        assert_eq!(parse_reply("abc1234 2"), None);
        assert_eq!(parse_reply("abc123 6"), None);
        assert_eq!(parse_reply("have a look at this player"), None);
        assert_eq!(parse_reply(""), None);
    }

    async fn setup() -> (ConfirmationCorrelator, TargetStore, Uuid, InboundTarget) {
        let pool = test_pool().await;
        let targets = TargetStore::new(pool.clone());
        let messages = MessageStore::new(pool);
        let tenant = Uuid::new_v4();

        let target = targets
            .create(tenant, "https://www.transfermarkt.com/john-doe/profil/spieler/123456")
            .await
            .unwrap();
        targets.begin_resolve(&target).await.unwrap();
        targets
            .mark_needs_confirmation(
                target.id,
                &[
                    PlayerCandidate {
                        sportmonks_id: 11,
                        display_name: "John Doe".to_string(),
                        club_name: Some("FC Example".to_string()),
                        similarity: 0.9,
                    },
                    PlayerCandidate {
                        sportmonks_id: 22,
                        display_name: "Jon Doe".to_string(),
                        club_name: None,
                        similarity: 0.8,
                    },
                ],
            )
            .await
            .unwrap();

        let target = targets.get(target.id).await.unwrap().unwrap();
        let correlator = ConfirmationCorrelator::new(targets.clone(), messages);
        (correlator, targets, tenant, target)
    }

    #[tokio::test]
    async fn coded_reply_adopts_selected_candidate() {
        let (correlator, targets, tenant, target) = setup().await;
        let code = target.confirmation_code().to_lowercase();

        let reply = parse_reply(&format!("{} 2", code)).unwrap();
        let outcome = correlator
            .correlate(tenant, "+491701111111", &format!("{} 2", code), &reply)
            .await
            .unwrap();

        match outcome {
            CorrelationOutcome::Confirmed { candidate, .. } => {
                assert_eq!(candidate.sportmonks_id, 22);
            }
            other => panic!("expected Confirmed, got {:?}", other),
        }

        let target = targets.get(target.id).await.unwrap().unwrap();
        assert_eq!(target.status, TargetStatus::ReadyForFetch);
        assert_eq!(target.sportmonks_player_id, Some(22));
    }

    #[tokio::test]
    async fn unknown_code_is_no_match_and_mutates_nothing() {
        let (correlator, targets, tenant, target) = setup().await;

        let reply = Reply::Coded { code: "zzzzzz".to_string(), index: 1 };
        let outcome = correlator
            .correlate(tenant, "+49170", "zzzzzz 1", &reply)
            .await
            .unwrap();
        assert!(matches!(outcome, CorrelationOutcome::NoMatch));

        let target = targets.get(target.id).await.unwrap().unwrap();
        assert_eq!(target.status, TargetStatus::NeedsConfirmation);
    }

    #[tokio::test]
    async fn out_of_range_index_is_rejected_without_mutation() {
        let (correlator, targets, tenant, target) = setup().await;
        let code = target.confirmation_code();

        let reply = Reply::Coded { code, index: 5 };
        let outcome = correlator
            .correlate(tenant, "+49170", "x", &reply)
            .await
            .unwrap();
        assert!(matches!(outcome, CorrelationOutcome::InvalidSelection));

        let target = targets.get(target.id).await.unwrap().unwrap();
        assert_eq!(target.status, TargetStatus::NeedsConfirmation);
    }

    #[tokio::test]
    async fn bare_reply_works_with_a_single_pending_confirmation() {
        let (correlator, targets, tenant, target) = setup().await;

        let outcome = correlator
            .correlate(tenant, "+49170", "1", &Reply::Bare { index: 1 })
            .await
            .unwrap();
        assert!(matches!(outcome, CorrelationOutcome::Confirmed { .. }));

        let target = targets.get(target.id).await.unwrap().unwrap();
        assert_eq!(target.sportmonks_player_id, Some(11));
    }

    #[tokio::test]
    async fn bare_reply_with_two_pending_is_ambiguous() {
        let (correlator, targets, tenant, _target) = setup().await;

        // Second pending confirmation for the same tenant
        let second = targets
            .create(tenant, "https://www.transfermarkt.com/j-doe/profil/spieler/7")
            .await
            .unwrap();
        targets.begin_resolve(&second).await.unwrap();
        targets
            .mark_needs_confirmation(
                second.id,
                &[PlayerCandidate {
                    sportmonks_id: 33,
                    display_name: "J Doe".to_string(),
                    club_name: None,
                    similarity: 0.7,
                }],
            )
            .await
            .unwrap();

        let outcome = correlator
            .correlate(tenant, "+49170", "1", &Reply::Bare { index: 1 })
            .await
            .unwrap();
        assert!(matches!(outcome, CorrelationOutcome::AmbiguousPending));
    }

    #[tokio::test]
    async fn bare_reply_with_none_pending_is_no_match() {
        let pool = test_pool().await;
        let correlator = ConfirmationCorrelator::new(
            TargetStore::new(pool.clone()),
            MessageStore::new(pool),
        );

        let outcome = correlator
            .correlate(Uuid::new_v4(), "+49170", "1", &Reply::Bare { index: 1 })
            .await
            .unwrap();
        assert!(matches!(outcome, CorrelationOutcome::NoMatch));
    }

    #[tokio::test]
    async fn confirmation_appends_audit_message() {
        let (correlator, _targets, tenant, target) = setup().await;
        let pool_messages = correlator.messages.clone();

        let outcome = correlator
            .correlate(tenant, "+49170", "1", &Reply::Bare { index: 1 })
            .await
            .unwrap();
        assert!(matches!(outcome, CorrelationOutcome::Confirmed { .. }));

        let audit = pool_messages.list_for_target(target.id).await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].body, "1");
    }
}
