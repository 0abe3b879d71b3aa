//! Inbound target model and status state machine
//!
//! An `InboundTarget` is one player link awaiting resolution to a canonical
//! player identity. Targets move through a closed state machine; the store
//! layer enforces the transitions listed in `TargetStatus::can_transition`,
//! so call sites never compare raw status strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resolution status of an inbound target
///
/// ```text
/// RECEIVED ──► RESOLVING ──► READY_FOR_FETCH ──► READY
///                  │               ▲    │
///                  ├──► NEEDS_CONFIRMATION
///                  │               │    │
///                  └───────────────┴────┴──► FAILED
/// ```
///
/// `Ready` and `Failed` are terminal; nothing transitions out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    /// Link received, not yet picked up by the worker
    Received,
    /// A worker has claimed the target and is querying the player database
    Resolving,
    /// Player identity confirmed, full record not yet materialized
    ReadyForFetch,
    /// Multiple candidates, waiting on a human reply
    NeedsConfirmation,
    /// Player record materialized
    Ready,
    /// Gave up (unsupported link, no match, or attempt budget exhausted)
    Failed,
}

impl TargetStatus {
    /// Stable string form used in the database status column
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetStatus::Received => "received",
            TargetStatus::Resolving => "resolving",
            TargetStatus::ReadyForFetch => "ready_for_fetch",
            TargetStatus::NeedsConfirmation => "needs_confirmation",
            TargetStatus::Ready => "ready",
            TargetStatus::Failed => "failed",
        }
    }

    /// Parse the database string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "received" => Some(TargetStatus::Received),
            "resolving" => Some(TargetStatus::Resolving),
            "ready_for_fetch" => Some(TargetStatus::ReadyForFetch),
            "needs_confirmation" => Some(TargetStatus::NeedsConfirmation),
            "ready" => Some(TargetStatus::Ready),
            "failed" => Some(TargetStatus::Failed),
            _ => None,
        }
    }

    /// Terminal states are retained for history and never leave
    pub fn is_terminal(&self) -> bool {
        matches!(self, TargetStatus::Ready | TargetStatus::Failed)
    }

    /// The legal transition table.
    ///
    /// `Resolving -> Received` is the retry path for transient resolver
    /// errors; `Resolving -> Resolving` covers re-claiming a stale row.
    pub fn can_transition(self, to: TargetStatus) -> bool {
        use TargetStatus::*;
        matches!(
            (self, to),
            (Received, Resolving)
                | (Received, Failed)
                | (Resolving, Received)
                | (Resolving, Resolving)
                | (Resolving, ReadyForFetch)
                | (Resolving, NeedsConfirmation)
                | (Resolving, Failed)
                | (NeedsConfirmation, ReadyForFetch)
                | (NeedsConfirmation, Failed)
                | (ReadyForFetch, Ready)
                | (ReadyForFetch, Failed)
        )
    }
}

impl std::fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate returned by the player database search.
///
/// Embedded in the target's `candidates` column (JSON) only while the
/// target sits in `NeedsConfirmation`; cleared on adoption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerCandidate {
    /// External player database id
    pub sportmonks_id: i64,
    /// Display name as returned by the search
    pub display_name: String,
    /// Current club, when the search result carried one
    pub club_name: Option<String>,
    /// Normalized similarity against the queried name (0.0 - 1.0)
    pub similarity: f64,
}

/// One player link awaiting resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundTarget {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Normalized https:// profile URL the scout sent
    pub source_url: String,
    pub status: TargetStatus,
    /// Chosen external player id, set on resolution or confirmation
    pub sportmonks_player_id: Option<i64>,
    /// Display name of the chosen player
    pub resolved_player_name: Option<String>,
    /// Ranked candidates, populated only while ambiguous
    pub candidates: Option<Vec<PlayerCandidate>>,
    pub resolve_attempts: i64,
    pub fetch_attempts: i64,
    pub last_error: Option<String>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InboundTarget {
    /// Short correlation code sent alongside a candidate list.
    ///
    /// First six hex characters of the target id, uppercased for display.
    /// Replies are matched against it case-insensitively.
    pub fn confirmation_code(&self) -> String {
        self.id.simple().to_string()[..6].to_uppercase()
    }

    /// Candidate at a 1-based index from a confirmation reply
    pub fn candidate_at(&self, index: usize) -> Option<&PlayerCandidate> {
        if index == 0 {
            return None;
        }
        self.candidates.as_ref()?.get(index - 1)
    }
}

/// Per-stage retry budget: an attempt counter reaching this value without
/// success forces the target to `Failed`.
pub const MAX_ATTEMPTS: i64 = 3;
