//! Resolution worker
//!
//! Stateless orchestrator invoked on a schedule (or on demand). Each
//! invocation pulls a bounded batch of due targets and advances every one
//! exactly one step, strictly sequentially. A failure for one target never
//! aborts the rest of the batch.

use chrono::Utc;
use std::sync::Arc;

use scoutlink_common::Result;

use crate::db::{Admission, MessageStore, PlayerStore, TargetStore};
use crate::models::target::MAX_ATTEMPTS;
use crate::models::{InboundTarget, TargetStatus};
use crate::services::candidate_resolver::{CandidateResolver, ResolutionOutcome};
use crate::services::materializer::PlayerMaterializer;
use crate::services::messaging::{send_best_effort, texts, MessagingGateway};
use crate::services::sportmonks_client::PlayerDirectory;

/// Tunables for one worker instance
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    /// Minutes before an in-flight `resolving` row is considered abandoned
    pub staleness_minutes: i64,
    /// Hours before an unanswered confirmation is failed
    pub confirmation_expiry_hours: i64,
    /// Maximum targets advanced per invocation
    pub batch_size: i64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            staleness_minutes: 10,
            confirmation_expiry_hours: 72,
            batch_size: 10,
        }
    }
}

/// The pipeline orchestrator
pub struct ResolutionWorker {
    targets: TargetStore,
    messages: MessageStore,
    resolver: CandidateResolver,
    materializer: PlayerMaterializer,
    gateway: Arc<dyn MessagingGateway>,
    settings: WorkerSettings,
}

impl ResolutionWorker {
    pub fn new(
        db: sqlx::SqlitePool,
        directory: Arc<dyn PlayerDirectory>,
        gateway: Arc<dyn MessagingGateway>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            targets: TargetStore::new(db.clone()),
            messages: MessageStore::new(db.clone()),
            resolver: CandidateResolver::new(directory.clone()),
            materializer: PlayerMaterializer::new(directory, PlayerStore::new(db)),
            gateway,
            settings,
        }
    }

    /// One worker pass. Returns the number of targets touched.
    pub async fn run_once(&self) -> Result<usize> {
        let now = Utc::now();

        let expired = self
            .targets
            .expire_stale_confirmations(now, self.settings.confirmation_expiry_hours)
            .await?;
        if expired > 0 {
            tracing::info!(expired, "Expired unanswered confirmation targets");
        }

        let due = self
            .targets
            .find_due(now, self.settings.staleness_minutes, self.settings.batch_size)
            .await?;

        tracing::debug!(due = due.len(), "Worker pass selected due targets");

        let mut touched = 0;
        for target in due {
            let result = match target.status {
                TargetStatus::Received | TargetStatus::Resolving => {
                    self.step_resolve(&target).await
                }
                TargetStatus::ReadyForFetch => self.step_fetch(&target).await,
                other => {
                    tracing::warn!(target_id = %target.id, status = %other, "Due query returned unexpected status");
                    Ok(false)
                }
            };

            match result {
                Ok(true) => touched += 1,
                Ok(false) => {}
                // Absorbed: one broken target must not starve the batch
                Err(e) => {
                    tracing::error!(target_id = %target.id, error = %e, "Worker step failed");
                }
            }
        }

        tracing::info!(touched, "Worker pass complete");

        Ok(touched)
    }

    /// Advance a `received` (or reclaimed stale `resolving`) target one step
    async fn step_resolve(&self, target: &InboundTarget) -> Result<bool> {
        match self.targets.begin_resolve(target).await? {
            Admission::Lost => return Ok(false),
            Admission::BudgetExhausted => {
                tracing::warn!(target_id = %target.id, "Resolution attempt budget exhausted");
                self.notify_sender(target, texts::COULD_NOT_MATCH).await;
                return Ok(true);
            }
            Admission::Admitted => {}
        }

        let attempts_used = target.resolve_attempts + 1;

        match self.resolver.resolve(&target.source_url).await {
            ResolutionOutcome::Resolved {
                sportmonks_id,
                display_name,
            } => {
                self.targets
                    .mark_ready_for_fetch(
                        target.id,
                        TargetStatus::Resolving,
                        sportmonks_id,
                        &display_name,
                    )
                    .await?;
                tracing::info!(
                    target_id = %target.id,
                    player_id = sportmonks_id,
                    player = %display_name,
                    "Resolved to a strong candidate"
                );
            }
            ResolutionOutcome::Ambiguous { candidates } => {
                self.targets
                    .mark_needs_confirmation(target.id, &candidates)
                    .await?;
                let code = target.confirmation_code();
                tracing::info!(
                    target_id = %target.id,
                    candidates = candidates.len(),
                    code = %code,
                    "Ambiguous resolution, asking for confirmation"
                );
                self.notify_sender(target, &texts::confirmation_prompt(&code, &candidates))
                    .await;
            }
            ResolutionOutcome::Unmatched { reason } => {
                self.targets
                    .mark_failed(target.id, TargetStatus::Resolving, &reason)
                    .await?;
                tracing::info!(target_id = %target.id, reason = %reason, "Resolution failed definitively");
                self.notify_sender(target, texts::COULD_NOT_MATCH).await;
            }
            ResolutionOutcome::Errored { reason } => {
                if attempts_used >= MAX_ATTEMPTS {
                    self.targets
                        .mark_failed(
                            target.id,
                            TargetStatus::Resolving,
                            "resolution attempts exceeded",
                        )
                        .await?;
                    tracing::warn!(
                        target_id = %target.id,
                        attempts = attempts_used,
                        error = %reason,
                        "Resolution gave up after final attempt"
                    );
                    self.notify_sender(target, texts::COULD_NOT_MATCH).await;
                } else {
                    self.targets
                        .requeue_after_resolver_error(target.id, &reason)
                        .await?;
                    tracing::warn!(
                        target_id = %target.id,
                        attempts = attempts_used,
                        error = %reason,
                        "Transient resolver error, target requeued"
                    );
                }
            }
        }

        Ok(true)
    }

    /// Advance a `ready_for_fetch` target one step
    async fn step_fetch(&self, target: &InboundTarget) -> Result<bool> {
        match self.targets.begin_fetch(target).await? {
            Admission::Lost => return Ok(false),
            Admission::BudgetExhausted => {
                tracing::warn!(target_id = %target.id, "Fetch attempt budget exhausted");
                return Ok(true);
            }
            Admission::Admitted => {}
        }

        let player_id = match target.sportmonks_player_id {
            Some(id) => id,
            None => {
                self.targets
                    .mark_failed(target.id, TargetStatus::ReadyForFetch, "missing resolved player id")
                    .await?;
                return Ok(true);
            }
        };

        let attempts_used = target.fetch_attempts + 1;

        match self.materializer.materialize(target.tenant_id, player_id).await {
            Ok(_) => {
                self.targets.mark_ready(target.id).await?;
                tracing::info!(target_id = %target.id, player_id, "Target is ready");
            }
            Err(e) => {
                // Provider detail is logged only; the sender never sees it
                tracing::error!(target_id = %target.id, player_id, error = %e, "Player fetch failed");
                if attempts_used >= MAX_ATTEMPTS {
                    self.targets
                        .mark_failed(
                            target.id,
                            TargetStatus::ReadyForFetch,
                            "fetch attempts exceeded",
                        )
                        .await?;
                } else {
                    self.targets
                        .record_fetch_error(target.id, "failed to fetch player")
                        .await?;
                }
            }
        }

        Ok(true)
    }

    /// Best-effort notification to the scout who submitted the target
    async fn notify_sender(&self, target: &InboundTarget, body: &str) {
        match self.messages.sender_for_target(target.id).await {
            Ok(Some(phone)) => send_best_effort(self.gateway.as_ref(), &phone, body).await,
            Ok(None) => {
                tracing::warn!(target_id = %target.id, "No sender on record for target, skipping notification");
            }
            Err(e) => {
                tracing::warn!(target_id = %target.id, error = %e, "Failed to look up sender for notification");
            }
        }
    }
}
