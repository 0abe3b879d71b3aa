//! Target store: persistence and state machine enforcement
//!
//! All status transitions go through this store as guarded single-row
//! conditional updates (`WHERE id = ? AND status = ? AND <counter> = ?`).
//! A second worker run racing on the same row sees zero rows affected and
//! skips it, which is the only cross-invocation race in the design.

use chrono::{DateTime, Duration, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use scoutlink_common::{Error, Result};

use crate::models::target::MAX_ATTEMPTS;
use crate::models::{InboundTarget, PlayerCandidate, TargetStatus};

/// Outcome of claiming a target for a resolve or fetch step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Attempt counter consumed, caller should perform the step
    Admitted,
    /// Attempt budget already exhausted; target moved to failed
    BudgetExhausted,
    /// Another runner claimed the row first; skip without side effects
    Lost,
}

/// Repository for inbound targets
#[derive(Clone)]
pub struct TargetStore {
    db: SqlitePool,
}

impl TargetStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a new target in `received`.
    ///
    /// Rejected with [`Error::DuplicateTarget`] when an active (non-terminal)
    /// target already exists for the same (tenant, url); a partial unique
    /// index backs this even under concurrent inserts.
    pub async fn create(&self, tenant_id: Uuid, source_url: &str) -> Result<InboundTarget> {
        let now = Utc::now();
        let id = Uuid::new_v4();

        let result = sqlx::query(
            r#"
            INSERT INTO inbound_targets (id, tenant_id, source_url, status, created_at, updated_at)
            VALUES (?, ?, ?, 'received', ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(tenant_id.to_string())
        .bind(source_url)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await;

        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(Error::DuplicateTarget(source_url.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(target_id = %id, tenant_id = %tenant_id, url = %source_url, "Created inbound target");

        self.get(id)
            .await?
            .ok_or_else(|| Error::Internal("Target vanished after insert".to_string()))
    }

    /// Load a target by id
    pub async fn get(&self, id: Uuid) -> Result<Option<InboundTarget>> {
        let row = sqlx::query("SELECT * FROM inbound_targets WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.db)
            .await?;

        row.map(target_from_row).transpose()
    }

    /// Find the active (non-terminal) target for a (tenant, url), if any
    pub async fn find_active_by_url(
        &self,
        tenant_id: Uuid,
        source_url: &str,
    ) -> Result<Option<InboundTarget>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM inbound_targets
            WHERE tenant_id = ? AND source_url = ?
              AND status NOT IN ('ready', 'failed')
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(source_url)
        .fetch_optional(&self.db)
        .await?;

        row.map(target_from_row).transpose()
    }

    /// Select the batch of targets due for a worker pass, oldest first.
    ///
    /// Due means: freshly `received`, or `resolving` gone stale (abandoned
    /// by a crashed run), or `ready_for_fetch`. Rows with an exhausted
    /// budget are still selected so the next claim can move them to
    /// `failed` instead of leaving them stuck forever; this matters when a
    /// run dies between consuming the final attempt and writing the
    /// outcome.
    pub async fn find_due(
        &self,
        now: DateTime<Utc>,
        staleness_minutes: i64,
        limit: i64,
    ) -> Result<Vec<InboundTarget>> {
        let stale_cutoff = (now - Duration::minutes(staleness_minutes)).to_rfc3339();

        let rows = sqlx::query(
            r#"
            SELECT * FROM inbound_targets
            WHERE status = 'received'
               OR (status = 'resolving' AND last_attempt_at < ?)
               OR (status = 'ready_for_fetch' AND fetch_attempts <= ?)
            ORDER BY created_at ASC
            LIMIT ?
            "#,
        )
        .bind(&stale_cutoff)
        .bind(MAX_ATTEMPTS)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(target_from_row).collect()
    }

    /// Claim a target for a resolution step, consuming one resolve attempt.
    ///
    /// When the budget is already spent the claim instead moves the target
    /// to `failed` with reason "resolution attempts exceeded", without
    /// performing the step.
    pub async fn begin_resolve(&self, target: &InboundTarget) -> Result<Admission> {
        if !matches!(target.status, TargetStatus::Received | TargetStatus::Resolving) {
            return Ok(Admission::Lost);
        }
        let now = Utc::now().to_rfc3339();

        if target.resolve_attempts >= MAX_ATTEMPTS {
            let result = sqlx::query(
                r#"
                UPDATE inbound_targets
                SET status = 'failed', last_error = 'resolution attempts exceeded', updated_at = ?
                WHERE id = ? AND status = ? AND resolve_attempts = ?
                "#,
            )
            .bind(&now)
            .bind(target.id.to_string())
            .bind(target.status.as_str())
            .bind(target.resolve_attempts)
            .execute(&self.db)
            .await?;

            return Ok(if result.rows_affected() == 1 {
                Admission::BudgetExhausted
            } else {
                Admission::Lost
            });
        }

        let result = sqlx::query(
            r#"
            UPDATE inbound_targets
            SET status = 'resolving', resolve_attempts = resolve_attempts + 1,
                last_attempt_at = ?, updated_at = ?
            WHERE id = ? AND status = ? AND resolve_attempts = ?
            "#,
        )
        .bind(&now)
        .bind(&now)
        .bind(target.id.to_string())
        .bind(target.status.as_str())
        .bind(target.resolve_attempts)
        .execute(&self.db)
        .await?;

        Ok(if result.rows_affected() == 1 {
            Admission::Admitted
        } else {
            Admission::Lost
        })
    }

    /// Claim a target for a fetch step, consuming one fetch attempt.
    ///
    /// Same cap-of-3 discipline as [`begin_resolve`](Self::begin_resolve),
    /// on the independent `fetch_attempts` counter.
    pub async fn begin_fetch(&self, target: &InboundTarget) -> Result<Admission> {
        if target.status != TargetStatus::ReadyForFetch {
            return Ok(Admission::Lost);
        }
        let now = Utc::now().to_rfc3339();

        if target.fetch_attempts >= MAX_ATTEMPTS {
            let result = sqlx::query(
                r#"
                UPDATE inbound_targets
                SET status = 'failed', last_error = 'fetch attempts exceeded', updated_at = ?
                WHERE id = ? AND status = 'ready_for_fetch' AND fetch_attempts = ?
                "#,
            )
            .bind(&now)
            .bind(target.id.to_string())
            .bind(target.fetch_attempts)
            .execute(&self.db)
            .await?;

            return Ok(if result.rows_affected() == 1 {
                Admission::BudgetExhausted
            } else {
                Admission::Lost
            });
        }

        let result = sqlx::query(
            r#"
            UPDATE inbound_targets
            SET fetch_attempts = fetch_attempts + 1, last_attempt_at = ?, updated_at = ?
            WHERE id = ? AND status = 'ready_for_fetch' AND fetch_attempts = ?
            "#,
        )
        .bind(&now)
        .bind(&now)
        .bind(target.id.to_string())
        .bind(target.fetch_attempts)
        .execute(&self.db)
        .await?;

        Ok(if result.rows_affected() == 1 {
            Admission::Admitted
        } else {
            Admission::Lost
        })
    }

    /// Record a resolved player identity and advance to `ready_for_fetch`.
    ///
    /// Valid from `resolving` (strong candidate) and from
    /// `needs_confirmation` (human confirmed). Clears candidates and
    /// `last_error`.
    pub async fn mark_ready_for_fetch(
        &self,
        id: Uuid,
        from: TargetStatus,
        sportmonks_player_id: i64,
        player_name: &str,
    ) -> Result<bool> {
        self.check_transition(from, TargetStatus::ReadyForFetch)?;

        let result = sqlx::query(
            r#"
            UPDATE inbound_targets
            SET status = 'ready_for_fetch', sportmonks_player_id = ?, resolved_player_name = ?,
                candidates = NULL, last_error = NULL, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(sportmonks_player_id)
        .bind(player_name)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .bind(from.as_str())
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Store the candidate list and advance to `needs_confirmation`
    pub async fn mark_needs_confirmation(
        &self,
        id: Uuid,
        candidates: &[PlayerCandidate],
    ) -> Result<bool> {
        self.check_transition(TargetStatus::Resolving, TargetStatus::NeedsConfirmation)?;

        let candidates_json = serde_json::to_string(candidates)
            .map_err(|e| Error::Internal(format!("Failed to serialize candidates: {}", e)))?;

        let result = sqlx::query(
            r#"
            UPDATE inbound_targets
            SET status = 'needs_confirmation', candidates = ?, last_error = NULL, updated_at = ?
            WHERE id = ? AND status = 'resolving'
            "#,
        )
        .bind(&candidates_json)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Return a `resolving` target to `received` after a transient resolver
    /// error, keeping the consumed attempt and recording the error
    pub async fn requeue_after_resolver_error(&self, id: Uuid, error: &str) -> Result<bool> {
        self.check_transition(TargetStatus::Resolving, TargetStatus::Received)?;

        let result = sqlx::query(
            r#"
            UPDATE inbound_targets
            SET status = 'received', last_error = ?, updated_at = ?
            WHERE id = ? AND status = 'resolving'
            "#,
        )
        .bind(error)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Record a fetch error without leaving `ready_for_fetch`; the target
    /// stays due until its fetch budget runs out
    pub async fn record_fetch_error(&self, id: Uuid, error: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE inbound_targets
            SET last_error = ?, updated_at = ?
            WHERE id = ? AND status = 'ready_for_fetch'
            "#,
        )
        .bind(error)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Terminal success: the player record has been materialized
    pub async fn mark_ready(&self, id: Uuid) -> Result<bool> {
        self.check_transition(TargetStatus::ReadyForFetch, TargetStatus::Ready)?;

        let result = sqlx::query(
            r#"
            UPDATE inbound_targets
            SET status = 'ready', last_error = NULL, updated_at = ?
            WHERE id = ? AND status = 'ready_for_fetch'
            "#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Terminal failure with a reason
    pub async fn mark_failed(&self, id: Uuid, from: TargetStatus, reason: &str) -> Result<bool> {
        self.check_transition(from, TargetStatus::Failed)?;

        let result = sqlx::query(
            r#"
            UPDATE inbound_targets
            SET status = 'failed', last_error = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(reason)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .bind(from.as_str())
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Most recently updated `needs_confirmation` targets for a tenant.
    ///
    /// The bare-digit reply path only ever looks at the top two.
    pub async fn pending_confirmations(
        &self,
        tenant_id: Uuid,
        limit: i64,
    ) -> Result<Vec<InboundTarget>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM inbound_targets
            WHERE tenant_id = ? AND status = 'needs_confirmation'
            ORDER BY updated_at DESC
            LIMIT ?
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(target_from_row).collect()
    }

    /// Pending confirmations whose id starts with the given 6-character
    /// code, case-insensitively. More than one row means a prefix collision.
    pub async fn find_confirmations_by_code(
        &self,
        tenant_id: Uuid,
        code: &str,
    ) -> Result<Vec<InboundTarget>> {
        let prefix = code.to_lowercase();

        let rows = sqlx::query(
            r#"
            SELECT * FROM inbound_targets
            WHERE tenant_id = ? AND status = 'needs_confirmation'
              AND substr(id, 1, 6) = ?
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(&prefix)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(target_from_row).collect()
    }

    /// Fail `needs_confirmation` targets that were never answered.
    ///
    /// Returns the number of targets expired.
    pub async fn expire_stale_confirmations(
        &self,
        now: DateTime<Utc>,
        expiry_hours: i64,
    ) -> Result<u64> {
        let cutoff = (now - Duration::hours(expiry_hours)).to_rfc3339();

        let result = sqlx::query(
            r#"
            UPDATE inbound_targets
            SET status = 'failed', last_error = 'confirmation timed out', updated_at = ?
            WHERE status = 'needs_confirmation' AND updated_at < ?
            "#,
        )
        .bind(now.to_rfc3339())
        .bind(&cutoff)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Recent targets, newest first, optionally scoped to one tenant
    pub async fn list_recent(
        &self,
        tenant_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<InboundTarget>> {
        let rows = match tenant_id {
            Some(tenant) => {
                sqlx::query(
                    "SELECT * FROM inbound_targets WHERE tenant_id = ? ORDER BY created_at DESC LIMIT ?",
                )
                .bind(tenant.to_string())
                .bind(limit)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query("SELECT * FROM inbound_targets ORDER BY created_at DESC LIMIT ?")
                    .bind(limit)
                    .fetch_all(&self.db)
                    .await?
            }
        };

        rows.into_iter().map(target_from_row).collect()
    }

    /// Count of non-terminal targets, logged at startup
    pub async fn count_in_flight(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM inbound_targets WHERE status NOT IN ('ready', 'failed')",
        )
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    fn check_transition(&self, from: TargetStatus, to: TargetStatus) -> Result<()> {
        if from.can_transition(to) {
            Ok(())
        } else {
            Err(Error::Internal(format!(
                "Illegal target transition {} -> {}",
                from, to
            )))
        }
    }
}

/// Map a database row to an [`InboundTarget`]
fn target_from_row(row: SqliteRow) -> Result<InboundTarget> {
    let id_str: String = row.get("id");
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| Error::Internal(format!("Invalid target id in database: {}", e)))?;

    let tenant_str: String = row.get("tenant_id");
    let tenant_id = Uuid::parse_str(&tenant_str)
        .map_err(|e| Error::Internal(format!("Invalid tenant id in database: {}", e)))?;

    let status_str: String = row.get("status");
    let status = TargetStatus::parse(&status_str)
        .ok_or_else(|| Error::Internal(format!("Unknown target status '{}'", status_str)))?;

    let candidates: Option<String> = row.get("candidates");
    let candidates = candidates
        .map(|json| serde_json::from_str::<Vec<PlayerCandidate>>(&json))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to deserialize candidates: {}", e)))?;

    let last_attempt_at: Option<String> = row.get("last_attempt_at");
    let last_attempt_at = last_attempt_at.as_deref().map(super::parse_ts).transpose()?;

    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(InboundTarget {
        id,
        tenant_id,
        source_url: row.get("source_url"),
        status,
        sportmonks_player_id: row.get("sportmonks_player_id"),
        resolved_player_name: row.get("resolved_player_name"),
        candidates,
        resolve_attempts: row.get("resolve_attempts"),
        fetch_attempts: row.get("fetch_attempts"),
        last_error: row.get("last_error"),
        last_attempt_at,
        created_at: super::parse_ts(&created_at)?,
        updated_at: super::parse_ts(&updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    const URL: &str = "https://www.transfermarkt.com/john-doe/profil/spieler/123456";

    async fn store() -> TargetStore {
        TargetStore::new(test_pool().await)
    }

    fn sample_candidates() -> Vec<PlayerCandidate> {
        vec![
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
        ]
    }

    #[tokio::test]
    async fn create_rejects_second_active_target_for_same_url() {
        let store = store().await;
        let tenant = Uuid::new_v4();

        let winner = store.create(tenant, URL).await.unwrap();
        let err = store.create(tenant, URL).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateTarget(_)));

        // The loser of the race can still look up who won
        let active = store.find_active_by_url(tenant, URL).await.unwrap().unwrap();
        assert_eq!(active.id, winner.id);

        // A different tenant is unaffected
        store.create(Uuid::new_v4(), URL).await.unwrap();
    }

    #[tokio::test]
    async fn create_allows_new_target_once_previous_is_terminal() {
        let store = store().await;
        let tenant = Uuid::new_v4();

        let first = store.create(tenant, URL).await.unwrap();
        assert_eq!(store.begin_resolve(&first).await.unwrap(), Admission::Admitted);
        store
            .mark_failed(first.id, TargetStatus::Resolving, "no candidates")
            .await
            .unwrap();

        store.create(tenant, URL).await.unwrap();
    }

    #[tokio::test]
    async fn find_due_selects_received_and_skips_young_resolving() {
        let store = store().await;
        let tenant = Uuid::new_v4();
        let target = store.create(tenant, URL).await.unwrap();

        let due = store.find_due(Utc::now(), 10, 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, target.id);

        // Claimed a moment ago: no longer due
        store.begin_resolve(&target).await.unwrap();
        let due = store.find_due(Utc::now(), 10, 10).await.unwrap();
        assert!(due.is_empty());

        // But it becomes due again once the staleness window has passed
        let due = store
            .find_due(Utc::now() + Duration::minutes(11), 10, 10)
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].status, TargetStatus::Resolving);
    }

    #[tokio::test]
    async fn begin_resolve_increments_and_fails_on_exhausted_budget() {
        let store = store().await;
        let tenant = Uuid::new_v4();
        let mut target = store.create(tenant, URL).await.unwrap();

        for expected_attempts in 1..=MAX_ATTEMPTS {
            assert_eq!(store.begin_resolve(&target).await.unwrap(), Admission::Admitted);
            target = store.get(target.id).await.unwrap().unwrap();
            assert_eq!(target.resolve_attempts, expected_attempts);
            store
                .requeue_after_resolver_error(target.id, "search unavailable")
                .await
                .unwrap();
            target = store.get(target.id).await.unwrap().unwrap();
        }

        // Fourth claim consumes no attempt and fails the target
        assert_eq!(
            store.begin_resolve(&target).await.unwrap(),
            Admission::BudgetExhausted
        );
        let target = store.get(target.id).await.unwrap().unwrap();
        assert_eq!(target.status, TargetStatus::Failed);
        assert_eq!(target.resolve_attempts, MAX_ATTEMPTS);
        assert_eq!(target.last_error.as_deref(), Some("resolution attempts exceeded"));
    }

    #[tokio::test]
    async fn begin_resolve_with_stale_snapshot_loses_the_row() {
        let store = store().await;
        let tenant = Uuid::new_v4();
        let target = store.create(tenant, URL).await.unwrap();

        assert_eq!(store.begin_resolve(&target).await.unwrap(), Admission::Admitted);
        // Second claim with the same pre-claim snapshot must lose
        assert_eq!(store.begin_resolve(&target).await.unwrap(), Admission::Lost);
    }

    #[tokio::test]
    async fn fetch_attempts_are_counted_independently() {
        let store = store().await;
        let tenant = Uuid::new_v4();
        let target = store.create(tenant, URL).await.unwrap();

        store.begin_resolve(&target).await.unwrap();
        store
            .mark_ready_for_fetch(target.id, TargetStatus::Resolving, 11, "John Doe")
            .await
            .unwrap();

        let mut target = store.get(target.id).await.unwrap().unwrap();
        assert_eq!(target.resolve_attempts, 1);

        for _ in 0..MAX_ATTEMPTS {
            assert_eq!(store.begin_fetch(&target).await.unwrap(), Admission::Admitted);
            store.record_fetch_error(target.id, "failed to fetch player").await.unwrap();
            target = store.get(target.id).await.unwrap().unwrap();
        }

        assert_eq!(target.fetch_attempts, MAX_ATTEMPTS);
        assert_eq!(
            store.begin_fetch(&target).await.unwrap(),
            Admission::BudgetExhausted
        );
        let target = store.get(target.id).await.unwrap().unwrap();
        assert_eq!(target.status, TargetStatus::Failed);
        assert_eq!(target.last_error.as_deref(), Some("fetch attempts exceeded"));
    }

    #[tokio::test]
    async fn exhausted_ready_for_fetch_stays_due_until_failed() {
        let store = store().await;
        let tenant = Uuid::new_v4();
        let target = store.create(tenant, URL).await.unwrap();

        store.begin_resolve(&target).await.unwrap();
        store
            .mark_ready_for_fetch(target.id, TargetStatus::Resolving, 11, "John Doe")
            .await
            .unwrap();

        // Claim without ever writing an outcome, as if each run died
        // mid-fetch; the row ends up at the cap but still non-terminal
        let mut target = store.get(target.id).await.unwrap().unwrap();
        for _ in 0..MAX_ATTEMPTS {
            store.begin_fetch(&target).await.unwrap();
            target = store.get(target.id).await.unwrap().unwrap();
        }
        assert_eq!(target.status, TargetStatus::ReadyForFetch);
        assert_eq!(target.fetch_attempts, MAX_ATTEMPTS);

        // Still selected so the next claim can terminate it
        let due = store.find_due(Utc::now() + Duration::minutes(11), 10, 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, target.id);

        assert_eq!(
            store.begin_fetch(&due[0]).await.unwrap(),
            Admission::BudgetExhausted
        );
        let target = store.get(target.id).await.unwrap().unwrap();
        assert_eq!(target.status, TargetStatus::Failed);
        assert_eq!(target.last_error.as_deref(), Some("fetch attempts exceeded"));

        let due = store.find_due(Utc::now() + Duration::minutes(11), 10, 10).await.unwrap();
        assert!(due.is_empty());
    }

    #[tokio::test]
    async fn adoption_clears_candidates_and_error() {
        let store = store().await;
        let tenant = Uuid::new_v4();
        let target = store.create(tenant, URL).await.unwrap();

        store.begin_resolve(&target).await.unwrap();
        store
            .mark_needs_confirmation(target.id, &sample_candidates())
            .await
            .unwrap();

        let target = store.get(target.id).await.unwrap().unwrap();
        assert_eq!(target.status, TargetStatus::NeedsConfirmation);
        assert_eq!(target.candidates.as_ref().unwrap().len(), 2);

        store
            .mark_ready_for_fetch(target.id, TargetStatus::NeedsConfirmation, 22, "Jon Doe")
            .await
            .unwrap();

        let target = store.get(target.id).await.unwrap().unwrap();
        assert_eq!(target.status, TargetStatus::ReadyForFetch);
        assert_eq!(target.sportmonks_player_id, Some(22));
        assert_eq!(target.resolved_player_name.as_deref(), Some("Jon Doe"));
        assert!(target.candidates.is_none());
        assert!(target.last_error.is_none());
    }

    #[tokio::test]
    async fn code_lookup_matches_prefix_case_insensitively() {
        let store = store().await;
        let tenant = Uuid::new_v4();
        let target = store.create(tenant, URL).await.unwrap();

        store.begin_resolve(&target).await.unwrap();
        store
            .mark_needs_confirmation(target.id, &sample_candidates())
            .await
            .unwrap();

        let code = store
            .get(target.id)
            .await
            .unwrap()
            .unwrap()
            .confirmation_code();

        let hits = store
            .find_confirmations_by_code(tenant, &code.to_lowercase())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, target.id);

        // Wrong tenant: no hit
        let hits = store
            .find_confirmations_by_code(Uuid::new_v4(), &code)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn stale_confirmations_expire() {
        let store = store().await;
        let tenant = Uuid::new_v4();
        let target = store.create(tenant, URL).await.unwrap();

        store.begin_resolve(&target).await.unwrap();
        store
            .mark_needs_confirmation(target.id, &sample_candidates())
            .await
            .unwrap();

        let expired = store
            .expire_stale_confirmations(Utc::now(), 72)
            .await
            .unwrap();
        assert_eq!(expired, 0);

        let expired = store
            .expire_stale_confirmations(Utc::now() + Duration::hours(73), 72)
            .await
            .unwrap();
        assert_eq!(expired, 1);

        let target = store.get(target.id).await.unwrap().unwrap();
        assert_eq!(target.status, TargetStatus::Failed);
        assert_eq!(target.last_error.as_deref(), Some("confirmation timed out"));
    }

    #[tokio::test]
    async fn illegal_transition_is_rejected_before_touching_the_row() {
        let store = store().await;
        let tenant = Uuid::new_v4();
        let target = store.create(tenant, URL).await.unwrap();

        let err = store
            .mark_ready_for_fetch(target.id, TargetStatus::Received, 11, "John Doe")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }
}
