//! Account indexing cycle
//!
//! One cycle selects the accounts due for indexing, runs each one in turn
//! and applies the failure policy on errors. Accounts are independent: one
//! account's failure never stops the cycle, and `last_indexed_at` moves
//! only on success so a failed account stays due for the next cycle.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use cloudscout_common::EngineKind;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::IndexerConfig;
use crate::engine::{maintenance, security, unused};
use crate::error::IndexError;
use crate::notify::Notifier;
use crate::orchestrator::collect_snapshot;
use crate::policy::{self, AccountIndexState, FailureAction};
use crate::source::{AccountContext, DataSource};
use crate::store::{
    bump_failures, disable_account, due_accounts, mark_indexed, put_issue_report, put_snapshot,
    DbPool,
};

/// One account's failure inside a cycle
#[derive(Debug)]
pub struct CycleFailure {
    pub account_id: String,
    pub reason: String,
}

/// What one indexing cycle did
#[derive(Debug)]
pub struct CycleSummary {
    pub ran: usize,
    pub failures: Vec<CycleFailure>,
}

pub async fn run_indexing_cycle(
    pool: &DbPool,
    source: Arc<dyn DataSource>,
    notifier: &dyn Notifier,
    config: &IndexerConfig,
    batch_size: usize,
) -> Result<CycleSummary> {
    let cycle_id = Uuid::now_v7();
    let now = Utc::now();

    let due = due_accounts(pool, now, batch_size).await?;
    info!(cycle_id = %cycle_id, due = due.len(), "Starting indexing cycle");

    let mut failures = Vec::new();
    for state in &due {
        match index_account(pool, Arc::clone(&source), config, state).await {
            Ok(()) => {
                mark_indexed(pool, &state.account_id, now).await?;
                info!(account_id = %state.account_id, "Account indexed");
            }
            Err(error) => {
                apply_failure(pool, notifier, config, state, &error).await?;
                failures.push(CycleFailure {
                    account_id: state.account_id.clone(),
                    reason: error.to_string(),
                });
            }
        }
    }

    info!(
        cycle_id = %cycle_id,
        ran = due.len(),
        failed = failures.len(),
        "Indexing cycle finished"
    );
    Ok(CycleSummary {
        ran: due.len(),
        failures,
    })
}

/// Index a single account: fetch, analyze, persist.
///
/// The snapshot and all three reports are persisted before any fetch
/// failure is signalled, so a partial inventory still reaches storage.
async fn index_account(
    pool: &DbPool,
    source: Arc<dyn DataSource>,
    config: &IndexerConfig,
    state: &AccountIndexState,
) -> Result<(), IndexError> {
    let account = AccountContext {
        account_id: state.account_id.clone(),
        active_regions: state.active_regions.clone(),
    };
    let taken_at = Utc::now();

    let outcome = collect_snapshot(source, &account, config.worker_timeout(), taken_at).await;

    let unused_report = unused::evaluate(&outcome.snapshot, &config.rules, taken_at);
    let security_report = security::evaluate(&outcome.snapshot, &config.rules);
    let maintenance_report = maintenance::evaluate(&outcome.snapshot);

    put_snapshot(pool, &outcome.snapshot, outcome.success())
        .await
        .map_err(IndexError::Persistence)?;
    for (engine, report) in [
        (EngineKind::UnusedResources, &unused_report),
        (EngineKind::SecurityIssues, &security_report),
        (EngineKind::Maintenance, &maintenance_report),
    ] {
        put_issue_report(pool, &state.account_id, taken_at, engine, report)
            .await
            .map_err(IndexError::Persistence)?;
    }

    if let Some(denied) = outcome.unauthorized() {
        return Err(IndexError::Unauthorized(denied.error.to_string()));
    }
    if !outcome.success() {
        return Err(IndexError::PartialFetch {
            failed: outcome.failures.len(),
            scheduled: outcome.scheduled,
        });
    }
    Ok(())
}

/// Apply the failure policy to a failed account and notify
async fn apply_failure(
    pool: &DbPool,
    notifier: &dyn Notifier,
    config: &IndexerConfig,
    state: &AccountIndexState,
    error: &IndexError,
) -> Result<()> {
    let action = policy::failure_action(state, error, config.failure_ceiling);
    match action {
        FailureAction::DisableUnauthorized => {
            disable_account(pool, &state.account_id, true).await?;
        }
        FailureAction::DisableExhausted => {
            disable_account(pool, &state.account_id, false).await?;
        }
        FailureAction::CountFailure => {
            bump_failures(pool, &state.account_id).await?;
        }
    }

    warn!(
        account_id = %state.account_id,
        error = %error,
        action = ?action,
        "Account indexing failed"
    );
    notifier
        .notify(
            &state.account_id,
            action.severity(),
            &action.message(&state.account_id, &error.to_string()),
        )
        .await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Severity;
    use crate::source::FileSource;
    use crate::store;
    use crate::store::open_test_db;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const ACCOUNT: &str = "111122223333";

    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<(String, Severity, String)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, account_id: &str, severity: Severity, message: &str) {
            self.events
                .lock()
                .unwrap()
                .push((account_id.to_string(), severity, message.to_string()));
        }
    }

    impl RecordingNotifier {
        fn events(&self) -> Vec<(String, Severity, String)> {
            self.events.lock().unwrap().clone()
        }
    }

    fn write_account_doc(dir: &tempfile::TempDir, account_id: &str, body: &str) {
        std::fs::write(dir.path().join(format!("{account_id}.json")), body).unwrap();
    }

    async fn seed_account(pool: &DbPool, account_id: &str) {
        store::add_account(pool, account_id, None, &["us-east-1".to_string()])
            .await
            .unwrap();
    }

    fn source_for(dir: &tempfile::TempDir) -> Arc<dyn DataSource> {
        Arc::new(FileSource::new(dir.path()))
    }

    const CLEAN_DOC: &str = r#"{
        "regional": { "us-east-1": { "volumes": [{"id": "vol-1", "attachments": []}] } },
        "global": { "users": [{"id": "alice", "hasMFAEnabled": true}] }
    }"#;

    #[tokio::test]
    async fn test_successful_cycle_persists_and_marks_indexed() {
        let pool = open_test_db().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        write_account_doc(&dir, ACCOUNT, CLEAN_DOC);
        seed_account(&pool, ACCOUNT).await;
        let notifier = RecordingNotifier::default();
        let config = IndexerConfig::default();

        let summary = run_indexing_cycle(&pool, source_for(&dir), &notifier, &config, 10)
            .await
            .unwrap();
        assert_eq!(summary.ran, 1);
        assert!(summary.failures.is_empty());

        let state = store::get_account(&pool, ACCOUNT).await.unwrap().unwrap();
        assert!(state.last_indexed_at.is_some());
        assert_eq!(state.consecutive_failures, 0);

        let success: i64 = sqlx::query_scalar("SELECT success FROM snapshots")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(success, 1);

        let reports: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM issue_reports")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(reports, 3, "all three engines report every run");
        assert!(notifier.events().is_empty());
    }

    #[tokio::test]
    async fn test_authorization_failure_disables_but_persists() {
        let pool = open_test_db().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        write_account_doc(
            &dir,
            ACCOUNT,
            r#"{
                "regional": { "us-east-1": { "volumes": [{"id": "vol-1"}] } },
                "failures": { "users": "AccessDenied: not authorized to list users" }
            }"#,
        );
        seed_account(&pool, ACCOUNT).await;
        let notifier = RecordingNotifier::default();
        let config = IndexerConfig::default();

        let summary = run_indexing_cycle(&pool, source_for(&dir), &notifier, &config, 10)
            .await
            .unwrap();
        assert_eq!(summary.failures.len(), 1);

        let state = store::get_account(&pool, ACCOUNT).await.unwrap().unwrap();
        assert!(!state.is_active);
        assert!(state.is_unauthorized);
        assert!(state.last_indexed_at.is_none());

        // The partial snapshot still lands, flagged unsuccessful
        let success: i64 = sqlx::query_scalar("SELECT success FROM snapshots")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(success, 0);

        let events = notifier.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].1, Severity::Critical);
        assert!(events[0].2.contains("disabling indexing"));
    }

    #[tokio::test]
    async fn test_transient_failure_counts_and_stays_due() {
        let pool = open_test_db().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        write_account_doc(
            &dir,
            ACCOUNT,
            r#"{
                "regional": {},
                "failures": { "volumes": "Throttling: rate exceeded" }
            }"#,
        );
        seed_account(&pool, ACCOUNT).await;
        let notifier = RecordingNotifier::default();
        let config = IndexerConfig::default();

        run_indexing_cycle(&pool, source_for(&dir), &notifier, &config, 10)
            .await
            .unwrap();

        let state = store::get_account(&pool, ACCOUNT).await.unwrap().unwrap();
        assert!(state.is_active);
        assert_eq!(state.consecutive_failures, 1);
        assert!(
            state.last_indexed_at.is_none(),
            "a failed run must leave the account due"
        );

        let events = notifier.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].1, Severity::Warning);
    }

    #[tokio::test]
    async fn test_failure_ceiling_disables_account() {
        let pool = open_test_db().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        write_account_doc(
            &dir,
            ACCOUNT,
            r#"{"regional": {}, "failures": {"volumes": "Throttling: rate exceeded"}}"#,
        );
        seed_account(&pool, ACCOUNT).await;
        for _ in 0..4 {
            store::bump_failures(&pool, ACCOUNT).await.unwrap();
        }
        let notifier = RecordingNotifier::default();
        let config = IndexerConfig::default();

        run_indexing_cycle(&pool, source_for(&dir), &notifier, &config, 10)
            .await
            .unwrap();

        let state = store::get_account(&pool, ACCOUNT).await.unwrap().unwrap();
        assert!(!state.is_active, "fifth consecutive failure disables");
        assert!(!state.is_unauthorized);
        assert_eq!(notifier.events()[0].1, Severity::Critical);
    }

    #[tokio::test]
    async fn test_batch_size_caps_a_cycle() {
        let pool = open_test_db().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        for account_id in ["111111111111", "222222222222", "333333333333"] {
            write_account_doc(&dir, account_id, CLEAN_DOC);
            seed_account(&pool, account_id).await;
        }
        let notifier = RecordingNotifier::default();
        let config = IndexerConfig::default();

        let summary = run_indexing_cycle(&pool, source_for(&dir), &notifier, &config, 2)
            .await
            .unwrap();
        assert_eq!(summary.ran, 2);

        // The remaining account picks up on the next cycle
        let summary = run_indexing_cycle(&pool, source_for(&dir), &notifier, &config, 2)
            .await
            .unwrap();
        assert_eq!(summary.ran, 1);
    }

    #[tokio::test]
    async fn test_account_indexed_today_is_skipped() {
        let pool = open_test_db().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        write_account_doc(&dir, ACCOUNT, CLEAN_DOC);
        seed_account(&pool, ACCOUNT).await;
        store::mark_indexed(&pool, ACCOUNT, Utc::now()).await.unwrap();
        let notifier = RecordingNotifier::default();
        let config = IndexerConfig::default();

        let summary = run_indexing_cycle(&pool, source_for(&dir), &notifier, &config, 10)
            .await
            .unwrap();
        assert_eq!(summary.ran, 0, "once per UTC day");
    }
}
