//! Concurrent fetch orchestration
//!
//! One worker task per fetch unit, all spawned up front and drained through
//! a bounded channel. A failed or timed-out unit never aborts the run: its
//! slot is simply left out of the snapshot and the failure is recorded, so
//! a partial snapshot can still be persisted and analysed.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cloudscout_common::{ResourceRecord, ResourceType, Snapshot};
use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::error::FetchError;
use crate::plan::fetch_plan;
use crate::source::{AccountContext, DataSource};

/// One fetch unit's recorded failure
#[derive(Debug)]
pub struct FetchFailure {
    pub resource_type: ResourceType,
    pub region: Option<String>,
    pub error: FetchError,
}

/// Result of one account's fetch run
#[derive(Debug)]
pub struct CollectionOutcome {
    pub snapshot: Snapshot,
    /// Failed units, ordered by (region, type) for stable reporting
    pub failures: Vec<FetchFailure>,
    /// Units the plan scheduled
    pub scheduled: usize,
}

impl CollectionOutcome {
    /// A run succeeds only when every scheduled unit produced a slot
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }

    /// First authorization rejection, if any unit hit one
    pub fn unauthorized(&self) -> Option<&FetchFailure> {
        self.failures.iter().find(|f| f.error.is_authorization())
    }
}

struct TaskReport {
    resource_type: ResourceType,
    region: Option<String>,
    outcome: Result<Vec<ResourceRecord>, FetchError>,
}

/// Fetch every slot of the account's plan and aggregate the results.
///
/// Workers run concurrently under a per-task timeout. The snapshot is
/// complete once this returns; callers treat it as frozen.
pub async fn collect_snapshot(
    source: Arc<dyn DataSource>,
    account: &AccountContext,
    task_timeout: Duration,
    taken_at: DateTime<Utc>,
) -> CollectionOutcome {
    let plan = fetch_plan(&account.active_regions);
    let scheduled = plan.len();

    let (tx, mut rx) = mpsc::channel::<TaskReport>(scheduled.max(1));
    let mut pending: BTreeSet<(Option<String>, ResourceType)> = plan
        .iter()
        .map(|unit| (unit.region.clone(), unit.resource_type))
        .collect();

    let mut handles = Vec::with_capacity(scheduled);
    for unit in plan {
        let tx = tx.clone();
        let source = Arc::clone(&source);
        let account = account.clone();
        handles.push(tokio::spawn(async move {
            let fetch = source.fetch(&account, unit.resource_type, unit.region.as_deref());
            let outcome = match tokio::time::timeout(task_timeout, fetch).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::TimedOut(task_timeout)),
            };
            let _ = tx
                .send(TaskReport {
                    resource_type: unit.resource_type,
                    region: unit.region,
                    outcome,
                })
                .await;
        }));
    }
    // Drop the prototype sender so the drain ends when every worker is done
    drop(tx);

    let mut snapshot = Snapshot::new(account.account_id.clone(), taken_at);
    let mut failures = Vec::new();
    while let Some(report) = rx.recv().await {
        pending.remove(&(report.region.clone(), report.resource_type));
        match report.outcome {
            Ok(records) => match &report.region {
                Some(region) => snapshot.insert_regional(region, report.resource_type, records),
                None => snapshot.insert_global(report.resource_type, records),
            },
            Err(fetch_error) => {
                warn!(
                    account_id = %account.account_id,
                    resource_type = report.resource_type.key(),
                    region = report.region.as_deref().unwrap_or("global"),
                    error = %fetch_error,
                    "Fetch task failed"
                );
                failures.push(FetchFailure {
                    resource_type: report.resource_type,
                    region: report.region,
                    error: fetch_error,
                });
            }
        }
    }

    // The channel closed, so every surviving worker has reported. Surface
    // panicked workers and charge their units as failures.
    for handle in handles {
        if let Err(e) = handle.await {
            if e.is_panic() {
                error!(account_id = %account.account_id, error = ?e, "Fetch task panicked");
            }
        }
    }
    for (region, resource_type) in pending {
        failures.push(FetchFailure {
            resource_type,
            region,
            error: FetchError::Aggregation,
        });
    }

    failures.sort_by(|a, b| {
        (a.region.as_deref(), a.resource_type.key())
            .cmp(&(b.region.as_deref(), b.resource_type.key()))
    });

    CollectionOutcome {
        snapshot,
        failures,
        scheduled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// In-memory source with scripted per-slot outcomes
    struct StaticSource {
        records: HashMap<(Option<String>, ResourceType), Vec<ResourceRecord>>,
        errors: HashMap<(Option<String>, ResourceType), (String, String)>,
        delay: Option<(ResourceType, Duration)>,
    }

    impl StaticSource {
        fn empty() -> Self {
            Self {
                records: HashMap::new(),
                errors: HashMap::new(),
                delay: None,
            }
        }

        fn with_records(
            mut self,
            region: Option<&str>,
            resource_type: ResourceType,
            records: Vec<ResourceRecord>,
        ) -> Self {
            self.records
                .insert((region.map(String::from), resource_type), records);
            self
        }

        fn with_error(
            mut self,
            region: Option<&str>,
            resource_type: ResourceType,
            code: &str,
            message: &str,
        ) -> Self {
            self.errors.insert(
                (region.map(String::from), resource_type),
                (code.to_string(), message.to_string()),
            );
            self
        }
    }

    #[async_trait]
    impl DataSource for StaticSource {
        async fn fetch(
            &self,
            _account: &AccountContext,
            resource_type: ResourceType,
            region: Option<&str>,
        ) -> Result<Vec<ResourceRecord>, FetchError> {
            if let Some((slow_type, delay)) = &self.delay {
                if *slow_type == resource_type {
                    tokio::time::sleep(*delay).await;
                }
            }
            let key = (region.map(String::from), resource_type);
            if let Some((code, message)) = self.errors.get(&key) {
                return Err(crate::error::classify_fetch_error(code, message));
            }
            Ok(self.records.get(&key).cloned().unwrap_or_default())
        }
    }

    fn account() -> AccountContext {
        AccountContext {
            account_id: "111122223333".to_string(),
            active_regions: vec!["us-east-1".to_string()],
        }
    }

    #[tokio::test]
    async fn all_slots_present_on_full_success() {
        let source = Arc::new(StaticSource::empty().with_records(
            Some("us-east-1"),
            ResourceType::Volumes,
            vec![ResourceRecord::new("vol-1")],
        ));
        let outcome =
            collect_snapshot(source, &account(), Duration::from_secs(5), Utc::now()).await;

        assert!(outcome.success());
        assert_eq!(
            outcome.scheduled,
            ResourceType::REGIONAL.len() + ResourceType::GLOBAL.len()
        );
        assert_eq!(outcome.snapshot.slot_count(), outcome.scheduled);
        assert_eq!(
            outcome
                .snapshot
                .regional_slot("us-east-1", ResourceType::Volumes)
                .map(|r| r.len()),
            Some(1)
        );
        // A type the source has nothing for is a present empty slot
        assert_eq!(
            outcome.snapshot.regional_slot("us-east-1", ResourceType::Eips),
            Some(&[][..])
        );
    }

    #[tokio::test]
    async fn failed_slot_is_absent_and_run_not_success() {
        let source = Arc::new(StaticSource::empty().with_error(
            Some("us-east-1"),
            ResourceType::Snapshots,
            "Throttling",
            "rate exceeded",
        ));
        let outcome =
            collect_snapshot(source, &account(), Duration::from_secs(5), Utc::now()).await;

        assert!(!outcome.success());
        assert!(outcome.unauthorized().is_none());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].resource_type, ResourceType::Snapshots);
        assert_eq!(
            outcome.snapshot.regional_slot("us-east-1", ResourceType::Snapshots),
            None,
            "failed slot must be absent, not empty"
        );
        // Other slots still land
        assert_eq!(outcome.snapshot.slot_count(), outcome.scheduled - 1);
    }

    #[tokio::test]
    async fn authorization_failure_is_flagged() {
        let source = Arc::new(StaticSource::empty().with_error(
            None,
            ResourceType::Users,
            "AccessDenied",
            "not authorized",
        ));
        let outcome =
            collect_snapshot(source, &account(), Duration::from_secs(5), Utc::now()).await;

        assert!(!outcome.success());
        let denied = outcome.unauthorized().expect("authorization failure");
        assert_eq!(denied.resource_type, ResourceType::Users);
        // The rest of the snapshot is still aggregated
        assert_eq!(outcome.snapshot.slot_count(), outcome.scheduled - 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_slot_is_absent() {
        let mut source = StaticSource::empty();
        source.delay = Some((ResourceType::Vpcs, Duration::from_secs(600)));
        let outcome = collect_snapshot(
            Arc::new(source),
            &account(),
            Duration::from_secs(300),
            Utc::now(),
        )
        .await;

        assert!(!outcome.success());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].error.code(), "TIMEOUT");
        assert_eq!(outcome.snapshot.regional_slot("us-east-1", ResourceType::Vpcs), None);
        assert_eq!(outcome.snapshot.slot_count(), outcome.scheduled - 1);
    }

    #[tokio::test]
    async fn failures_are_ordered() {
        let source = Arc::new(
            StaticSource::empty()
                .with_error(Some("us-east-1"), ResourceType::Vpcs, "E", "x")
                .with_error(Some("us-east-1"), ResourceType::Amis, "E", "x")
                .with_error(None, ResourceType::Users, "E", "x"),
        );
        let outcome =
            collect_snapshot(source, &account(), Duration::from_secs(5), Utc::now()).await;

        let keys: Vec<_> = outcome
            .failures
            .iter()
            .map(|f| (f.region.as_deref(), f.resource_type.key()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (None, "users"),
                (Some("us-east-1"), "amis"),
                (Some("us-east-1"), "vpcs"),
            ]
        );
    }
}
