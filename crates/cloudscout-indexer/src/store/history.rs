//! Snapshot and issue report persistence
//!
//! Snapshots and reports are stored as JSON documents keyed by account and
//! capture time. Reports written in the same run share the snapshot's
//! `taken_at`, so the latest report set always matches the latest snapshot.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use cloudscout_common::{
    CategoryReport, EngineKind, IssueReport, ResourceRecord, ResourceType, Snapshot,
};
use sqlx::Row;

use super::db::DbPool;

pub async fn put_snapshot(pool: &DbPool, snapshot: &Snapshot, success: bool) -> Result<()> {
    let document = serde_json::to_string(snapshot)?;

    sqlx::query(
        "INSERT INTO snapshots (account_id, taken_at, success, document) VALUES (?, ?, ?, ?)",
    )
    .bind(&snapshot.account_id)
    .bind(snapshot.taken_at.to_rfc3339())
    .bind(success)
    .bind(&document)
    .execute(pool)
    .await?;

    Ok(())
}

async fn snapshot_version(
    pool: &DbPool,
    account_id: &str,
    taken_at: DateTime<Utc>,
) -> Result<Option<Snapshot>> {
    let row = sqlx::query("SELECT document FROM snapshots WHERE account_id = ? AND taken_at = ?")
        .bind(account_id)
        .bind(taken_at.to_rfc3339())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let document: String = row.get("document");
            Ok(Some(
                serde_json::from_str(&document).context("Invalid snapshot document")?,
            ))
        }
        None => Ok(None),
    }
}

pub async fn put_issue_report(
    pool: &DbPool,
    account_id: &str,
    taken_at: DateTime<Utc>,
    engine: EngineKind,
    report: &IssueReport,
) -> Result<()> {
    let body = serde_json::to_string(report)?;

    sqlx::query(
        "INSERT INTO issue_reports (account_id, taken_at, engine, report) VALUES (?, ?, ?, ?)",
    )
    .bind(account_id)
    .bind(taken_at.to_rfc3339())
    .bind(engine.key())
    .bind(&body)
    .execute(pool)
    .await?;

    Ok(())
}

/// The most recent run's reports, keyed by engine
pub async fn latest_reports(
    pool: &DbPool,
    account_id: &str,
) -> Result<Option<(DateTime<Utc>, BTreeMap<EngineKind, IssueReport>)>> {
    let latest: Option<String> =
        sqlx::query_scalar("SELECT MAX(taken_at) FROM issue_reports WHERE account_id = ?")
            .bind(account_id)
            .fetch_one(pool)
            .await?;
    let Some(taken_at_raw) = latest else {
        return Ok(None);
    };

    let rows = sqlx::query(
        "SELECT engine, report FROM issue_reports WHERE account_id = ? AND taken_at = ?",
    )
    .bind(account_id)
    .bind(&taken_at_raw)
    .fetch_all(pool)
    .await?;

    let mut reports = BTreeMap::new();
    for row in &rows {
        let engine_key: String = row.get("engine");
        let body: String = row.get("report");
        let Some(engine) = EngineKind::from_key(&engine_key) else {
            continue;
        };
        reports.insert(
            engine,
            serde_json::from_str(&body).context("Invalid issue report document")?,
        );
    }

    let taken_at = DateTime::parse_from_rfc3339(&taken_at_raw)
        .context("Invalid report timestamp")?
        .with_timezone(&Utc);
    Ok(Some((taken_at, reports)))
}

/// A record located in its snapshot version
#[derive(Debug, Clone)]
pub struct LocatedRecord {
    pub region: Option<String>,
    pub resource_type: ResourceType,
    pub record: ResourceRecord,
}

/// Resolve report items back to the records of the snapshot version the
/// report was evaluated over.
///
/// Ids that do not name a record in that snapshot are simply not returned.
pub async fn records_by_ids(
    pool: &DbPool,
    account_id: &str,
    taken_at: DateTime<Utc>,
    ids: &[String],
) -> Result<Vec<LocatedRecord>> {
    let Some(snapshot) = snapshot_version(pool, account_id, taken_at).await? else {
        return Ok(Vec::new());
    };

    let mut located = Vec::new();
    for (region, resource_type, records) in snapshot.iter_slots() {
        for record in records {
            if ids.iter().any(|id| id == record.id()) {
                located.push(LocatedRecord {
                    region: region.map(String::from),
                    resource_type,
                    record: record.clone(),
                });
            }
        }
    }
    Ok(located)
}

/// Replace one category inside a stored report
pub async fn update_issue_category(
    pool: &DbPool,
    account_id: &str,
    taken_at: DateTime<Utc>,
    engine: EngineKind,
    category_key: &str,
    category: &CategoryReport,
) -> Result<()> {
    let taken_at_raw = taken_at.to_rfc3339();
    let body: Option<String> = sqlx::query_scalar(
        "SELECT report FROM issue_reports WHERE account_id = ? AND taken_at = ? AND engine = ?",
    )
    .bind(account_id)
    .bind(&taken_at_raw)
    .bind(engine.key())
    .fetch_optional(pool)
    .await?;
    let Some(body) = body else {
        bail!("no {} report for account {account_id} at {taken_at_raw}", engine.key());
    };

    let mut report: IssueReport =
        serde_json::from_str(&body).context("Invalid issue report document")?;
    report
        .categories
        .insert(category_key.to_string(), category.clone());

    sqlx::query(
        "UPDATE issue_reports SET report = ? WHERE account_id = ? AND taken_at = ? AND engine = ?",
    )
    .bind(serde_json::to_string(&report)?)
    .bind(account_id)
    .bind(&taken_at_raw)
    .bind(engine.key())
    .execute(pool)
    .await?;

    Ok(())
}

/// Append one remediation attempt to the audit trail
#[allow(clippy::too_many_arguments)]
pub async fn record_fix(
    pool: &DbPool,
    account_id: &str,
    taken_at: DateTime<Utc>,
    engine: EngineKind,
    category: &str,
    item_id: &str,
    success: bool,
    error_message: Option<&str>,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO fix_history
             (account_id, applied_at, taken_at, engine, category, item_id, success, error_message)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(account_id)
    .bind(&now)
    .bind(taken_at.to_rfc3339())
    .bind(engine.key())
    .bind(category)
    .bind(item_id)
    .bind(success)
    .bind(error_message)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::db::open_test_db;
    use cloudscout_common::template;

    fn snapshot(taken_at: DateTime<Utc>) -> Snapshot {
        let mut snap = Snapshot::new("111122223333", taken_at);
        snap.insert_regional(
            "us-east-1",
            ResourceType::Volumes,
            vec![ResourceRecord::new("vol-1").with("type", "gp2")],
        );
        snap.insert_global(ResourceType::Users, vec![ResourceRecord::new("alice")]);
        snap
    }

    async fn seed_account(pool: &DbPool) {
        crate::store::add_account(pool, "111122223333", None, &["us-east-1".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_snapshot_versions_round_trip() {
        let pool = open_test_db().await.unwrap();
        seed_account(&pool).await;

        let first = snapshot("2024-01-01T06:00:00.000000000Z".parse().unwrap());
        let second = snapshot("2024-01-02T06:00:00.000000000Z".parse().unwrap());
        put_snapshot(&pool, &first, true).await.unwrap();
        put_snapshot(&pool, &second, false).await.unwrap();

        let loaded = snapshot_version(&pool, "111122223333", first.taken_at)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, first, "each version loads back intact");

        let missing =
            snapshot_version(&pool, "111122223333", "2024-01-03T06:00:00Z".parse().unwrap())
                .await
                .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_reports_keyed_by_engine_and_run() {
        let pool = open_test_db().await.unwrap();
        let taken_at: DateTime<Utc> = "2024-01-02T06:00:00.000000000Z".parse().unwrap();

        put_issue_report(
            &pool,
            "111122223333",
            taken_at,
            EngineKind::UnusedResources,
            &template::unused_resources(),
        )
        .await
        .unwrap();
        put_issue_report(
            &pool,
            "111122223333",
            taken_at,
            EngineKind::SecurityIssues,
            &template::security_issues(),
        )
        .await
        .unwrap();
        put_issue_report(
            &pool,
            "111122223333",
            taken_at,
            EngineKind::Maintenance,
            &template::maintenance(),
        )
        .await
        .unwrap();

        let (loaded_at, reports) = latest_reports(&pool, "111122223333").await.unwrap().unwrap();
        assert_eq!(loaded_at, taken_at);
        assert_eq!(reports.len(), 3);
        assert_eq!(
            reports[&EngineKind::SecurityIssues]
                .category("rootAccountWithoutMFA")
                .unwrap()
                .count,
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_update_issue_category_rewrites_one_category() {
        let pool = open_test_db().await.unwrap();
        let taken_at: DateTime<Utc> = "2024-01-02T06:00:00.000000000Z".parse().unwrap();

        put_issue_report(
            &pool,
            "111122223333",
            taken_at,
            EngineKind::UnusedResources,
            &template::unused_resources(),
        )
        .await
        .unwrap();

        let mut category = template::unused_resources()
            .category("volumes")
            .cloned()
            .unwrap();
        category.unused = Some(7);
        update_issue_category(
            &pool,
            "111122223333",
            taken_at,
            EngineKind::UnusedResources,
            "volumes",
            &category,
        )
        .await
        .unwrap();

        let (_, reports) = latest_reports(&pool, "111122223333").await.unwrap().unwrap();
        let report = &reports[&EngineKind::UnusedResources];
        assert_eq!(report.category("volumes").unwrap().unused, Some(7));
        assert_eq!(report.category("eips").unwrap().unused, Some(0), "other categories untouched");
    }

    #[tokio::test]
    async fn test_records_by_ids_locates_records() {
        let pool = open_test_db().await.unwrap();
        seed_account(&pool).await;
        let snap = snapshot("2024-01-02T06:00:00.000000000Z".parse().unwrap());
        put_snapshot(&pool, &snap, true).await.unwrap();

        let located = records_by_ids(
            &pool,
            "111122223333",
            snap.taken_at,
            &["vol-1".to_string(), "ghost".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(located.len(), 1);
        assert_eq!(located[0].record.id(), "vol-1");
        assert_eq!(located[0].region.as_deref(), Some("us-east-1"));
        assert_eq!(located[0].resource_type, ResourceType::Volumes);
    }

    #[tokio::test]
    async fn test_record_fix_appends_audit_rows() {
        let pool = open_test_db().await.unwrap();
        let taken_at: DateTime<Utc> = "2024-01-02T06:00:00.000000000Z".parse().unwrap();

        record_fix(
            &pool,
            "111122223333",
            taken_at,
            EngineKind::UnusedResources,
            "volumes",
            "vol-1",
            true,
            None,
        )
        .await
        .unwrap();
        record_fix(
            &pool,
            "111122223333",
            taken_at,
            EngineKind::UnusedResources,
            "volumes",
            "vol-2",
            false,
            Some("item not present in the report"),
        )
        .await
        .unwrap();

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM fix_history WHERE account_id = '111122223333'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 2);

        let failed: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM fix_history WHERE success = 0 AND error_message IS NOT NULL",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(failed, 1);
    }
}
