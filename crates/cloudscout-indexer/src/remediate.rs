//! Remediation surface over stored issue reports
//!
//! Fixes themselves happen out of band (consoles, IaC, scripts). This module
//! lists actionable findings from the latest run and moves items from a
//! category's item list to its fixed list once the operator confirms the fix,
//! recording every attempt in the audit trail.

use anyhow::{bail, Result};
use cloudscout_common::EngineKind;
use tracing::info;

use crate::store::{
    latest_reports, record_fix, records_by_ids, update_issue_category, DbPool, LocatedRecord,
};

/// One actionable finding, joined back to its snapshot record when one exists
#[derive(Debug)]
pub struct IssueItem {
    pub category: String,
    pub label: String,
    pub severity: Option<u8>,
    pub item_id: String,
    pub located: Option<LocatedRecord>,
}

/// Flatten one engine's latest report into per-item findings, optionally
/// narrowed to one category.
///
/// Items that do not name a snapshot record (key ids, region names) come
/// back without a location.
pub async fn list_issue_items(
    pool: &DbPool,
    account_id: &str,
    engine: EngineKind,
    category: Option<&str>,
) -> Result<Vec<IssueItem>> {
    let Some((taken_at, reports)) = latest_reports(pool, account_id).await? else {
        return Ok(Vec::new());
    };
    let Some(report) = reports.get(&engine) else {
        return Ok(Vec::new());
    };

    let selected: Vec<_> = report
        .categories
        .iter()
        .filter(|(key, _)| category.map(|c| c == key.as_str()).unwrap_or(true))
        .collect();

    let ids: Vec<String> = selected
        .iter()
        .filter_map(|(_, cat)| cat.item_list.as_ref())
        .flatten()
        .cloned()
        .collect();
    let located = records_by_ids(pool, account_id, taken_at, &ids).await?;

    let mut items = Vec::new();
    for (key, cat) in selected {
        let Some(item_list) = cat.item_list.as_ref() else {
            continue;
        };
        for item_id in item_list {
            items.push(IssueItem {
                category: key.clone(),
                label: cat.label.clone(),
                severity: cat.severity,
                item_id: item_id.clone(),
                located: located.iter().find(|l| l.record.id() == item_id).cloned(),
            });
        }
    }
    Ok(items)
}

/// Mark one reported item as fixed in the latest report.
///
/// Rejected attempts (unknown item, category without remediation support)
/// still land in the fix history before the error propagates.
pub async fn mark_item_fixed(
    pool: &DbPool,
    account_id: &str,
    category_key: &str,
    item_id: &str,
) -> Result<()> {
    let Some((taken_at, reports)) = latest_reports(pool, account_id).await? else {
        bail!("no issue reports for account {account_id}");
    };

    let owner = reports
        .iter()
        .find_map(|(engine, report)| report.category(category_key).map(|c| (*engine, c.clone())));
    let Some((engine, mut category)) = owner else {
        bail!("unknown issue category: {category_key}");
    };

    if !category.fixable() {
        let reason = "category does not support remediation";
        record_fix(pool, account_id, taken_at, engine, category_key, item_id, false, Some(reason))
            .await?;
        bail!("cannot mark {item_id} fixed: {reason}");
    }

    let position = category
        .item_list
        .as_deref()
        .unwrap_or_default()
        .iter()
        .position(|i| i == item_id);
    let Some(position) = position else {
        let reason = "item not present in the report";
        record_fix(pool, account_id, taken_at, engine, category_key, item_id, false, Some(reason))
            .await?;
        bail!("cannot mark {item_id} fixed in {category_key}: {reason}");
    };

    if let Some(items) = category.item_list.as_mut() {
        items.remove(position);
    }
    if let Some(unused) = category.unused.as_mut() {
        *unused = (*unused - 1).max(0);
    } else if let Some(count) = category.count.as_mut() {
        *count = (*count - 1).max(0);
    }
    category
        .fixed_item_list
        .get_or_insert_with(Vec::new)
        .push(item_id.to_string());

    update_issue_category(pool, account_id, taken_at, engine, category_key, &category).await?;
    record_fix(pool, account_id, taken_at, engine, category_key, item_id, true, None).await?;

    info!(
        account_id = %account_id,
        category = category_key,
        item = item_id,
        "Marked issue item fixed"
    );
    Ok(())
}
