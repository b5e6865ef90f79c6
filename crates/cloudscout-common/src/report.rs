//! Issue reports emitted by the rule engines
//!
//! A report maps category keys to per-category results. Field presence
//! follows the category template: the unused-resource engine carries
//! `unused`/`total`/`costSaving`, the security and maintenance engines carry
//! `count`/`severity`, and remediable categories carry `fixedItemList` and
//! `canFix`. Categories are stored in an ordered map so serialization is
//! deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Engines that analyze a snapshot
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum EngineKind {
    UnusedResources,
    SecurityIssues,
    Maintenance,
}

impl EngineKind {
    pub const ALL: [EngineKind; 3] = [
        EngineKind::UnusedResources,
        EngineKind::SecurityIssues,
        EngineKind::Maintenance,
    ];

    /// Stable key, identical to the serde representation
    pub fn key(self) -> &'static str {
        match self {
            EngineKind::UnusedResources => "unusedResources",
            EngineKind::SecurityIssues => "securityIssues",
            EngineKind::Maintenance => "maintenance",
        }
    }

    pub fn from_key(key: &str) -> Option<EngineKind> {
        EngineKind::ALL.iter().copied().find(|e| e.key() == key)
    }
}

/// Human label for a severity level (1 = Critical .. 4 = Low)
pub fn severity_label(severity: u8) -> &'static str {
    match severity {
        1 => "Critical",
        2 => "High",
        3 => "Medium",
        _ => "Low",
    }
}

/// One category inside an issue report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryReport {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unused: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_saving: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_item_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_fix: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_message: Option<String>,
}

impl CategoryReport {
    /// Flag a record: push onto the item list and bump the category counter
    pub fn add_item(&mut self, id: impl Into<String>) {
        if let Some(items) = self.item_list.as_mut() {
            items.push(id.into());
        }
        self.bump();
    }

    /// Bump the counter without an item (`unused` for the unused-resource
    /// engine, `count` otherwise)
    pub fn bump(&mut self) {
        if let Some(unused) = self.unused.as_mut() {
            *unused += 1;
        } else if let Some(count) = self.count.as_mut() {
            *count += 1;
        }
    }

    pub fn add_total(&mut self, n: i64) {
        if let Some(total) = self.total.as_mut() {
            *total += n;
        }
    }

    /// Current counter value, whichever of `unused`/`count` the category uses
    pub fn hits(&self) -> i64 {
        self.unused.or(self.count).unwrap_or(0)
    }

    /// Whether the remediation surface may act on this category
    pub fn fixable(&self) -> bool {
        self.can_fix.unwrap_or(false)
    }
}

/// Per-category results of one engine over one snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueReport {
    pub categories: BTreeMap<String, CategoryReport>,
}

impl IssueReport {
    pub fn from_categories(categories: BTreeMap<String, CategoryReport>) -> Self {
        Self { categories }
    }

    pub fn category(&self, key: &str) -> Option<&CategoryReport> {
        self.categories.get(key)
    }

    pub fn category_mut(&mut self, key: &str) -> Option<&mut CategoryReport> {
        self.categories.get_mut(key)
    }

    /// Sum of category counters, for log lines and summaries
    pub fn total_hits(&self) -> i64 {
        self.categories.values().map(CategoryReport::hits).sum()
    }
}
