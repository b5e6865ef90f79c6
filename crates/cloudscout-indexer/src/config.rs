//! Indexer configuration loaded from JSON
//!
//! Every field has a default so an empty `{}` file is a valid
//! configuration. Validation is done via `garde::Validate`.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use garde::Validate;

use cloudscout_common::defaults::{
    default_batch_size, default_failure_ceiling, default_max_access_key_age_days,
    default_max_image_age_days, default_max_rds_snapshot_age_days,
    default_max_stopped_instance_age_days, default_max_unused_access_key_age_days,
    default_max_unused_iam_user_age_days, default_password_policy_pass_score,
    default_vulnerable_ports, default_worker_timeout_secs,
};
use serde::{Deserialize, Serialize};

/// Age and scoring thresholds consumed by the rule engines
#[derive(Debug, Clone, Serialize, Deserialize, garde::Validate)]
#[serde(deny_unknown_fields)]
pub struct RulePolicy {
    /// Days a stopped instance may sit before it counts as unused
    #[serde(default = "default_max_stopped_instance_age_days")]
    #[garde(range(min = 1))]
    pub max_stopped_instance_age_days: i64,

    /// Days before a machine image counts as unused
    #[serde(default = "default_max_image_age_days")]
    #[garde(range(min = 1))]
    pub max_image_age_days: i64,

    /// Days before an access key counts as expired
    #[serde(default = "default_max_access_key_age_days")]
    #[garde(range(min = 1))]
    pub max_access_key_age_days: i64,

    /// Days without use before an access key counts as unused
    #[serde(default = "default_max_unused_access_key_age_days")]
    #[garde(range(min = 1))]
    pub max_unused_access_key_age_days: i64,

    /// Days without a login before a user counts as unused
    #[serde(default = "default_max_unused_iam_user_age_days")]
    #[garde(range(min = 1))]
    pub max_unused_iam_user_age_days: i64,

    /// Days before a manual database snapshot counts as unused
    #[serde(default = "default_max_rds_snapshot_age_days")]
    #[garde(range(min = 1))]
    pub max_rds_snapshot_age_days: i64,

    /// Minimum password policy score that passes the security check
    #[serde(default = "default_password_policy_pass_score")]
    #[garde(range(min = 1))]
    pub password_policy_pass_score: i64,

    /// Ports that flag a security group when exposed to 0.0.0.0/0
    #[serde(default = "default_vulnerable_ports")]
    #[garde(length(min = 1))]
    pub vulnerable_ports: Vec<i64>,
}

impl Default for RulePolicy {
    fn default() -> Self {
        Self {
            max_stopped_instance_age_days: default_max_stopped_instance_age_days(),
            max_image_age_days: default_max_image_age_days(),
            max_access_key_age_days: default_max_access_key_age_days(),
            max_unused_access_key_age_days: default_max_unused_access_key_age_days(),
            max_unused_iam_user_age_days: default_max_unused_iam_user_age_days(),
            max_rds_snapshot_age_days: default_max_rds_snapshot_age_days(),
            password_policy_pass_score: default_password_policy_pass_score(),
            vulnerable_ports: default_vulnerable_ports(),
        }
    }
}

/// Top-level indexer configuration
#[derive(Debug, Clone, Serialize, Deserialize, garde::Validate)]
#[serde(deny_unknown_fields)]
pub struct IndexerConfig {
    /// Maximum accounts indexed per cycle
    #[serde(default = "default_batch_size")]
    #[garde(range(min = 1))]
    pub batch_size: usize,

    /// Per-fetch-task timeout in seconds
    #[serde(default = "default_worker_timeout_secs")]
    #[garde(range(min = 1))]
    pub worker_timeout_secs: u64,

    /// Consecutive failures tolerated before an account is disabled
    #[serde(default = "default_failure_ceiling")]
    #[garde(range(min = 1))]
    pub failure_ceiling: u32,

    /// Rule engine thresholds
    #[serde(default)]
    #[garde(dive)]
    pub rules: RulePolicy,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            worker_timeout_secs: default_worker_timeout_secs(),
            failure_ceiling: default_failure_ceiling(),
            rules: RulePolicy::default(),
        }
    }
}

impl IndexerConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn worker_timeout(&self) -> Duration {
        Duration::from_secs(self.worker_timeout_secs)
    }
}
