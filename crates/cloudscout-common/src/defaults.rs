//! Default configuration values for the indexing pipeline
//!
//! These constants keep CLI defaults, config-file defaults, and tests in
//! agreement.

/// Default number of due accounts indexed per scheduling cycle
pub const DEFAULT_BATCH_SIZE: usize = 2;

/// Default per-fetch-task timeout in seconds
pub const DEFAULT_WORKER_TIMEOUT_SECS: u64 = 300;

/// Consecutive-failure count after which the next failure disables indexing
pub const DEFAULT_FAILURE_CEILING: u32 = 4;

/// Days a stopped instance may idle before it counts as unused
pub const DEFAULT_MAX_STOPPED_INSTANCE_AGE_DAYS: i64 = 30;

/// Days before a machine image counts as unused
pub const DEFAULT_MAX_IMAGE_AGE_DAYS: i64 = 90;

/// Days before an access key counts as expired
pub const DEFAULT_MAX_ACCESS_KEY_AGE_DAYS: i64 = 90;

/// Days without use before an access key counts as unused
pub const DEFAULT_MAX_UNUSED_ACCESS_KEY_AGE_DAYS: i64 = 30;

/// Days without a login before an IAM user counts as unused
pub const DEFAULT_MAX_UNUSED_IAM_USER_AGE_DAYS: i64 = 90;

/// Days before an RDS manual snapshot counts as unused
pub const DEFAULT_MAX_RDS_SNAPSHOT_AGE_DAYS: i64 = 30;

/// Minimum password-policy score (0-6) that passes the security check
pub const DEFAULT_PASSWORD_POLICY_PASS_SCORE: i64 = 6;

/// Commonly attacked ports flagged when exposed to 0.0.0.0/0
pub const DEFAULT_VULNERABLE_PORTS: &[i64] = &[
    20, 21, 23, 25, 135, 445, 1433, 3306, 3389, 5432, 5900, 6379, 27017,
];

/// The world-open SSH rule always checks this port
pub const SSH_PORT: i64 = 22;

// Serde default functions for struct field defaults

pub fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

pub fn default_worker_timeout_secs() -> u64 {
    DEFAULT_WORKER_TIMEOUT_SECS
}

pub fn default_failure_ceiling() -> u32 {
    DEFAULT_FAILURE_CEILING
}

pub fn default_max_stopped_instance_age_days() -> i64 {
    DEFAULT_MAX_STOPPED_INSTANCE_AGE_DAYS
}

pub fn default_max_image_age_days() -> i64 {
    DEFAULT_MAX_IMAGE_AGE_DAYS
}

pub fn default_max_access_key_age_days() -> i64 {
    DEFAULT_MAX_ACCESS_KEY_AGE_DAYS
}

pub fn default_max_unused_access_key_age_days() -> i64 {
    DEFAULT_MAX_UNUSED_ACCESS_KEY_AGE_DAYS
}

pub fn default_max_unused_iam_user_age_days() -> i64 {
    DEFAULT_MAX_UNUSED_IAM_USER_AGE_DAYS
}

pub fn default_max_rds_snapshot_age_days() -> i64 {
    DEFAULT_MAX_RDS_SNAPSHOT_AGE_DAYS
}

pub fn default_password_policy_pass_score() -> i64 {
    DEFAULT_PASSWORD_POLICY_PASS_SCORE
}

pub fn default_vulnerable_ports() -> Vec<i64> {
    DEFAULT_VULNERABLE_PORTS.to_vec()
}
