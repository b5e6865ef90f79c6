//! Account indexing policy
//!
//! Decides which accounts are due and how a failed run moves an account
//! between active, counting failures, and disabled. The store mutates
//! account rows only on this module's say-so.

use chrono::{DateTime, NaiveTime, Utc};

use crate::error::IndexError;
use crate::notify::Severity;

/// Per-account indexing state
#[derive(Debug, Clone, PartialEq)]
pub struct AccountIndexState {
    pub account_id: String,
    pub display_name: Option<String>,
    pub active_regions: Vec<String>,
    pub last_indexed_at: Option<DateTime<Utc>>,
    pub consecutive_failures: i64,
    pub is_active: bool,
    pub is_unauthorized: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An account is due at most once per UTC day: active, authorized, and not
/// yet indexed since the day began
pub fn is_due(state: &AccountIndexState, now: DateTime<Utc>) -> bool {
    if !state.is_active || state.is_unauthorized {
        return false;
    }
    match state.last_indexed_at {
        Some(last) => last < start_of_utc_day(now),
        None => true,
    }
}

fn start_of_utc_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// What a failed run does to the account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Disable immediately and mark unauthorized
    DisableUnauthorized,
    /// Disable after exhausting the failure allowance
    DisableExhausted,
    /// Count the failure and leave the account active
    CountFailure,
}

/// Apply the failure policy to the state the run started from.
///
/// Authorization failures disable on the spot. Other failures disable only
/// when the account had already burned through `ceiling` consecutive
/// failures before this run.
pub fn failure_action(
    state: &AccountIndexState,
    error: &IndexError,
    ceiling: u32,
) -> FailureAction {
    if error.is_authorization() {
        FailureAction::DisableUnauthorized
    } else if state.consecutive_failures >= i64::from(ceiling) {
        FailureAction::DisableExhausted
    } else {
        FailureAction::CountFailure
    }
}

impl FailureAction {
    pub fn severity(self) -> Severity {
        match self {
            FailureAction::DisableUnauthorized | FailureAction::DisableExhausted => {
                Severity::Critical
            }
            FailureAction::CountFailure => Severity::Warning,
        }
    }

    pub fn message(self, account_id: &str, reason: &str) -> String {
        match self {
            FailureAction::DisableUnauthorized => {
                format!("disabling indexing for account {account_id}: {reason}")
            }
            FailureAction::DisableExhausted => format!(
                "disabling indexing for account {account_id} after repeated failures: {reason}"
            ),
            FailureAction::CountFailure => {
                format!("indexing failure for account {account_id}: {reason}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AccountIndexState {
        let created = "2024-01-01T08:00:00Z".parse().unwrap();
        AccountIndexState {
            account_id: "111122223333".to_string(),
            display_name: None,
            active_regions: vec!["us-east-1".to_string()],
            last_indexed_at: None,
            consecutive_failures: 0,
            is_active: true,
            is_unauthorized: false,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_never_indexed_account_is_due() {
        let now = "2024-01-02T00:00:01Z".parse().unwrap();
        assert!(is_due(&state(), now));
    }

    #[test]
    fn test_due_rolls_over_at_utc_midnight() {
        let now = "2024-01-02T00:00:01Z".parse().unwrap();

        let mut yesterday = state();
        yesterday.last_indexed_at = Some("2024-01-01T23:59:59Z".parse().unwrap());
        assert!(is_due(&yesterday, now), "indexed before midnight is due again");

        let mut today = state();
        today.last_indexed_at = Some("2024-01-02T00:00:00Z".parse().unwrap());
        assert!(!is_due(&today, now), "indexed at midnight is done for the day");
    }

    #[test]
    fn test_disabled_and_unauthorized_accounts_are_never_due() {
        let now = "2024-01-02T12:00:00Z".parse().unwrap();

        let mut disabled = state();
        disabled.is_active = false;
        assert!(!is_due(&disabled, now));

        let mut unauthorized = state();
        unauthorized.is_unauthorized = true;
        assert!(!is_due(&unauthorized, now));
    }

    #[test]
    fn test_authorization_failure_disables_immediately() {
        let action = failure_action(
            &state(),
            &IndexError::Unauthorized("AccessDenied".to_string()),
            4,
        );
        assert_eq!(action, FailureAction::DisableUnauthorized);
        assert_eq!(action.severity(), Severity::Critical);
    }

    #[test]
    fn test_fifth_consecutive_failure_disables() {
        let error = IndexError::PartialFetch { failed: 3, scheduled: 46 };

        let mut fresh = state();
        for prior in 0..4 {
            fresh.consecutive_failures = prior;
            assert_eq!(
                failure_action(&fresh, &error, 4),
                FailureAction::CountFailure,
                "failure {} keeps the account active",
                prior + 1
            );
        }

        fresh.consecutive_failures = 4;
        assert_eq!(failure_action(&fresh, &error, 4), FailureAction::DisableExhausted);
    }

    #[test]
    fn test_persistence_failures_count_like_fetch_failures() {
        let error = IndexError::Persistence(anyhow::anyhow!("disk full"));
        assert_eq!(failure_action(&state(), &error, 4), FailureAction::CountFailure);
    }
}
