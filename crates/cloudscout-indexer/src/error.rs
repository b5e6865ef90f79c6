//! Error taxonomy for the indexing pipeline
//!
//! Fetch errors are classified by source-reported code so authorization
//! rejections can be told apart from transient failures; the distinction
//! drives the account disable policy.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single fetch task
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The source rejected the account's credentials or role
    #[error("authorization failed: {code}: {message}")]
    Denied { code: String, message: String },

    /// The task did not report within the per-task timeout
    #[error("fetch timed out after {0:?}")]
    TimedOut(Duration),

    /// The task ended without reporting a result (worker defect)
    #[error("fetch task ended without reporting a result")]
    Aggregation,

    /// Any other source-reported failure
    #[error("{code}: {message}")]
    Source { code: String, message: String },
}

impl FetchError {
    /// Check if this failure must disable indexing for the account
    pub fn is_authorization(&self) -> bool {
        matches!(self, FetchError::Denied { .. })
    }

    /// Short code for logs and notifications
    pub fn code(&self) -> &str {
        match self {
            FetchError::Denied { code, .. } | FetchError::Source { code, .. } => code,
            FetchError::TimedOut(_) => "TIMEOUT",
            FetchError::Aggregation => "AGGREGATION",
        }
    }
}

/// Error codes sources report when an account's credentials are rejected
const AUTHORIZATION_CODES: &[&str] = &[
    "UNAUTHORIZED",
    "AccessDenied",
    "AccessDeniedException",
    "AuthFailure",
    "UnauthorizedOperation",
    "ExpiredToken",
    "InvalidClientTokenId",
];

/// Classify a source-reported error by its code, falling back to an
/// access-denied marker in the message.
pub fn classify_fetch_error(code: &str, message: &str) -> FetchError {
    if AUTHORIZATION_CODES.contains(&code) || message.contains("AccessDenied") {
        FetchError::Denied {
            code: code.to_string(),
            message: message.to_string(),
        }
    } else {
        FetchError::Source {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

/// Account-level failure of one indexing run, fed to the index policy
#[derive(Debug, Error)]
pub enum IndexError {
    /// A fetch task was rejected for authorization
    #[error("authorization failure: {0}")]
    Unauthorized(String),

    /// At least one fetch task failed; the persisted snapshot is partial
    #[error("{failed} of {scheduled} fetch tasks failed")]
    PartialFetch { failed: usize, scheduled: usize },

    /// Snapshot or report persistence failed; the account stays due and is
    /// retried on the next cycle rather than in-process
    #[error("persistence failure: {0:#}")]
    Persistence(anyhow::Error),
}

impl IndexError {
    pub fn is_authorization(&self) -> bool {
        matches!(self, IndexError::Unauthorized(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_codes() {
        for code in AUTHORIZATION_CODES {
            let err = classify_fetch_error(code, "rejected");
            assert!(err.is_authorization(), "Expected Denied for code: {code}");
        }
    }

    #[test]
    fn access_denied_marker_in_message() {
        let err = classify_fetch_error(
            "EXCEPTION",
            "ClientError: AccessDenied when calling AssumeRole",
        );
        assert!(err.is_authorization(), "message marker must classify as Denied");
    }

    #[test]
    fn other_codes_stay_transient() {
        let err = classify_fetch_error("Throttling", "rate exceeded");
        assert!(!err.is_authorization());
        assert_eq!(err.code(), "Throttling");

        assert!(!FetchError::TimedOut(Duration::from_secs(300)).is_authorization());
        assert!(!FetchError::Aggregation.is_authorization());
    }

    #[test]
    fn index_error_authorization_check() {
        assert!(IndexError::Unauthorized("AccessDenied".to_string()).is_authorization());
        assert!(!IndexError::PartialFetch { failed: 1, scheduled: 46 }.is_authorization());
        assert!(!IndexError::Persistence(anyhow::anyhow!("disk full")).is_authorization());
    }
}
