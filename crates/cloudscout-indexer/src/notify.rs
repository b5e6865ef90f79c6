//! Outbound notifications
//!
//! Notifications are fire-and-forget: the pipeline never blocks or fails on
//! delivery, so implementations absorb their own errors.

use async_trait::async_trait;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, account_id: &str, severity: Severity, message: &str);
}

/// Notifier that writes to the log stream
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, account_id: &str, severity: Severity, message: &str) {
        match severity {
            Severity::Info => info!(account_id = %account_id, "{message}"),
            Severity::Warning => warn!(account_id = %account_id, "{message}"),
            Severity::Critical => error!(account_id = %account_id, "{message}"),
        }
    }
}
