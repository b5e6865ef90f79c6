//! Pluggable resource inventory sources
//!
//! A source answers one question: give me the records of one resource type
//! for one account, scoped to a region for regional types. The orchestrator
//! fans fetch tasks out over this trait so engines and stores never know
//! where inventory comes from.

use async_trait::async_trait;
use cloudscout_common::{ResourceRecord, ResourceType};

use crate::error::FetchError;

pub mod file;

pub use file::FileSource;

/// Account identity and the regions it is indexed across
#[derive(Debug, Clone)]
pub struct AccountContext {
    pub account_id: String,
    pub active_regions: Vec<String>,
}

/// Provider of raw resource records for one account
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch all records of `resource_type` for the account.
    ///
    /// `region` is `Some` for regional types and `None` for global ones.
    /// An account with none of the requested resources yields `Ok` with an
    /// empty vector; `Err` means the slot must be left out of the snapshot.
    async fn fetch(
        &self,
        account: &AccountContext,
        resource_type: ResourceType,
        region: Option<&str>,
    ) -> Result<Vec<ResourceRecord>, FetchError>;
}
