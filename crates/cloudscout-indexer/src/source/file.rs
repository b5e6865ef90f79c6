//! File-backed inventory source
//!
//! Reads one JSON document per account from a directory, shaped as
//! `{"regional": {region: {type: [records]}}, "global": {type: [records]},
//! "failures": {type: "CODE: message"}}`. The `failures` table lets fixtures
//! and exports replay fetch errors, including authorization rejections.

use std::path::PathBuf;

use async_trait::async_trait;
use cloudscout_common::{ResourceRecord, ResourceType, Scope};
use serde_json::Value;

use crate::error::{classify_fetch_error, FetchError};
use crate::source::{AccountContext, DataSource};

/// Source backed by `<root>/<account_id>.json` documents
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn load_document(&self, account_id: &str) -> Result<Value, FetchError> {
        let path = self.root.join(format!("{account_id}.json"));
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            classify_fetch_error("ReadError", &format!("{}: {e}", path.display()))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| classify_fetch_error("ParseError", &format!("{}: {e}", path.display())))
    }
}

/// Split a `"CODE: message"` failure entry into its parts
fn split_failure(entry: &str) -> (&str, &str) {
    match entry.split_once(": ") {
        Some((code, message)) => (code, message),
        None => (entry, ""),
    }
}

#[async_trait]
impl DataSource for FileSource {
    async fn fetch(
        &self,
        account: &AccountContext,
        resource_type: ResourceType,
        region: Option<&str>,
    ) -> Result<Vec<ResourceRecord>, FetchError> {
        let document = self.load_document(&account.account_id).await?;

        if let Some(entry) = document
            .get("failures")
            .and_then(|f| f.get(resource_type.key()))
            .and_then(Value::as_str)
        {
            let (code, message) = split_failure(entry);
            return Err(classify_fetch_error(code, message));
        }

        let slot = match resource_type.scope() {
            Scope::Regional => {
                let region = region.unwrap_or_default();
                document
                    .get("regional")
                    .and_then(|r| r.get(region))
                    .and_then(|r| r.get(resource_type.key()))
            }
            Scope::Global => document.get("global").and_then(|g| g.get(resource_type.key())),
        };

        // A type the document does not mention is an empty inventory, not
        // a failure.
        let records = match slot.and_then(Value::as_array) {
            Some(items) => items
                .iter()
                .filter_map(|v| ResourceRecord::from_value(v.clone()))
                .collect(),
            None => Vec::new(),
        };
        Ok(records)
    }
}
