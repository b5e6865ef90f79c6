//! Aggregated inventory snapshots
//!
//! A `(region, type)` slot is present iff its fetch task succeeded. A
//! successful fetch that found nothing is a present empty list; a failed
//! fetch is an absent key, never an empty list. Rule engines and persistence
//! both rely on that distinction, so slots are only ever inserted for
//! successful fetches.
//!
//! Maps are ordered so a snapshot and everything derived from it serializes
//! deterministically.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::ResourceRecord;
use crate::resource::ResourceType;

pub type TypeSlots = BTreeMap<ResourceType, Vec<ResourceRecord>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub account_id: String,
    pub taken_at: DateTime<Utc>,
    pub regional: BTreeMap<String, TypeSlots>,
    pub global: TypeSlots,
}

impl Snapshot {
    pub fn new(account_id: impl Into<String>, taken_at: DateTime<Utc>) -> Self {
        Self {
            account_id: account_id.into(),
            taken_at,
            regional: BTreeMap::new(),
            global: BTreeMap::new(),
        }
    }

    /// Record a successful regional fetch. Empty results stay present.
    pub fn insert_regional(
        &mut self,
        region: &str,
        resource_type: ResourceType,
        records: Vec<ResourceRecord>,
    ) {
        self.regional
            .entry(region.to_string())
            .or_default()
            .insert(resource_type, records);
    }

    /// Record a successful global fetch
    pub fn insert_global(&mut self, resource_type: ResourceType, records: Vec<ResourceRecord>) {
        self.global.insert(resource_type, records);
    }

    /// Slot for a regional type; `None` means the fetch failed or never ran
    pub fn regional_slot(
        &self,
        region: &str,
        resource_type: ResourceType,
    ) -> Option<&[ResourceRecord]> {
        self.regional
            .get(region)?
            .get(&resource_type)
            .map(Vec::as_slice)
    }

    /// Slot for a global type; `None` means the fetch failed or never ran
    pub fn global_slot(&self, resource_type: ResourceType) -> Option<&[ResourceRecord]> {
        self.global.get(&resource_type).map(Vec::as_slice)
    }

    /// Records of a regional sibling type, absent slots reading as empty.
    /// Cross-type rule lookups resolve within a single region.
    pub fn sibling_records(&self, region: &str, resource_type: ResourceType) -> &[ResourceRecord] {
        self.regional_slot(region, resource_type).unwrap_or(&[])
    }

    /// Single record of a global single-record slot (account summary,
    /// password policy)
    pub fn global_single(&self, resource_type: ResourceType) -> Option<&ResourceRecord> {
        self.global_slot(resource_type)?.first()
    }

    /// Present slots across both scopes, regional first.
    /// Yields `(region, type, records)` with `region == None` for global.
    pub fn iter_slots(
        &self,
    ) -> impl Iterator<Item = (Option<&str>, ResourceType, &[ResourceRecord])> {
        let regional = self.regional.iter().flat_map(|(region, slots)| {
            slots
                .iter()
                .map(move |(ty, records)| (Some(region.as_str()), *ty, records.as_slice()))
        });
        let global = self
            .global
            .iter()
            .map(|(ty, records)| (None, *ty, records.as_slice()));
        regional.chain(global)
    }

    /// Count of present slots across both scopes
    pub fn slot_count(&self) -> usize {
        self.regional.values().map(BTreeMap::len).sum::<usize>() + self.global.len()
    }
}
