use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fleet::domain::RenewalKind;

const DEFAULT_OFFSETS: [u32; 3] = [30, 7, 1];

/// Days-before-expiry reminder offsets per renewal kind.
///
/// Storage only: no delivery or scheduling exists, the service persists
/// and echoes these. Typed keys mean unknown kinds are rejected at
/// deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderPreferences(BTreeMap<RenewalKind, Vec<u32>>);

impl ReminderPreferences {
    pub fn new(offsets: BTreeMap<RenewalKind, Vec<u32>>) -> Self {
        Self(offsets)
    }

    /// Preferences served before a user has saved any: 30/7/1 days ahead
    /// for every kind.
    pub fn defaults() -> Self {
        Self(
            RenewalKind::ordered()
                .into_iter()
                .map(|kind| (kind, DEFAULT_OFFSETS.to_vec()))
                .collect(),
        )
    }

    /// Deduplicate and order each offset list largest-first before storage.
    pub fn normalized(mut self) -> Self {
        for offsets in self.0.values_mut() {
            offsets.sort_unstable_by(|a, b| b.cmp(a));
            offsets.dedup();
        }
        self
    }

    pub fn offsets(&self) -> &BTreeMap<RenewalKind, Vec<u32>> {
        &self.0
    }
}
