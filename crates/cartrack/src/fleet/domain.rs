use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accounts::domain::HouseholdId;

/// Identifier wrapper for cars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CarId(pub Uuid);

impl CarId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier wrapper for renewal records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenewalId(pub Uuid);

impl RenewalId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RenewalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Closed set of compliance categories tracked per car.
///
/// Shared verbatim between storage, validation, and classification so the
/// layers cannot drift. Declaration order is the per-car iteration order
/// used when the compliance report is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenewalKind {
    Insurance,
    Mot,
    Tax,
}

impl RenewalKind {
    pub const fn ordered() -> [RenewalKind; 3] {
        [Self::Insurance, Self::Mot, Self::Tax]
    }

    pub const fn label(self) -> &'static str {
        match self {
            RenewalKind::Insurance => "INSURANCE",
            RenewalKind::Mot => "MOT",
            RenewalKind::Tax => "TAX",
        }
    }
}

/// A vehicle owned by exactly one household. Archived cars drop out of
/// listings and compliance scanning but keep their history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Car {
    pub id: CarId,
    pub household_id: HouseholdId,
    pub registration_number: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One dated coverage interval for a car and kind. Overlapping intervals of
/// the same kind are legal (early renewal before the old one expires), and
/// deletion is soft so history survives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenewalRecord {
    pub id: RenewalId,
    pub car_id: CarId,
    pub kind: RenewalKind,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
    pub provider: Option<String>,
    pub reference: Option<String>,
    pub cost_pence: Option<u32>,
    pub notes: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inbound payload for registering a car.
#[derive(Debug, Clone, Deserialize)]
pub struct CarDraft {
    pub registration_number: String,
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Partial update for a car; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarPatch {
    #[serde(default)]
    pub registration_number: Option<String>,
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub is_archived: Option<bool>,
}

/// Inbound payload for recording a renewal.
#[derive(Debug, Clone, Deserialize)]
pub struct RenewalDraft {
    pub kind: RenewalKind,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub cost_pence: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update for a renewal record. `kind` is deliberately absent from
/// this shape: the kind of a record is immutable after creation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenewalPatch {
    #[serde(default)]
    pub valid_from: Option<NaiveDate>,
    #[serde(default)]
    pub valid_to: Option<NaiveDate>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub cost_pence: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}
