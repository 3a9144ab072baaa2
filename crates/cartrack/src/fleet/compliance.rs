//! Upcoming-renewal derivation.
//!
//! For every non-archived car and every renewal kind, the classifier maps
//! the (possibly overlapping, possibly empty) history of coverage intervals
//! to a verdict: the kind is `missing`, `overdue`, `due` within the
//! lookahead window, or covered beyond it, in which case no row is emitted
//! at all. The aggregator collects emitted verdicts across the fleet and
//! orders them for presentation. Pure functions, no I/O.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{Car, CarId, RenewalKind, RenewalRecord};

pub const MIN_LOOKAHEAD_DAYS: i64 = 1;
pub const MAX_LOOKAHEAD_DAYS: i64 = 365;
pub const DEFAULT_LOOKAHEAD_DAYS: i64 = 60;

/// Secondary sort key for verdicts without a day count, so they land after
/// any counted verdict inside the same priority bucket.
const DAYS_UNTIL_SENTINEL: i64 = 10_000;

/// Compliance status for one (car, kind) pair.
///
/// `NextScheduled` is reserved in the response contract but never produced
/// by [`classify`]; a future-dated record bought in advance stays invisible
/// until its start date arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewalStatus {
    Missing,
    Overdue,
    Due,
    NextScheduled,
}

impl RenewalStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RenewalStatus::Missing => "missing",
            RenewalStatus::Overdue => "overdue",
            RenewalStatus::Due => "due",
            RenewalStatus::NextScheduled => "next_scheduled",
        }
    }

    /// Presentation priority: missing entries group first, then overdue,
    /// then due. Statuses outside the produced set sort last.
    const fn priority(self) -> u8 {
        match self {
            RenewalStatus::Missing => 0,
            RenewalStatus::Overdue => 1,
            RenewalStatus::Due => 2,
            RenewalStatus::NextScheduled => 99,
        }
    }
}

/// Outcome of classifying one car's history for one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindVerdict {
    pub status: RenewalStatus,
    pub due_date: Option<NaiveDate>,
    pub days_until: Option<i64>,
    pub current_valid_to: Option<NaiveDate>,
}

/// One row of the upcoming-renewal report. Computed per request, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpcomingRenewal {
    pub car_id: CarId,
    pub car_registration_number: String,
    pub kind: RenewalKind,
    pub status: RenewalStatus,
    pub due_date: Option<NaiveDate>,
    pub days_until: Option<i64>,
    pub current_valid_to: Option<NaiveDate>,
}

/// Classify one car's renewal history for a single kind.
///
/// `records` may be empty, hold one record, or hold several with
/// overlapping or duplicate ranges; soft-deleted records are skipped.
/// `None` means the pair is covered by a record whose expiry lies beyond
/// the lookahead window: computed but suppressed, distinct from every
/// emitted status.
///
/// Callers are expected to keep `lookahead_days` within
/// [`MIN_LOOKAHEAD_DAYS`, `MAX_LOOKAHEAD_DAYS`]; the function itself is
/// total and performs no range check.
pub fn classify(
    records: &[&RenewalRecord],
    today: NaiveDate,
    lookahead_days: i64,
) -> Option<KindVerdict> {
    let live = records.iter().filter(|record| !record.is_deleted);

    let current = live
        .clone()
        .filter(|record| record.valid_from <= today && today <= record.valid_to)
        .max_by_key(|record| record.valid_to);

    if let Some(current) = current {
        let days_until = (current.valid_to - today).num_days();
        if days_until <= lookahead_days {
            return Some(KindVerdict {
                status: RenewalStatus::Due,
                due_date: Some(current.valid_to),
                days_until: Some(days_until),
                current_valid_to: Some(current.valid_to),
            });
        }
        // Covered, expiry beyond the window: nothing to surface.
        return None;
    }

    let past = live
        .filter(|record| record.valid_to < today)
        .max_by_key(|record| record.valid_to);

    if let Some(past) = past {
        return Some(KindVerdict {
            status: RenewalStatus::Overdue,
            due_date: Some(past.valid_to),
            days_until: Some(-(today - past.valid_to).num_days()),
            current_valid_to: None,
        });
    }

    // Empty history, or only future-dated records, which the classifier
    // ignores until their start date arrives.
    Some(KindVerdict {
        status: RenewalStatus::Missing,
        due_date: None,
        days_until: None,
        current_valid_to: None,
    })
}

/// Build the ordered upcoming-renewal report for a set of cars.
///
/// `cars` is expected to be pre-filtered to non-archived entries in the
/// order they should tie-break (creation descending, as the repository
/// returns them). Every (car, kind) pair yields at most one row; suppressed
/// pairs yield none, so the report holds at most `3 * cars.len()` rows.
pub fn upcoming_report(
    cars: &[Car],
    renewals_by_car: &HashMap<CarId, Vec<RenewalRecord>>,
    today: NaiveDate,
    lookahead_days: i64,
) -> Vec<UpcomingRenewal> {
    let mut report = Vec::new();

    for car in cars {
        let records = renewals_by_car.get(&car.id);
        for kind in RenewalKind::ordered() {
            let of_kind: Vec<&RenewalRecord> = records
                .map(|records| records.iter().filter(|r| r.kind == kind).collect())
                .unwrap_or_default();

            if let Some(verdict) = classify(&of_kind, today, lookahead_days) {
                report.push(UpcomingRenewal {
                    car_id: car.id,
                    car_registration_number: car.registration_number.clone(),
                    kind,
                    status: verdict.status,
                    due_date: verdict.due_date,
                    days_until: verdict.days_until,
                    current_valid_to: verdict.current_valid_to,
                });
            }
        }
    }

    // Stable sort keeps car-then-kind iteration order on ties.
    report.sort_by_key(|row| {
        (
            row.status.priority(),
            row.days_until.unwrap_or(DAYS_UNTIL_SENTINEL),
        )
    });
    report
}
