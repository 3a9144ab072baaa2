use std::collections::HashMap;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde_json::json;
use tracing::debug;

use super::compliance::{
    upcoming_report, UpcomingRenewal, MAX_LOOKAHEAD_DAYS, MIN_LOOKAHEAD_DAYS,
};
use super::domain::{
    Car, CarDraft, CarId, CarPatch, RenewalDraft, RenewalId, RenewalKind, RenewalPatch,
    RenewalRecord,
};
use super::repository::FleetRepository;
use crate::accounts::domain::HouseholdId;
use crate::storage::RepositoryError;

const MIN_REGISTRATION_LEN: usize = 2;
const MAX_REGISTRATION_LEN: usize = 16;

/// Household-scoped facade over car and renewal storage plus the compliance
/// report. Every operation takes the caller's household so a record
/// belonging to another tenant behaves as if it did not exist.
pub struct FleetService<F> {
    repository: Arc<F>,
}

impl<F> FleetService<F>
where
    F: FleetRepository,
{
    pub fn new(repository: Arc<F>) -> Self {
        Self { repository }
    }

    pub fn list_cars(
        &self,
        household: HouseholdId,
        include_archived: bool,
    ) -> Result<Vec<Car>, FleetServiceError> {
        Ok(self
            .repository
            .cars_for_household(household, include_archived)?)
    }

    pub fn register_car(
        &self,
        household: HouseholdId,
        draft: CarDraft,
    ) -> Result<Car, FleetServiceError> {
        let registration_number = normalize_registration(&draft.registration_number)?;
        let now = Utc::now();
        let car = Car {
            id: CarId::random(),
            household_id: household,
            registration_number,
            make: draft.make,
            model: draft.model,
            is_archived: false,
            created_at: now,
            updated_at: now,
        };

        self.repository.insert_car(car).map_err(|err| match err {
            RepositoryError::Conflict => FleetServiceError::DuplicateRegistration,
            other => other.into(),
        })
    }

    pub fn get_car(&self, household: HouseholdId, id: CarId) -> Result<Car, FleetServiceError> {
        self.repository
            .fetch_car(id)?
            .filter(|car| car.household_id == household)
            .ok_or(FleetServiceError::CarNotFound)
    }

    pub fn update_car(
        &self,
        household: HouseholdId,
        id: CarId,
        patch: CarPatch,
    ) -> Result<Car, FleetServiceError> {
        let mut car = self.get_car(household, id)?;

        if let Some(registration) = patch.registration_number {
            car.registration_number = normalize_registration(&registration)?;
        }
        if let Some(make) = patch.make {
            car.make = Some(make);
        }
        if let Some(model) = patch.model {
            car.model = Some(model);
        }
        if let Some(archived) = patch.is_archived {
            car.is_archived = archived;
        }
        car.updated_at = Utc::now();

        self.repository
            .update_car(car.clone())
            .map_err(|err| match err {
                RepositoryError::Conflict => FleetServiceError::DuplicateRegistration,
                other => other.into(),
            })?;
        Ok(car)
    }

    pub fn set_archived(
        &self,
        household: HouseholdId,
        id: CarId,
        archived: bool,
    ) -> Result<Car, FleetServiceError> {
        let mut car = self.get_car(household, id)?;
        car.is_archived = archived;
        car.updated_at = Utc::now();
        self.repository.update_car(car.clone())?;
        Ok(car)
    }

    pub fn list_renewals(
        &self,
        household: HouseholdId,
        car: CarId,
        kind: Option<RenewalKind>,
    ) -> Result<Vec<RenewalRecord>, FleetServiceError> {
        self.get_car(household, car)?;
        let mut records = self.repository.renewals_for_car(car)?;
        if let Some(kind) = kind {
            records.retain(|record| record.kind == kind);
        }
        Ok(records)
    }

    pub fn record_renewal(
        &self,
        household: HouseholdId,
        car: CarId,
        draft: RenewalDraft,
    ) -> Result<RenewalRecord, FleetServiceError> {
        self.get_car(household, car)?;
        check_validity_range(draft.valid_from, draft.valid_to)?;

        let now = Utc::now();
        let record = RenewalRecord {
            id: RenewalId::random(),
            car_id: car,
            kind: draft.kind,
            valid_from: draft.valid_from,
            valid_to: draft.valid_to,
            provider: draft.provider,
            reference: draft.reference,
            cost_pence: draft.cost_pence,
            notes: draft.notes,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };

        Ok(self.repository.insert_renewal(record)?)
    }

    pub fn amend_renewal(
        &self,
        household: HouseholdId,
        id: RenewalId,
        patch: RenewalPatch,
    ) -> Result<RenewalRecord, FleetServiceError> {
        let mut record = self
            .repository
            .fetch_renewal(id)?
            .filter(|record| !record.is_deleted)
            .ok_or(FleetServiceError::RenewalNotFound)?;

        // A record reachable only through another household's car reads as
        // absent, matching the car lookup.
        self.get_car(household, record.car_id)
            .map_err(|_| FleetServiceError::RenewalNotFound)?;

        if let Some(valid_from) = patch.valid_from {
            record.valid_from = valid_from;
        }
        if let Some(valid_to) = patch.valid_to {
            record.valid_to = valid_to;
        }
        check_validity_range(record.valid_from, record.valid_to)?;

        if let Some(provider) = patch.provider {
            record.provider = Some(provider);
        }
        if let Some(reference) = patch.reference {
            record.reference = Some(reference);
        }
        if let Some(cost_pence) = patch.cost_pence {
            record.cost_pence = Some(cost_pence);
        }
        if let Some(notes) = patch.notes {
            record.notes = Some(notes);
        }
        record.updated_at = Utc::now();

        self.repository.update_renewal(record.clone())?;
        Ok(record)
    }

    /// Soft-delete a renewal. Idempotent: unknown or already-deleted ids
    /// succeed silently; a record owned by another household is an error.
    pub fn remove_renewal(
        &self,
        household: HouseholdId,
        id: RenewalId,
    ) -> Result<(), FleetServiceError> {
        let Some(mut record) = self.repository.fetch_renewal(id)? else {
            return Ok(());
        };
        if record.is_deleted {
            return Ok(());
        }

        self.get_car(household, record.car_id)
            .map_err(|_| FleetServiceError::RenewalNotFound)?;

        record.is_deleted = true;
        record.updated_at = Utc::now();
        self.repository.update_renewal(record)?;
        Ok(())
    }

    /// The upcoming-renewal report: every non-archived car of the household
    /// crossed with every kind, classified against `today` and the
    /// lookahead window, suppressed pairs dropped, ordered for display.
    pub fn upcoming(
        &self,
        household: HouseholdId,
        today: NaiveDate,
        lookahead_days: i64,
    ) -> Result<Vec<UpcomingRenewal>, FleetServiceError> {
        if !(MIN_LOOKAHEAD_DAYS..=MAX_LOOKAHEAD_DAYS).contains(&lookahead_days) {
            return Err(FleetServiceError::LookaheadOutOfRange {
                days: lookahead_days,
            });
        }

        let cars = self.repository.cars_for_household(household, false)?;

        // One fetch per car mirrors the data-access contract; household
        // fleets stay small enough that batching buys nothing.
        let mut renewals_by_car = HashMap::with_capacity(cars.len());
        for car in &cars {
            renewals_by_car.insert(car.id, self.repository.renewals_for_car(car.id)?);
        }

        let report = upcoming_report(&cars, &renewals_by_car, today, lookahead_days);
        debug!(
            household = %household,
            cars = cars.len(),
            rows = report.len(),
            "compliance report assembled"
        );
        Ok(report)
    }
}

fn normalize_registration(raw: &str) -> Result<String, FleetServiceError> {
    let registration = raw.trim().to_ascii_uppercase();
    if !(MIN_REGISTRATION_LEN..=MAX_REGISTRATION_LEN).contains(&registration.chars().count()) {
        return Err(FleetServiceError::InvalidRegistration);
    }
    Ok(registration)
}

fn check_validity_range(valid_from: NaiveDate, valid_to: NaiveDate) -> Result<(), FleetServiceError> {
    if valid_from > valid_to {
        return Err(FleetServiceError::InvalidValidityRange);
    }
    Ok(())
}

/// Error raised by the fleet service.
#[derive(Debug, thiserror::Error)]
pub enum FleetServiceError {
    #[error("car not found")]
    CarNotFound,
    #[error("renewal not found")]
    RenewalNotFound,
    #[error("car already exists for household")]
    DuplicateRegistration,
    #[error(
        "registration number must be between {} and {} characters",
        MIN_REGISTRATION_LEN,
        MAX_REGISTRATION_LEN
    )]
    InvalidRegistration,
    #[error("valid_from must be on or before valid_to")]
    InvalidValidityRange,
    #[error(
        "days must be between {} and {}, got {days}",
        MIN_LOOKAHEAD_DAYS,
        MAX_LOOKAHEAD_DAYS
    )]
    LookaheadOutOfRange { days: i64 },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl IntoResponse for FleetServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            FleetServiceError::CarNotFound
            | FleetServiceError::RenewalNotFound
            | FleetServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            FleetServiceError::DuplicateRegistration
            | FleetServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            FleetServiceError::InvalidRegistration
            | FleetServiceError::InvalidValidityRange
            | FleetServiceError::LookaheadOutOfRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            FleetServiceError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
