use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use cartrack::accounts::HouseholdId;
use cartrack::fleet::{
    Car, CarDraft, CarId, CarPatch, FleetRepository, FleetService, FleetServiceError, RenewalDraft,
    RenewalId, RenewalKind, RenewalPatch, RenewalRecord, RenewalStatus,
};
use cartrack::storage::RepositoryError;
use chrono::{Duration, NaiveDate};

#[derive(Default)]
struct MemoryFleetState {
    cars: HashMap<CarId, Car>,
    car_order: Vec<CarId>,
    renewals: HashMap<RenewalId, RenewalRecord>,
}

#[derive(Default)]
struct MemoryFleet {
    state: Mutex<MemoryFleetState>,
}

impl FleetRepository for MemoryFleet {
    fn insert_car(&self, car: Car) -> Result<Car, RepositoryError> {
        let mut state = self.state.lock().expect("mutex poisoned");
        let taken = state.cars.values().any(|existing| {
            existing.household_id == car.household_id
                && existing.registration_number == car.registration_number
        });
        if taken {
            return Err(RepositoryError::Conflict);
        }
        state.car_order.push(car.id);
        state.cars.insert(car.id, car.clone());
        Ok(car)
    }

    fn update_car(&self, car: Car) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("mutex poisoned");
        if !state.cars.contains_key(&car.id) {
            return Err(RepositoryError::NotFound);
        }
        state.cars.insert(car.id, car);
        Ok(())
    }

    fn fetch_car(&self, id: CarId) -> Result<Option<Car>, RepositoryError> {
        let state = self.state.lock().expect("mutex poisoned");
        Ok(state.cars.get(&id).cloned())
    }

    fn cars_for_household(
        &self,
        household: HouseholdId,
        include_archived: bool,
    ) -> Result<Vec<Car>, RepositoryError> {
        let state = self.state.lock().expect("mutex poisoned");
        Ok(state
            .car_order
            .iter()
            .rev()
            .filter_map(|id| state.cars.get(id))
            .filter(|car| car.household_id == household && (include_archived || !car.is_archived))
            .cloned()
            .collect())
    }

    fn insert_renewal(&self, record: RenewalRecord) -> Result<RenewalRecord, RepositoryError> {
        let mut state = self.state.lock().expect("mutex poisoned");
        state.renewals.insert(record.id, record.clone());
        Ok(record)
    }

    fn update_renewal(&self, record: RenewalRecord) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("mutex poisoned");
        if !state.renewals.contains_key(&record.id) {
            return Err(RepositoryError::NotFound);
        }
        state.renewals.insert(record.id, record);
        Ok(())
    }

    fn fetch_renewal(&self, id: RenewalId) -> Result<Option<RenewalRecord>, RepositoryError> {
        let state = self.state.lock().expect("mutex poisoned");
        Ok(state.renewals.get(&id).cloned())
    }

    fn renewals_for_car(&self, car: CarId) -> Result<Vec<RenewalRecord>, RepositoryError> {
        let state = self.state.lock().expect("mutex poisoned");
        let mut records: Vec<RenewalRecord> = state
            .renewals
            .values()
            .filter(|record| record.car_id == car && !record.is_deleted)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.valid_to.cmp(&a.valid_to));
        Ok(records)
    }
}

fn service() -> FleetService<MemoryFleet> {
    FleetService::new(Arc::new(MemoryFleet::default()))
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 30).expect("valid date")
}

fn days(offset: i64) -> NaiveDate {
    today() + Duration::days(offset)
}

fn car_draft(registration: &str) -> CarDraft {
    CarDraft {
        registration_number: registration.to_string(),
        make: None,
        model: None,
    }
}

fn renewal_draft(kind: RenewalKind, valid_from: NaiveDate, valid_to: NaiveDate) -> RenewalDraft {
    RenewalDraft {
        kind,
        valid_from,
        valid_to,
        provider: None,
        reference: None,
        cost_pence: None,
        notes: None,
    }
}

#[test]
fn report_covers_full_household_lifecycle() {
    let fleet = service();
    let household = HouseholdId::random();

    let car = fleet
        .register_car(household, car_draft("ab12 cde"))
        .expect("car registers");
    assert_eq!(car.registration_number, "AB12 CDE");

    fleet
        .record_renewal(
            household,
            car.id,
            renewal_draft(RenewalKind::Insurance, days(-300), days(4)),
        )
        .expect("insurance records");
    fleet
        .record_renewal(
            household,
            car.id,
            renewal_draft(RenewalKind::Mot, days(-400), days(-35)),
        )
        .expect("mot records");

    let report = fleet
        .upcoming(household, today(), 60)
        .expect("report builds");

    assert_eq!(report.len(), 3);
    assert_eq!(report[0].kind, RenewalKind::Tax);
    assert_eq!(report[0].status, RenewalStatus::Missing);
    assert_eq!(report[1].kind, RenewalKind::Mot);
    assert_eq!(report[1].status, RenewalStatus::Overdue);
    assert_eq!(report[1].days_until, Some(-35));
    assert_eq!(report[2].kind, RenewalKind::Insurance);
    assert_eq!(report[2].status, RenewalStatus::Due);
    assert_eq!(report[2].days_until, Some(4));
    assert_eq!(report[2].current_valid_to, Some(days(4)));
}

#[test]
fn archived_cars_drop_out_of_the_report() {
    let fleet = service();
    let household = HouseholdId::random();

    let car = fleet
        .register_car(household, car_draft("XY64 QRS"))
        .expect("car registers");
    fleet
        .set_archived(household, car.id, true)
        .expect("car archives");

    let report = fleet
        .upcoming(household, today(), 60)
        .expect("report builds");
    assert!(report.is_empty());

    fleet
        .set_archived(household, car.id, false)
        .expect("car unarchives");
    let report = fleet
        .upcoming(household, today(), 60)
        .expect("report builds");
    assert_eq!(report.len(), 3);
}

#[test]
fn soft_deleted_renewals_vanish_from_listing_and_report() {
    let fleet = service();
    let household = HouseholdId::random();

    let car = fleet
        .register_car(household, car_draft("CC33 CCC"))
        .expect("car registers");
    let record = fleet
        .record_renewal(
            household,
            car.id,
            renewal_draft(RenewalKind::Tax, days(-10), days(9)),
        )
        .expect("tax records");

    fleet
        .remove_renewal(household, record.id)
        .expect("renewal removes");
    // Idempotent: removing again still succeeds.
    fleet
        .remove_renewal(household, record.id)
        .expect("second removal succeeds");

    let listed = fleet
        .list_renewals(household, car.id, None)
        .expect("listing succeeds");
    assert!(listed.is_empty());

    let report = fleet
        .upcoming(household, today(), 60)
        .expect("report builds");
    let tax_row = report
        .iter()
        .find(|row| row.kind == RenewalKind::Tax)
        .expect("tax row present");
    assert_eq!(tax_row.status, RenewalStatus::Missing);
}

#[test]
fn households_cannot_see_each_other() {
    let fleet = service();
    let ours = HouseholdId::random();
    let theirs = HouseholdId::random();

    let car = fleet
        .register_car(theirs, car_draft("DD44 DDD"))
        .expect("car registers");
    let record = fleet
        .record_renewal(
            theirs,
            car.id,
            renewal_draft(RenewalKind::Mot, days(-10), days(30)),
        )
        .expect("mot records");

    assert!(matches!(
        fleet.get_car(ours, car.id),
        Err(FleetServiceError::CarNotFound)
    ));
    assert!(matches!(
        fleet.amend_renewal(ours, record.id, RenewalPatch::default()),
        Err(FleetServiceError::RenewalNotFound)
    ));
    assert!(matches!(
        fleet.remove_renewal(ours, record.id),
        Err(FleetServiceError::RenewalNotFound)
    ));
    assert!(fleet
        .upcoming(ours, today(), 60)
        .expect("report builds")
        .is_empty());
}

#[test]
fn duplicate_registration_within_household_conflicts() {
    let fleet = service();
    let household = HouseholdId::random();

    fleet
        .register_car(household, car_draft("EE55 EEE"))
        .expect("first registers");
    assert!(matches!(
        fleet.register_car(household, car_draft("  ee55 eee ")),
        Err(FleetServiceError::DuplicateRegistration)
    ));

    // Same registration in another household is fine.
    fleet
        .register_car(HouseholdId::random(), car_draft("EE55 EEE"))
        .expect("other household registers");
}

#[test]
fn registration_length_limits_are_enforced() {
    let fleet = service();
    let household = HouseholdId::random();

    assert!(matches!(
        fleet.register_car(household, car_draft("A")),
        Err(FleetServiceError::InvalidRegistration)
    ));
    assert!(matches!(
        fleet.register_car(household, car_draft("THIS IS FAR TOO LONG")),
        Err(FleetServiceError::InvalidRegistration)
    ));
}

#[test]
fn validity_range_is_checked_on_create_and_amend() {
    let fleet = service();
    let household = HouseholdId::random();
    let car = fleet
        .register_car(household, car_draft("FF66 FFF"))
        .expect("car registers");

    assert!(matches!(
        fleet.record_renewal(
            household,
            car.id,
            renewal_draft(RenewalKind::Insurance, days(5), days(1)),
        ),
        Err(FleetServiceError::InvalidValidityRange)
    ));

    let record = fleet
        .record_renewal(
            household,
            car.id,
            renewal_draft(RenewalKind::Insurance, days(-10), days(10)),
        )
        .expect("insurance records");
    let patch = RenewalPatch {
        valid_to: Some(days(-20)),
        ..RenewalPatch::default()
    };
    assert!(matches!(
        fleet.amend_renewal(household, record.id, patch),
        Err(FleetServiceError::InvalidValidityRange)
    ));
}

#[test]
fn amending_a_renewal_keeps_its_kind() {
    let fleet = service();
    let household = HouseholdId::random();
    let car = fleet
        .register_car(household, car_draft("GG77 GGG"))
        .expect("car registers");
    let record = fleet
        .record_renewal(
            household,
            car.id,
            renewal_draft(RenewalKind::Tax, days(-10), days(10)),
        )
        .expect("tax records");

    let patch = RenewalPatch {
        valid_to: Some(days(40)),
        provider: Some("DVLA".to_string()),
        ..RenewalPatch::default()
    };
    let amended = fleet
        .amend_renewal(household, record.id, patch)
        .expect("amend succeeds");
    assert_eq!(amended.kind, RenewalKind::Tax);
    assert_eq!(amended.valid_to, days(40));
    assert_eq!(amended.provider.as_deref(), Some("DVLA"));
}

#[test]
fn lookahead_bounds_are_enforced() {
    let fleet = service();
    let household = HouseholdId::random();

    assert!(matches!(
        fleet.upcoming(household, today(), 0),
        Err(FleetServiceError::LookaheadOutOfRange { days: 0 })
    ));
    assert!(matches!(
        fleet.upcoming(household, today(), 366),
        Err(FleetServiceError::LookaheadOutOfRange { days: 366 })
    ));
    assert!(fleet
        .upcoming(household, today(), 365)
        .expect("report builds")
        .is_empty());
}

#[test]
fn car_patch_updates_fields_and_rechecks_registration() {
    let fleet = service();
    let household = HouseholdId::random();
    let car = fleet
        .register_car(household, car_draft("HH88 HHH"))
        .expect("car registers");

    let patch = CarPatch {
        registration_number: Some("jj99 jjj".to_string()),
        make: Some("Honda".to_string()),
        ..CarPatch::default()
    };
    let updated = fleet
        .update_car(household, car.id, patch)
        .expect("update succeeds");
    assert_eq!(updated.registration_number, "JJ99 JJJ");
    assert_eq!(updated.make.as_deref(), Some("Honda"));

    let patch = CarPatch {
        registration_number: Some("?".to_string()),
        ..CarPatch::default()
    };
    assert!(matches!(
        fleet.update_car(household, car.id, patch),
        Err(FleetServiceError::InvalidRegistration)
    ));
}

#[test]
fn listing_filters_by_kind() {
    let fleet = service();
    let household = HouseholdId::random();
    let car = fleet
        .register_car(household, car_draft("KK11 KKK"))
        .expect("car registers");

    fleet
        .record_renewal(
            household,
            car.id,
            renewal_draft(RenewalKind::Insurance, days(-10), days(10)),
        )
        .expect("insurance records");
    fleet
        .record_renewal(
            household,
            car.id,
            renewal_draft(RenewalKind::Mot, days(-10), days(20)),
        )
        .expect("mot records");

    let only_mot = fleet
        .list_renewals(household, car.id, Some(RenewalKind::Mot))
        .expect("listing succeeds");
    assert_eq!(only_mot.len(), 1);
    assert_eq!(only_mot[0].kind, RenewalKind::Mot);

    let all = fleet
        .list_renewals(household, car.id, None)
        .expect("listing succeeds");
    assert_eq!(all.len(), 2);
    // valid_to descending
    assert_eq!(all[0].kind, RenewalKind::Mot);
}
