use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use cartrack::accounts::{
    AccountService, DirectoryRepository, Household, HouseholdId, HouseholdMember,
    ReminderPreferences, User, UserId,
};
use cartrack::fleet::{Car, CarId, FleetRepository, FleetService, RenewalId, RenewalRecord};
use cartrack::storage::RepositoryError;
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;

/// Extension state backing the operational endpoints.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Router state bundling the two service facades.
pub(crate) struct ApiContext<D, F> {
    pub(crate) accounts: AccountService<D>,
    pub(crate) fleet: FleetService<F>,
}

#[derive(Default)]
struct DirectoryState {
    users: HashMap<UserId, User>,
    households: HashMap<HouseholdId, Household>,
    memberships: Vec<HouseholdMember>,
    preferences: HashMap<UserId, ReminderPreferences>,
}

/// Process-local directory store. Data lives for the lifetime of the
/// process only.
#[derive(Default, Clone)]
pub(crate) struct InMemoryDirectory {
    state: Arc<Mutex<DirectoryState>>,
}

impl DirectoryRepository for InMemoryDirectory {
    fn insert_user(&self, user: User) -> Result<User, RepositoryError> {
        let mut state = self.state.lock().expect("directory mutex poisoned");
        if state.users.values().any(|existing| existing.email == user.email) {
            return Err(RepositoryError::Conflict);
        }
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn fetch_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let state = self.state.lock().expect("directory mutex poisoned");
        Ok(state.users.get(&id).cloned())
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let state = self.state.lock().expect("directory mutex poisoned");
        Ok(state.users.values().find(|user| user.email == email).cloned())
    }

    fn insert_household(
        &self,
        household: Household,
        admin: HouseholdMember,
    ) -> Result<Household, RepositoryError> {
        let mut state = self.state.lock().expect("directory mutex poisoned");
        state.households.insert(household.id, household.clone());
        state.memberships.push(admin);
        Ok(household)
    }

    fn fetch_household(&self, id: HouseholdId) -> Result<Option<Household>, RepositoryError> {
        let state = self.state.lock().expect("directory mutex poisoned");
        Ok(state.households.get(&id).cloned())
    }

    fn membership_for_user(
        &self,
        user: UserId,
    ) -> Result<Option<HouseholdMember>, RepositoryError> {
        let state = self.state.lock().expect("directory mutex poisoned");
        Ok(state
            .memberships
            .iter()
            .find(|member| member.user_id == user)
            .cloned())
    }

    fn preferences_for_user(
        &self,
        user: UserId,
    ) -> Result<Option<ReminderPreferences>, RepositoryError> {
        let state = self.state.lock().expect("directory mutex poisoned");
        Ok(state.preferences.get(&user).cloned())
    }

    fn upsert_preferences(
        &self,
        user: UserId,
        preferences: ReminderPreferences,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("directory mutex poisoned");
        state.preferences.insert(user, preferences);
        Ok(())
    }
}

#[derive(Default)]
struct FleetState {
    cars: HashMap<CarId, Car>,
    // Insertion order doubles as creation order for listing tie-breaks.
    car_order: Vec<CarId>,
    renewals: HashMap<RenewalId, RenewalRecord>,
}

/// Process-local fleet store.
#[derive(Default, Clone)]
pub(crate) struct InMemoryFleetStore {
    state: Arc<Mutex<FleetState>>,
}

impl FleetRepository for InMemoryFleetStore {
    fn insert_car(&self, car: Car) -> Result<Car, RepositoryError> {
        let mut state = self.state.lock().expect("fleet mutex poisoned");
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
        let mut state = self.state.lock().expect("fleet mutex poisoned");
        if !state.cars.contains_key(&car.id) {
            return Err(RepositoryError::NotFound);
        }
        let taken = state.cars.values().any(|existing| {
            existing.id != car.id
                && existing.household_id == car.household_id
                && existing.registration_number == car.registration_number
        });
        if taken {
            return Err(RepositoryError::Conflict);
        }
        state.cars.insert(car.id, car);
        Ok(())
    }

    fn fetch_car(&self, id: CarId) -> Result<Option<Car>, RepositoryError> {
        let state = self.state.lock().expect("fleet mutex poisoned");
        Ok(state.cars.get(&id).cloned())
    }

    fn cars_for_household(
        &self,
        household: HouseholdId,
        include_archived: bool,
    ) -> Result<Vec<Car>, RepositoryError> {
        let state = self.state.lock().expect("fleet mutex poisoned");
        Ok(state
            .car_order
            .iter()
            .rev()
            .filter_map(|id| state.cars.get(id))
            .filter(|car| {
                car.household_id == household && (include_archived || !car.is_archived)
            })
            .cloned()
            .collect())
    }

    fn insert_renewal(&self, record: RenewalRecord) -> Result<RenewalRecord, RepositoryError> {
        let mut state = self.state.lock().expect("fleet mutex poisoned");
        state.renewals.insert(record.id, record.clone());
        Ok(record)
    }

    fn update_renewal(&self, record: RenewalRecord) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("fleet mutex poisoned");
        if !state.renewals.contains_key(&record.id) {
            return Err(RepositoryError::NotFound);
        }
        state.renewals.insert(record.id, record);
        Ok(())
    }

    fn fetch_renewal(&self, id: RenewalId) -> Result<Option<RenewalRecord>, RepositoryError> {
        let state = self.state.lock().expect("fleet mutex poisoned");
        Ok(state.renewals.get(&id).cloned())
    }

    fn renewals_for_car(&self, car: CarId) -> Result<Vec<RenewalRecord>, RepositoryError> {
        let state = self.state.lock().expect("fleet mutex poisoned");
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

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
