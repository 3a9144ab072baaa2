use crate::accounts::domain::HouseholdId;
use crate::storage::RepositoryError;

use super::domain::{Car, CarId, RenewalId, RenewalRecord};

/// Storage abstraction over cars and renewal records so the fleet service
/// and the compliance report can be exercised in isolation.
pub trait FleetRepository: Send + Sync {
    /// Insert a new car; `Conflict` when the registration number is already
    /// taken within the household.
    fn insert_car(&self, car: Car) -> Result<Car, RepositoryError>;
    /// Replace a stored car; `Conflict` on a registration collision,
    /// `NotFound` when the id is unknown.
    fn update_car(&self, car: Car) -> Result<(), RepositoryError>;
    fn fetch_car(&self, id: CarId) -> Result<Option<Car>, RepositoryError>;
    /// Cars for a household, creation-descending. Archived cars are only
    /// included when asked for.
    fn cars_for_household(
        &self,
        household: HouseholdId,
        include_archived: bool,
    ) -> Result<Vec<Car>, RepositoryError>;

    fn insert_renewal(&self, record: RenewalRecord) -> Result<RenewalRecord, RepositoryError>;
    fn update_renewal(&self, record: RenewalRecord) -> Result<(), RepositoryError>;
    fn fetch_renewal(&self, id: RenewalId) -> Result<Option<RenewalRecord>, RepositoryError>;
    /// Non-deleted records for a car, `valid_to` descending.
    fn renewals_for_car(&self, car: CarId) -> Result<Vec<RenewalRecord>, RepositoryError>;
}
