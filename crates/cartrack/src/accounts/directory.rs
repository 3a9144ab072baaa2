use crate::storage::RepositoryError;

use super::domain::{Household, HouseholdId, HouseholdMember, User, UserId};
use super::preferences::ReminderPreferences;

/// Storage abstraction over users, households, memberships, and reminder
/// preferences so the account service can be exercised in isolation.
pub trait DirectoryRepository: Send + Sync {
    /// Insert a new user; `Conflict` when the email is already registered.
    fn insert_user(&self, user: User) -> Result<User, RepositoryError>;
    fn fetch_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    fn user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    /// Insert a household together with its founding admin membership.
    fn insert_household(
        &self,
        household: Household,
        admin: HouseholdMember,
    ) -> Result<Household, RepositoryError>;
    fn fetch_household(&self, id: HouseholdId) -> Result<Option<Household>, RepositoryError>;
    /// The user's membership, if any. One household per user.
    fn membership_for_user(
        &self,
        user: UserId,
    ) -> Result<Option<HouseholdMember>, RepositoryError>;

    fn preferences_for_user(
        &self,
        user: UserId,
    ) -> Result<Option<ReminderPreferences>, RepositoryError>;
    fn upsert_preferences(
        &self,
        user: UserId,
        preferences: ReminderPreferences,
    ) -> Result<(), RepositoryError>;
}
