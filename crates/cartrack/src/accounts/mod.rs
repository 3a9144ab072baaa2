//! Accounts: users, households, bearer sessions, and reminder preferences.

pub mod directory;
pub mod domain;
pub(crate) mod password;
pub mod preferences;
pub mod service;

pub use directory::DirectoryRepository;
pub use domain::{Household, HouseholdId, HouseholdMember, MemberRole, User, UserId};
pub use preferences::ReminderPreferences;
pub use service::{
    AccessToken, AccountService, AccountServiceError, HouseholdDraft, LoginRequest, SignupRequest,
    UserView,
};
