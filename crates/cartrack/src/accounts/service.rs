use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::directory::DirectoryRepository;
use super::domain::{Household, HouseholdId, HouseholdMember, MemberRole, User, UserId};
use super::password::{hash_password, verify_password};
use super::preferences::ReminderPreferences;
use crate::storage::RepositoryError;

const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;
const MAX_EMAIL_LEN: usize = 320;
const MIN_HOUSEHOLD_NAME_LEN: usize = 2;
const MAX_HOUSEHOLD_NAME_LEN: usize = 120;
const TOKEN_LEN: usize = 32;

/// Inbound signup payload.
#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

/// Inbound login payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Inbound payload for creating a household.
#[derive(Debug, Clone, Deserialize)]
pub struct HouseholdDraft {
    pub name: String,
}

/// Password-free projection of a user for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

/// Issued bearer credential.
#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: &'static str,
}

#[derive(Debug, Clone)]
struct Session {
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

/// Service composing the directory repository with password hashing and a
/// server-side session store for opaque bearer tokens.
pub struct AccountService<D> {
    directory: Arc<D>,
    sessions: Mutex<HashMap<String, Session>>,
    token_ttl: Duration,
}

impl<D> AccountService<D>
where
    D: DirectoryRepository,
{
    pub fn new(directory: Arc<D>, token_ttl_minutes: i64) -> Self {
        Self {
            directory,
            sessions: Mutex::new(HashMap::new()),
            token_ttl: Duration::minutes(token_ttl_minutes),
        }
    }

    pub fn signup(&self, request: SignupRequest) -> Result<UserView, AccountServiceError> {
        let email = normalize_email(&request.email)?;
        let password_len = request.password.chars().count();
        if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password_len) {
            return Err(AccountServiceError::InvalidPassword);
        }

        let user = User {
            id: UserId::random(),
            email,
            password_hash: hash_password(&request.password),
            created_at: Utc::now(),
        };

        let stored = self
            .directory
            .insert_user(user)
            .map_err(|err| match err {
                RepositoryError::Conflict => AccountServiceError::EmailTaken,
                other => other.into(),
            })?;
        info!(user = %stored.id, "account created");
        Ok(UserView::from(&stored))
    }

    pub fn login(&self, request: LoginRequest) -> Result<AccessToken, AccountServiceError> {
        let email = request.email.trim().to_ascii_lowercase();
        let user = self
            .directory
            .user_by_email(&email)?
            .filter(|user| verify_password(&request.password, &user.password_hash))
            .ok_or(AccountServiceError::InvalidCredentials)?;

        let token = issue_token();
        let session = Session {
            user_id: user.id,
            expires_at: Utc::now() + self.token_ttl,
        };
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .insert(token.clone(), session);

        Ok(AccessToken {
            access_token: token,
            token_type: "bearer",
        })
    }

    /// Resolve a bearer token to its user, evicting the session when
    /// expired.
    pub fn authenticate(&self, token: &str) -> Result<User, AccountServiceError> {
        let user_id = {
            let mut sessions = self.sessions.lock().expect("session mutex poisoned");
            match sessions.get(token) {
                Some(session) if session.expires_at > Utc::now() => session.user_id,
                Some(_) => {
                    sessions.remove(token);
                    return Err(AccountServiceError::InvalidToken);
                }
                None => return Err(AccountServiceError::InvalidToken),
            }
        };

        self.directory
            .fetch_user(user_id)?
            .ok_or(AccountServiceError::InvalidToken)
    }

    pub fn create_household(
        &self,
        user: &User,
        draft: HouseholdDraft,
    ) -> Result<Household, AccountServiceError> {
        let name = draft.name.trim().to_string();
        if !(MIN_HOUSEHOLD_NAME_LEN..=MAX_HOUSEHOLD_NAME_LEN).contains(&name.chars().count()) {
            return Err(AccountServiceError::InvalidHouseholdName);
        }
        if self.directory.membership_for_user(user.id)?.is_some() {
            return Err(AccountServiceError::HouseholdExists);
        }

        let now = Utc::now();
        let household = Household {
            id: HouseholdId::random(),
            name,
            created_at: now,
        };
        let admin = HouseholdMember {
            household_id: household.id,
            user_id: user.id,
            role: MemberRole::Admin,
            created_at: now,
        };

        let stored = self.directory.insert_household(household, admin)?;
        info!(
            household = %stored.id,
            founder = %user.id,
            role = MemberRole::Admin.label(),
            "household created"
        );
        Ok(stored)
    }

    /// The household backing every fleet operation for this user.
    pub fn current_household(&self, user: &User) -> Result<Household, AccountServiceError> {
        let membership = self
            .directory
            .membership_for_user(user.id)?
            .ok_or(AccountServiceError::NoHousehold)?;
        self.directory
            .fetch_household(membership.household_id)?
            .ok_or(AccountServiceError::NoHousehold)
    }

    pub fn reminder_preferences(
        &self,
        user: &User,
    ) -> Result<ReminderPreferences, AccountServiceError> {
        Ok(self
            .directory
            .preferences_for_user(user.id)?
            .unwrap_or_else(ReminderPreferences::defaults))
    }

    pub fn save_reminder_preferences(
        &self,
        user: &User,
        preferences: ReminderPreferences,
    ) -> Result<ReminderPreferences, AccountServiceError> {
        let normalized = preferences.normalized();
        self.directory
            .upsert_preferences(user.id, normalized.clone())?;
        Ok(normalized)
    }
}

fn normalize_email(raw: &str) -> Result<String, AccountServiceError> {
    let email = raw.trim().to_ascii_lowercase();
    let shape_ok = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
    });
    if email.len() > MAX_EMAIL_LEN || !shape_ok {
        return Err(AccountServiceError::InvalidEmail);
    }
    Ok(email)
}

fn issue_token() -> String {
    let mut bytes = [0u8; TOKEN_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Error raised by the account service.
#[derive(Debug, thiserror::Error)]
pub enum AccountServiceError {
    #[error("email already registered")]
    EmailTaken,
    #[error("email address is not valid")]
    InvalidEmail,
    #[error(
        "password must be between {} and {} characters",
        MIN_PASSWORD_LEN,
        MAX_PASSWORD_LEN
    )]
    InvalidPassword,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error(
        "household name must be between {} and {} characters",
        MIN_HOUSEHOLD_NAME_LEN,
        MAX_HOUSEHOLD_NAME_LEN
    )]
    InvalidHouseholdName,
    #[error("household already exists for this user")]
    HouseholdExists,
    #[error("no household found; create a household first")]
    NoHousehold,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl IntoResponse for AccountServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            AccountServiceError::EmailTaken
            | AccountServiceError::HouseholdExists
            | AccountServiceError::NoHousehold
            | AccountServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            AccountServiceError::InvalidCredentials | AccountServiceError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AccountServiceError::InvalidEmail
            | AccountServiceError::InvalidPassword
            | AccountServiceError::InvalidHouseholdName => StatusCode::UNPROCESSABLE_ENTITY,
            AccountServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            AccountServiceError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
