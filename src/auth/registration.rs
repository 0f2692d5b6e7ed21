//! Account registration and login for Drivebox.

use thiserror::Error;
use tracing::{info, warn};

use crate::auth::validation::{validate_email, validate_username, ValidationError};
use crate::auth::{hash_password, validate_password, verify_password, PasswordError};
use crate::db::{NewUser, User, UserRepository};
use crate::DriveError;

/// Registration-specific errors.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Validation failed.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Username or email already exists.
    #[error("username or email already exists")]
    AlreadyExists,

    /// Password rejected or hashing failed.
    #[error("{0}")]
    Password(#[from] PasswordError),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

impl From<DriveError> for RegistrationError {
    fn from(err: DriveError) -> Self {
        if err.is_unique_violation() {
            RegistrationError::AlreadyExists
        } else {
            RegistrationError::Database(err.to_string())
        }
    }
}

/// Registration request data.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegistrationRequest {
    /// Create a new registration request.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Account policy applied at registration.
#[derive(Debug, Clone, Copy)]
pub struct RegistrationPolicy {
    /// Minimum password length in characters.
    pub min_password_length: usize,
    /// Quota assigned to the new account in bytes.
    pub storage_quota: i64,
}

/// Register a new user.
///
/// This function:
/// 1. Validates username, email and password
/// 2. Rejects a username or email that is already taken
/// 3. Hashes the password
/// 4. Creates the user with the policy's quota
///
/// A concurrent registration that wins the race between steps 2 and 4 is
/// caught by the UNIQUE constraints and reported as `AlreadyExists`.
pub async fn register(
    repo: &UserRepository<'_>,
    request: &RegistrationRequest,
    policy: RegistrationPolicy,
) -> Result<User, RegistrationError> {
    let username = request.username.trim();
    let email = request.email.trim();

    validate_username(username)?;
    validate_email(email)?;
    validate_password(&request.password, policy.min_password_length)?;

    if repo.exists_username_or_email(username, email).await? {
        return Err(RegistrationError::AlreadyExists);
    }

    let password_hash = hash_password(&request.password)?;
    let new_user =
        NewUser::new(username, email, password_hash).with_quota(policy.storage_quota);
    let user = repo.create(&new_user).await?;

    info!(user_id = user.id, username = %user.username, "User registered");
    Ok(user)
}

/// Authenticate by username or email.
///
/// Unknown accounts and wrong passwords produce the same error so the
/// response does not reveal which accounts exist.
pub async fn authenticate(
    repo: &UserRepository<'_>,
    login: &str,
    password: &str,
) -> crate::Result<User> {
    let invalid = || DriveError::Auth("Invalid credentials".to_string());

    let Some(user) = repo.get_by_login(login.trim()).await? else {
        warn!(login = %login, "Login failed: unknown account");
        return Err(invalid());
    };

    if verify_password(password, &user.password_hash).is_err() {
        warn!(user_id = user.id, "Login failed: wrong password");
        return Err(invalid());
    }

    info!(user_id = user.id, "User logged in");
    Ok(user)
}
