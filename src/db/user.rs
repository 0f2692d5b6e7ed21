//! User model for Drivebox.

/// A registered account with its storage counters.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Login username (unique, case-insensitive).
    pub username: String,
    /// Email address (unique, case-insensitive).
    pub email: String,
    /// Password hash (Argon2).
    pub password_hash: String,
    /// Storage allotment in bytes.
    pub storage_quota: i64,
    /// Bytes currently used by live files.
    pub storage_used: i64,
    /// Account creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl User {
    /// Bytes still available under the quota.
    pub fn storage_available(&self) -> i64 {
        (self.storage_quota - self.storage_used).max(0)
    }

    /// Usage as a percentage of the quota, rounded to two decimals.
    pub fn usage_percent(&self) -> f64 {
        if self.storage_quota <= 0 {
            return 100.0;
        }
        let pct = self.storage_used as f64 * 100.0 / self.storage_quota as f64;
        (pct * 100.0).round() / 100.0
    }
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login username.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Password hash (should be pre-hashed with Argon2).
    pub password_hash: String,
    /// Storage quota in bytes (None = schema default).
    pub storage_quota: Option<i64>,
}

impl NewUser {
    /// Create a new user with the required fields.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            storage_quota: None,
        }
    }

    /// Set the storage quota.
    pub fn with_quota(mut self, quota: i64) -> Self {
        self.storage_quota = Some(quota);
        self
    }
}
