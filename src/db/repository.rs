//! User repository for Drivebox.
//!
//! This module provides account lookups and storage reconciliation.

use sqlx::SqlitePool;

use super::user::{NewUser, User};
use crate::{DriveError, Result};

const USER_COLUMNS: &str = "id, username, email, password_hash, storage_quota, storage_used, \
                            created_at, updated_at";

/// Result of recomputing a user's `storage_used` from the files table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageDrift {
    pub user_id: i64,
    /// Counter value before reconciliation.
    pub recorded: i64,
    /// Sum of live file sizes.
    pub actual: i64,
}

impl StorageDrift {
    /// Whether the counter disagreed with the files table.
    pub fn drifted(&self) -> bool {
        self.recorded != self.actual
    }
}

/// Repository for user operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user in the database.
    ///
    /// Returns the created user with the assigned ID. A duplicate username
    /// or email surfaces as a UNIQUE constraint database error.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, storage_quota)
             VALUES (?, ?, ?, COALESCE(?, 1073741824))",
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.storage_quota)
        .execute(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DriveError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let result = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Get a user by username or email (case-insensitive).
    pub async fn get_by_login(&self, login: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ? OR email = ?");
        let result = sqlx::query_as::<_, User>(&sql)
            .bind(login)
            .bind(login)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Check whether a username or email is already taken.
    pub async fn exists_username_or_email(&self, username: &str, email: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? OR email = ?)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(exists)
    }

    /// List all users ordered by ID.
    pub async fn list_all(&self) -> Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(self.pool)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(users)
    }

    /// Count all users.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(count)
    }

    /// Recompute `storage_used` from the files table.
    ///
    /// The read and the write share a transaction so a concurrent upload
    /// cannot slip between them.
    pub async fn recalculate_storage_used(&self, user_id: i64) -> Result<StorageDrift> {
        let mut tx = self.pool.begin().await?;

        let recorded: Option<i64> =
            sqlx::query_scalar("SELECT storage_used FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let recorded = recorded.ok_or_else(|| DriveError::NotFound("user".to_string()))?;

        let actual: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(file_size), 0) FROM files WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;

        if recorded != actual {
            sqlx::query(
                "UPDATE users SET storage_used = ?, updated_at = datetime('now') WHERE id = ?",
            )
            .bind(actual)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(StorageDrift {
            user_id,
            recorded,
            actual,
        })
    }
}
