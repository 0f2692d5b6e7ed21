//! Storage quota counters.
//!
//! These run on a caller-supplied connection so they can join the
//! transaction that inserts or deletes the file rows.

use sqlx::SqliteConnection;

use crate::{DriveError, Result};

/// Add `bytes` to the user's `storage_used` if it still fits the quota.
///
/// The check and the increment are one conditional UPDATE, so two
/// concurrent uploads cannot both pass against the same remaining space.
/// Returns `QuotaExceeded` with the current counters when it does not fit.
pub async fn reserve_storage(conn: &mut SqliteConnection, user_id: i64, bytes: i64) -> Result<()> {
    let result = sqlx::query(
        "UPDATE users SET storage_used = storage_used + ?, updated_at = datetime('now')
         WHERE id = ? AND storage_used + ? <= storage_quota",
    )
    .bind(bytes)
    .bind(user_id)
    .bind(bytes)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    let counters: Option<(i64, i64)> =
        sqlx::query_as("SELECT storage_quota, storage_used FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;

    match counters {
        Some((quota, used)) => Err(DriveError::QuotaExceeded {
            quota,
            used,
            required: bytes,
        }),
        None => Err(DriveError::NotFound("user".to_string())),
    }
}

/// Subtract `bytes` from the user's `storage_used`, never going below zero.
pub async fn release_storage(conn: &mut SqliteConnection, user_id: i64, bytes: i64) -> Result<()> {
    sqlx::query(
        "UPDATE users SET storage_used = MAX(storage_used - ?, 0), updated_at = datetime('now')
         WHERE id = ?",
    )
    .bind(bytes)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
