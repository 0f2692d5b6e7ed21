//! Database schema and migrations for Drivebox.
//!
//! This module contains all database migrations that will be applied
//! sequentially when the database is first opened or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Users with quota counters
    r#"
CREATE TABLE users (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    username       TEXT NOT NULL UNIQUE COLLATE NOCASE,
    email          TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash  TEXT NOT NULL,            -- Argon2 hash
    storage_quota  INTEGER NOT NULL DEFAULT 1073741824,
    storage_used   INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at     TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
    // v2: Folder hierarchy with materialized path
    r#"
CREATE TABLE folders (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    parent_id   INTEGER REFERENCES folders(id) ON DELETE CASCADE,  -- NULL = root
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    path        TEXT NOT NULL,                                     -- e.g. /a/b
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_folders_user_parent ON folders(user_id, parent_id);
CREATE INDEX idx_folders_user_path ON folders(user_id, path);
-- Sibling names are unique per user, root level included
CREATE UNIQUE INDEX idx_folders_sibling_name ON folders(user_id, IFNULL(parent_id, 0), name);
"#,
    // v3: File metadata
    r#"
CREATE TABLE files (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    name           TEXT NOT NULL,            -- stored name on disk
    original_name  TEXT NOT NULL,            -- name shown to the user
    file_path      TEXT NOT NULL,            -- relative to the storage root
    file_size      INTEGER NOT NULL,
    mime_type      TEXT,
    folder_id      INTEGER REFERENCES folders(id) ON DELETE CASCADE,  -- NULL = root
    user_id        INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at     TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at     TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_files_user_folder ON files(user_id, folder_id);
CREATE INDEX idx_files_user_name ON files(user_id, original_name);
"#,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_not_empty() {
        assert!(!MIGRATIONS.is_empty());
    }

    #[test]
    fn test_users_migration_has_quota_columns() {
        let v1 = MIGRATIONS[0];
        assert!(v1.contains("CREATE TABLE users"));
        assert!(v1.contains("storage_quota"));
        assert!(v1.contains("storage_used"));
    }

    #[test]
    fn test_folders_cascade_on_delete() {
        let v2 = MIGRATIONS[1];
        assert!(v2.contains("CREATE TABLE folders"));
        assert!(v2.contains("parent_id   INTEGER REFERENCES folders(id) ON DELETE CASCADE"));
        assert!(v2.contains("idx_folders_sibling_name"));
    }

    #[test]
    fn test_files_cascade_on_folder_delete() {
        let v3 = MIGRATIONS[2];
        assert!(v3.contains("CREATE TABLE files"));
        assert!(v3.contains("folder_id      INTEGER REFERENCES folders(id) ON DELETE CASCADE"));
    }
}
