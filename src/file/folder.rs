//! Folder types and repository for Drivebox.
//!
//! Reads go through the pool. Structural changes (rename, move, delete) take
//! a connection so the caller can run them inside one transaction.

use sqlx::{SqliteConnection, SqlitePool};

use super::path;
use crate::{DriveError, Result};

const FOLDER_COLUMNS: &str = "id, name, parent_id, user_id, path, created_at, updated_at";

/// A folder owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Folder {
    /// Unique folder ID.
    pub id: i64,
    /// Folder name.
    pub name: String,
    /// Parent folder ID (None for root folders).
    pub parent_id: Option<i64>,
    /// Owner.
    pub user_id: i64,
    /// Materialized path, e.g. `/a/b`.
    pub path: String,
    /// When the folder was created.
    pub created_at: String,
    /// When the folder was last renamed or moved.
    pub updated_at: String,
}

/// Data for creating a new folder.
#[derive(Debug, Clone)]
pub struct NewFolder {
    pub name: String,
    pub parent_id: Option<i64>,
    pub user_id: i64,
    pub path: String,
}

impl NewFolder {
    /// Create a root folder entry.
    pub fn new(user_id: i64, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: path::join(None, &name),
            name,
            parent_id: None,
            user_id,
        }
    }

    /// Place the folder under `parent`, deriving the path from it.
    pub fn with_parent(mut self, parent: &Folder) -> Self {
        self.parent_id = Some(parent.id);
        self.path = path::join(Some(&parent.path), &self.name);
        self
    }
}

/// Which folders a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderScope {
    /// Direct children of a folder, or root folders for `None`.
    Children(Option<i64>),
    /// Every folder of the user.
    All,
}

/// A file row inside a folder subtree, as needed for cleanup.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SubtreeFile {
    pub id: i64,
    pub file_path: String,
    pub file_size: i64,
}

/// Repository for folder operations.
pub struct FolderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FolderRepository<'a> {
    /// Create a new FolderRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new folder.
    ///
    /// A sibling with the same name violates the unique index and surfaces
    /// as a UNIQUE constraint database error.
    pub async fn create(&self, folder: &NewFolder) -> Result<Folder> {
        let result = sqlx::query(
            "INSERT INTO folders (name, parent_id, user_id, path) VALUES (?, ?, ?, ?)",
        )
        .bind(&folder.name)
        .bind(folder.parent_id)
        .bind(folder.user_id)
        .bind(&folder.path)
        .execute(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        self.get_owned(result.last_insert_rowid(), folder.user_id)
            .await?
            .ok_or_else(|| DriveError::NotFound("Folder".to_string()))
    }

    /// Get a folder by ID if it belongs to `user_id`.
    pub async fn get_owned(&self, id: i64, user_id: i64) -> Result<Option<Folder>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_owned_in(&mut conn, id, user_id).await
    }

    /// Same as [`get_owned`](Self::get_owned) on a caller-supplied connection.
    pub async fn get_owned_in(
        conn: &mut SqliteConnection,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Folder>> {
        let sql = format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ? AND user_id = ?");
        let folder = sqlx::query_as::<_, Folder>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(conn)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(folder)
    }

    /// List folders ordered by name.
    pub async fn list(&self, user_id: i64, scope: FolderScope) -> Result<Vec<Folder>> {
        let query = match scope {
            FolderScope::Children(parent_id) => {
                let sql = format!(
                    "SELECT {FOLDER_COLUMNS} FROM folders
                     WHERE user_id = ? AND parent_id IS ? ORDER BY name, id"
                );
                sqlx::query_as::<_, Folder>(&sql)
                    .bind(user_id)
                    .bind(parent_id)
                    .fetch_all(self.pool)
                    .await
            }
            FolderScope::All => {
                let sql = format!(
                    "SELECT {FOLDER_COLUMNS} FROM folders WHERE user_id = ? ORDER BY name, id"
                );
                sqlx::query_as::<_, Folder>(&sql)
                    .bind(user_id)
                    .fetch_all(self.pool)
                    .await
            }
        };

        query.map_err(|e| DriveError::Database(e.to_string()))
    }

    /// List every folder of the user ordered by path (parents before children).
    pub async fn list_by_path(&self, user_id: i64) -> Result<Vec<Folder>> {
        let sql = format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE user_id = ? ORDER BY path");
        sqlx::query_as::<_, Folder>(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))
    }

    /// Whether a sibling named `name` exists under `parent_id`.
    ///
    /// `exclude_id` skips the folder being renamed or moved.
    pub async fn sibling_exists_in(
        conn: &mut SqliteConnection,
        user_id: i64,
        parent_id: Option<i64>,
        name: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM folders
             WHERE user_id = ? AND parent_id IS ? AND name = ? AND id IS NOT ?)",
        )
        .bind(user_id)
        .bind(parent_id)
        .bind(name)
        .bind(exclude_id)
        .fetch_one(conn)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(exists)
    }

    /// Set a folder's name, parent and path.
    pub async fn relocate_in(
        conn: &mut SqliteConnection,
        folder: &Folder,
        name: &str,
        parent_id: Option<i64>,
        new_path: &str,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE folders SET name = ?, parent_id = ?, path = ?, updated_at = datetime('now')
             WHERE id = ? AND user_id = ?",
        )
        .bind(name)
        .bind(parent_id)
        .bind(new_path)
        .bind(folder.id)
        .bind(folder.user_id)
        .execute(conn)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(())
    }

    /// Rewrite the paths of every descendant of `old_path` to live under `new_path`.
    ///
    /// Matching uses `substr` on the `old_path/` prefix so `%` and `_` in
    /// folder names are literal. SQLite's `substr` counts characters, hence
    /// the `chars().count()` lengths. Returns the number of rewritten rows.
    pub async fn rewrite_descendant_paths_in(
        conn: &mut SqliteConnection,
        user_id: i64,
        old_path: &str,
        new_path: &str,
    ) -> Result<u64> {
        let old_prefix = path::descendant_prefix(old_path);
        let new_prefix = path::descendant_prefix(new_path);
        let old_len = old_prefix.chars().count() as i64;

        let result = sqlx::query(
            "UPDATE folders SET path = ? || substr(path, ? + 1), updated_at = datetime('now')
             WHERE user_id = ? AND substr(path, 1, ?) = ?",
        )
        .bind(&new_prefix)
        .bind(old_len)
        .bind(user_id)
        .bind(old_len)
        .bind(&old_prefix)
        .execute(conn)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    /// Files stored anywhere in the folder's subtree, the folder included.
    pub async fn subtree_files_in(
        conn: &mut SqliteConnection,
        folder: &Folder,
    ) -> Result<Vec<SubtreeFile>> {
        let prefix = path::descendant_prefix(&folder.path);
        let prefix_len = prefix.chars().count() as i64;

        sqlx::query_as::<_, SubtreeFile>(
            "SELECT id, file_path, file_size FROM files
             WHERE user_id = ? AND folder_id IN (
                 SELECT id FROM folders
                 WHERE user_id = ? AND (id = ? OR substr(path, 1, ?) = ?)
             )",
        )
        .bind(folder.user_id)
        .bind(folder.user_id)
        .bind(folder.id)
        .bind(prefix_len)
        .bind(&prefix)
        .fetch_all(conn)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))
    }

    /// Delete a folder. Descendant folders and files go with it via cascade.
    pub async fn delete_in(conn: &mut SqliteConnection, id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM folders WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(conn)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, NewUser, UserRepository};

    async fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool())
            .create(&NewUser::new("alice", "alice@example.com", "hash"))
            .await
            .unwrap();
        (db, user.id)
    }

    #[tokio::test]
    async fn test_create_root_and_child() {
        let (db, user_id) = setup().await;
        let repo = FolderRepository::new(db.pool());

        let root = repo.create(&NewFolder::new(user_id, "Docs")).await.unwrap();
        assert_eq!(root.path, "/Docs");
        assert_eq!(root.parent_id, None);

        let child = repo
            .create(&NewFolder::new(user_id, "Work").with_parent(&root))
            .await
            .unwrap();
        assert_eq!(child.path, "/Docs/Work");
        assert_eq!(child.parent_id, Some(root.id));
    }

    #[tokio::test]
    async fn test_unique_sibling_index_covers_root() {
        let (db, user_id) = setup().await;
        let repo = FolderRepository::new(db.pool());

        repo.create(&NewFolder::new(user_id, "Docs")).await.unwrap();
        let err = repo
            .create(&NewFolder::new(user_id, "Docs"))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_get_owned_filters_by_user() {
        let (db, user_id) = setup().await;
        let other = UserRepository::new(db.pool())
            .create(&NewUser::new("bob", "bob@example.com", "hash"))
            .await
            .unwrap();
        let repo = FolderRepository::new(db.pool());

        let folder = repo.create(&NewFolder::new(user_id, "Docs")).await.unwrap();
        assert!(repo.get_owned(folder.id, user_id).await.unwrap().is_some());
        assert!(repo.get_owned(folder.id, other.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_scopes() {
        let (db, user_id) = setup().await;
        let repo = FolderRepository::new(db.pool());

        let b = repo.create(&NewFolder::new(user_id, "b")).await.unwrap();
        repo.create(&NewFolder::new(user_id, "a")).await.unwrap();
        repo.create(&NewFolder::new(user_id, "c").with_parent(&b))
            .await
            .unwrap();

        let roots = repo
            .list(user_id, FolderScope::Children(None))
            .await
            .unwrap();
        let names: Vec<_> = roots.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);

        let children = repo
            .list(user_id, FolderScope::Children(Some(b.id)))
            .await
            .unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "c");

        assert_eq!(repo.list(user_id, FolderScope::All).await.unwrap().len(), 3);

        let by_path: Vec<_> = repo
            .list_by_path(user_id)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.path)
            .collect();
        assert_eq!(by_path, vec!["/a", "/b", "/b/c"]);
    }

    #[tokio::test]
    async fn test_rewrite_descendant_paths_is_literal_prefix() {
        let (db, user_id) = setup().await;
        let repo = FolderRepository::new(db.pool());

        let pct = repo.create(&NewFolder::new(user_id, "a%")).await.unwrap();
        let child = repo
            .create(&NewFolder::new(user_id, "x").with_parent(&pct))
            .await
            .unwrap();
        // Would match `a%/%` under LIKE semantics
        let decoy = repo.create(&NewFolder::new(user_id, "ab")).await.unwrap();
        repo.create(&NewFolder::new(user_id, "y").with_parent(&decoy))
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let rewritten =
            FolderRepository::rewrite_descendant_paths_in(&mut conn, user_id, "/a%", "/renamed")
                .await
                .unwrap();
        drop(conn);

        assert_eq!(rewritten, 1);
        let child = repo.get_owned(child.id, user_id).await.unwrap().unwrap();
        assert_eq!(child.path, "/renamed/x");
        let paths: Vec<_> = repo
            .list_by_path(user_id)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.path)
            .collect();
        assert!(paths.contains(&"/ab/y".to_string()));
    }

    #[tokio::test]
    async fn test_rewrite_handles_multibyte_names() {
        let (db, user_id) = setup().await;
        let repo = FolderRepository::new(db.pool());

        let root = repo.create(&NewFolder::new(user_id, "日本")).await.unwrap();
        let child = repo
            .create(&NewFolder::new(user_id, "写真").with_parent(&root))
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        FolderRepository::rewrite_descendant_paths_in(&mut conn, user_id, "/日本", "/Japan")
            .await
            .unwrap();
        drop(conn);

        let child = repo.get_owned(child.id, user_id).await.unwrap().unwrap();
        assert_eq!(child.path, "/Japan/写真");
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let (db, user_id) = setup().await;
        let repo = FolderRepository::new(db.pool());

        let root = repo.create(&NewFolder::new(user_id, "a")).await.unwrap();
        let child = repo
            .create(&NewFolder::new(user_id, "b").with_parent(&root))
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(FolderRepository::delete_in(&mut conn, root.id, user_id)
            .await
            .unwrap());
        assert!(!FolderRepository::delete_in(&mut conn, root.id, user_id)
            .await
            .unwrap());
        drop(conn);

        assert!(repo.get_owned(child.id, user_id).await.unwrap().is_none());
    }
}
