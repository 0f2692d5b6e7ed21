//! File metadata types and repository for Drivebox.

use std::fmt;

use sqlx::{QueryBuilder, SqliteConnection, SqlitePool};

use crate::{DriveError, Result};

const FILE_COLUMNS: &str = "id, name, original_name, file_path, file_size, mime_type, \
                            folder_id, user_id, created_at, updated_at";

/// Metadata for a stored file.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FileMetadata {
    /// Unique file ID.
    pub id: i64,
    /// Stored filename on disk.
    pub name: String,
    /// Name shown to the user.
    pub original_name: String,
    /// Path relative to the storage root.
    pub file_path: String,
    /// File size in bytes.
    pub file_size: i64,
    /// MIME type recorded at upload.
    pub mime_type: Option<String>,
    /// Containing folder (None = root).
    pub folder_id: Option<i64>,
    /// Owner.
    pub user_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl FileMetadata {
    /// MIME type for responses, defaulting to `application/octet-stream`.
    pub fn content_type(&self) -> &str {
        self.mime_type
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or("application/octet-stream")
    }
}

/// Data for creating a new file entry.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub name: String,
    pub original_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub folder_id: Option<i64>,
    pub user_id: i64,
}

/// Sortable columns for file listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    Name,
    OriginalName,
    FileSize,
    CreatedAt,
}

impl SortColumn {
    /// Parse a whitelisted column name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(Self::Name),
            "original_name" => Some(Self::OriginalName),
            "file_size" => Some(Self::FileSize),
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    /// Column name in SQL.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::OriginalName => "original_name",
            Self::FileSize => "file_size",
            Self::CreatedAt => "created_at",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Parse `ASC` or `DESC`, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Some(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Some(Self::Desc)
        } else {
            None
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Sort specification for file listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileSort {
    pub column: SortColumn,
    pub order: SortOrder,
}

impl FileSort {
    /// Build from raw query parameters.
    ///
    /// Absent values take their defaults; if either value is present but
    /// not recognized the whole sort falls back to `name ASC`.
    pub fn from_params(sort_by: Option<&str>, sort_order: Option<&str>) -> Self {
        let column = match sort_by.filter(|s| !s.is_empty()) {
            None => Some(SortColumn::default()),
            Some(s) => SortColumn::parse(s),
        };
        let order = match sort_order.filter(|s| !s.is_empty()) {
            None => Some(SortOrder::default()),
            Some(s) => SortOrder::parse(s),
        };

        match (column, order) {
            (Some(column), Some(order)) => Self { column, order },
            _ => Self::default(),
        }
    }
}

impl fmt::Display for FileSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column.as_sql(), self.order.as_sql())
    }
}

/// Which files a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileScope {
    /// Files directly in a folder, or at the root for `None`.
    Folder(Option<i64>),
    /// Every file of the user.
    All,
}

/// Parameters for listing files.
#[derive(Debug, Clone)]
pub struct FileListQuery {
    pub scope: FileScope,
    /// Substring matched against original and stored names.
    pub search: Option<String>,
    pub sort: FileSort,
}

impl Default for FileListQuery {
    fn default() -> Self {
        Self {
            scope: FileScope::Folder(None),
            search: None,
            sort: FileSort::default(),
        }
    }
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
pub fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Repository for file metadata operations.
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a file row on a caller-supplied connection and return its ID.
    pub async fn insert_in(conn: &mut SqliteConnection, file: &NewFile) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO files (name, original_name, file_path, file_size, mime_type, folder_id, user_id)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&file.name)
        .bind(&file.original_name)
        .bind(&file.file_path)
        .bind(file.file_size)
        .bind(&file.mime_type)
        .bind(file.folder_id)
        .bind(file.user_id)
        .execute(conn)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    /// Get a file by ID if it belongs to `user_id`.
    pub async fn get_owned(&self, id: i64, user_id: i64) -> Result<Option<FileMetadata>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_owned_in(&mut conn, id, user_id).await
    }

    /// Same as [`get_owned`](Self::get_owned) on a caller-supplied connection.
    pub async fn get_owned_in(
        conn: &mut SqliteConnection,
        id: i64,
        user_id: i64,
    ) -> Result<Option<FileMetadata>> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ? AND user_id = ?");
        sqlx::query_as::<_, FileMetadata>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(conn)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))
    }

    /// Get several files of one user, in ID order.
    pub async fn get_many(&self, ids: &[i64], user_id: i64) -> Result<Vec<FileMetadata>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE user_id = "
        ));
        query.push_bind(user_id);
        query.push(" AND id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY id");

        query
            .build_query_as::<FileMetadata>()
            .fetch_all(self.pool)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))
    }

    /// List files with optional folder scope, search and sort.
    pub async fn list(&self, user_id: i64, params: &FileListQuery) -> Result<Vec<FileMetadata>> {
        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE user_id = "
        ));
        query.push_bind(user_id);

        if let FileScope::Folder(folder_id) = params.scope {
            query.push(" AND folder_id IS ");
            query.push_bind(folder_id);
        }

        if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(search));
            query.push(" AND (original_name LIKE ");
            query.push_bind(pattern.clone());
            query.push(" ESCAPE '\\' OR name LIKE ");
            query.push_bind(pattern);
            query.push(" ESCAPE '\\')");
        }

        // Column and direction come from whitelisted enums
        query.push(format!(" ORDER BY {}, id", params.sort));

        query
            .build_query_as::<FileMetadata>()
            .fetch_all(self.pool)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))
    }

    /// Change the display name of a file.
    ///
    /// Returns `false` if the file does not exist or belongs to another user.
    pub async fn rename(&self, id: i64, user_id: i64, original_name: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE files SET original_name = ?, updated_at = datetime('now')
             WHERE id = ? AND user_id = ?",
        )
        .bind(original_name)
        .bind(id)
        .bind(user_id)
        .execute(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Move a file to a folder, or to the root for `None`.
    pub async fn move_to(&self, id: i64, user_id: i64, folder_id: Option<i64>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE files SET folder_id = ?, updated_at = datetime('now')
             WHERE id = ? AND user_id = ?",
        )
        .bind(folder_id)
        .bind(id)
        .bind(user_id)
        .execute(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a file row on a caller-supplied connection.
    pub async fn delete_in(conn: &mut SqliteConnection, id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(conn)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
