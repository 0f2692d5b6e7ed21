//! Request DTOs for Web API.

use serde::{Deserialize, Deserializer};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::validation::{not_empty_trimmed, single_line_name};
use crate::file::{FileListQuery, FileScope, FileSort, FolderScope};

/// Deserialize an optional folder ID sent as a number, a numeric string,
/// an empty string or null.
///
/// Form fields and query strings carry IDs as text; an empty value means
/// the root folder.
pub fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(i64),
        Text(String),
    }

    match Option::<RawId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawId::Int(id)) => Ok(Some(id)),
        Some(RawId::Text(s)) => parse_optional_id(&s).map_err(serde::de::Error::custom),
    }
}

/// Parse a textual folder ID; empty or `null` means root.
pub fn parse_optional_id(s: &str) -> Result<Option<i64>, String> {
    let s = s.trim();
    if s.is_empty() || s == "null" {
        return Ok(None);
    }
    s.parse::<i64>()
        .map(Some)
        .map_err(|_| format!("invalid folder id: {s}"))
}

fn is_true(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("true") | Some("1"))
}

/// Registration request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// Username.
    #[validate(custom(function = "not_empty_trimmed"))]
    pub username: String,
    /// Email address.
    #[validate(custom(function = "not_empty_trimmed"))]
    pub email: String,
    /// Password.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// Username or email address.
    #[validate(custom(function = "not_empty_trimmed"))]
    pub username: String,
    /// Password.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Create folder request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    /// Folder name.
    #[validate(
        length(max = 255, message = "Name must be at most 255 characters"),
        custom(function = "single_line_name")
    )]
    pub name: String,
    /// Parent folder ID; absent or empty creates a root folder.
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub parent_id: Option<i64>,
}

/// Rename request, shared by folders and files.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RenameRequest {
    /// New name.
    #[validate(
        length(max = 255, message = "Name must be at most 255 characters"),
        custom(function = "single_line_name")
    )]
    pub name: String,
}

/// Move folder request.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoveFolderRequest {
    /// New parent folder ID; absent or null moves the folder to the root.
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub parent_id: Option<i64>,
}

/// Move file request.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoveFileRequest {
    /// Target folder ID; absent or null moves the file to the root.
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub folder_id: Option<i64>,
}

/// Query parameters for folder listings.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct FolderListParams {
    /// Parent folder ID; absent or empty lists root folders.
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub parent_id: Option<i64>,
    /// `true` lists every folder of the user.
    pub all: Option<String>,
}

impl FolderListParams {
    /// Resolve the listing scope.
    pub fn scope(&self) -> FolderScope {
        if is_true(self.all.as_deref()) {
            FolderScope::All
        } else {
            FolderScope::Children(self.parent_id)
        }
    }
}

/// Query parameters for file listings.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct FileListParams {
    /// Folder ID; absent or empty lists root files.
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub folder_id: Option<i64>,
    /// Substring matched against the original and stored names.
    pub search: Option<String>,
    /// One of name, original_name, file_size, created_at.
    pub sort_by: Option<String>,
    /// ASC or DESC, case-insensitive.
    pub sort_order: Option<String>,
    /// `true` lists files across every folder.
    pub all: Option<String>,
}

impl FileListParams {
    /// Convert into a repository query.
    pub fn to_query(&self) -> FileListQuery {
        let scope = if is_true(self.all.as_deref()) {
            FileScope::All
        } else {
            FileScope::Folder(self.folder_id)
        };
        let search = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        FileListQuery {
            scope,
            search,
            sort: FileSort::from_params(self.sort_by.as_deref(), self.sort_order.as_deref()),
        }
    }
}

/// Query parameters for download and preview.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TokenQuery {
    /// Access token for clients that cannot set an Authorization header.
    pub token: Option<String>,
}
