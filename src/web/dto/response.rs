//! Response DTOs for Web API.

use serde::Serialize;
use utoipa::ToSchema;

use crate::datetime::to_rfc3339;
use crate::db::User;
use crate::file::{FileMetadata, Folder, FolderDeletion, FolderNode};

// ============================================================================
// Generic Response Wrappers
// ============================================================================

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Plain message response.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// Auth
// ============================================================================

/// User profile with storage counters.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Quota in bytes.
    pub storage_quota: i64,
    /// Bytes used by live files.
    pub storage_used: i64,
    /// Bytes left before the quota is reached.
    pub storage_available: i64,
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            storage_quota: user.storage_quota,
            storage_used: user.storage_used,
            storage_available: user.storage_available(),
            created_at: to_rfc3339(&user.created_at),
        }
    }
}

/// Register and login response.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    /// Bearer token (JWT).
    pub token: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
    pub user: UserResponse,
}

// ============================================================================
// Folders
// ============================================================================

/// Folder response.
#[derive(Debug, Serialize, ToSchema)]
pub struct FolderResponse {
    pub id: i64,
    pub name: String,
    /// Parent folder ID; null for root folders.
    pub parent_id: Option<i64>,
    /// Materialized path, e.g. `/a/b`.
    pub path: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Folder> for FolderResponse {
    fn from(folder: Folder) -> Self {
        Self {
            id: folder.id,
            name: folder.name,
            parent_id: folder.parent_id,
            path: folder.path,
            created_at: to_rfc3339(&folder.created_at),
            updated_at: to_rfc3339(&folder.updated_at),
        }
    }
}

/// Folder tree node.
#[derive(Debug, Serialize, ToSchema)]
pub struct FolderTreeNode {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub path: String,
    pub created_at: String,
    pub updated_at: String,
    pub children: Vec<FolderTreeNode>,
}

impl From<FolderNode> for FolderTreeNode {
    fn from(node: FolderNode) -> Self {
        let FolderNode { folder, children } = node;
        Self {
            id: folder.id,
            name: folder.name,
            parent_id: folder.parent_id,
            path: folder.path,
            created_at: to_rfc3339(&folder.created_at),
            updated_at: to_rfc3339(&folder.updated_at),
            children: children.into_iter().map(FolderTreeNode::from).collect(),
        }
    }
}

/// Folder delete response.
#[derive(Debug, Serialize, ToSchema)]
pub struct FolderDeleteResponse {
    pub message: String,
    /// Files removed with the folder subtree.
    pub files_removed: usize,
    /// Bytes released from the quota.
    pub bytes_freed: i64,
}

impl From<FolderDeletion> for FolderDeleteResponse {
    fn from(deletion: FolderDeletion) -> Self {
        Self {
            message: "Folder deleted successfully".to_string(),
            files_removed: deletion.files_removed,
            bytes_freed: deletion.bytes_freed,
        }
    }
}

// ============================================================================
// Files
// ============================================================================

/// File metadata response.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileResponse {
    pub id: i64,
    /// Stored name on disk.
    pub name: String,
    /// Display name.
    pub original_name: String,
    /// Size in bytes.
    pub file_size: i64,
    pub mime_type: String,
    /// Containing folder; null for root.
    pub folder_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<FileMetadata> for FileResponse {
    fn from(file: FileMetadata) -> Self {
        Self {
            mime_type: file.content_type().to_string(),
            id: file.id,
            name: file.name,
            original_name: file.original_name,
            file_size: file.file_size,
            folder_id: file.folder_id,
            created_at: to_rfc3339(&file.created_at),
            updated_at: to_rfc3339(&file.updated_at),
        }
    }
}

/// Upload response.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    pub files: Vec<FileResponse>,
    /// Sum of the uploaded file sizes in bytes.
    #[serde(rename = "totalSize")]
    pub total_size: i64,
}

impl UploadResponse {
    pub fn new(files: Vec<FileMetadata>) -> Self {
        let total_size = files.iter().map(|f| f.file_size).sum();
        Self {
            message: format!("{} file(s) uploaded successfully", files.len()),
            files: files.into_iter().map(FileResponse::from).collect(),
            total_size,
        }
    }
}

// ============================================================================
// Health
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(id: i64, parent_id: Option<i64>, path: &str) -> Folder {
        Folder {
            id,
            name: path.rsplit('/').next().unwrap_or_default().to_string(),
            parent_id,
            user_id: 1,
            path: path.to_string(),
            created_at: "2024-01-15 10:30:00".to_string(),
            updated_at: "2024-01-15 10:30:00".to_string(),
        }
    }

    fn file(id: i64, size: i64, mime_type: Option<&str>) -> FileMetadata {
        FileMetadata {
            id,
            name: format!("f-{id}.bin"),
            original_name: format!("f{id}.bin"),
            file_path: format!("1/f-{id}.bin"),
            file_size: size,
            mime_type: mime_type.map(str::to_string),
            folder_id: None,
            user_id: 1,
            created_at: "2024-01-15 10:30:00".to_string(),
            updated_at: "2024-01-15 10:30:00".to_string(),
        }
    }

    #[test]
    fn test_api_response_envelope() {
        let json = serde_json::to_value(ApiResponse::new(MessageResponse::new("ok"))).unwrap();
        assert_eq!(json["data"]["message"], "ok");
    }

    #[test]
    fn test_user_response_storage_fields() {
        let user = User {
            id: 5,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "hash".to_string(),
            storage_quota: 1000,
            storage_used: 400,
            created_at: "2024-01-15 10:30:00".to_string(),
            updated_at: "2024-01-15 10:30:00".to_string(),
        };
        let json = serde_json::to_value(UserResponse::from(&user)).unwrap();
        assert_eq!(json["storage_available"], 600);
        assert_eq!(json["created_at"], "2024-01-15T10:30:00Z");
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_folder_tree_node_nests_children() {
        let node = FolderNode {
            folder: folder(1, None, "/a"),
            children: vec![FolderNode {
                folder: folder(2, Some(1), "/a/b"),
                children: vec![],
            }],
        };
        let json = serde_json::to_value(FolderTreeNode::from(node)).unwrap();
        assert_eq!(json["path"], "/a");
        assert_eq!(json["children"][0]["path"], "/a/b");
        assert_eq!(json["children"][0]["parent_id"], 1);
        assert_eq!(json["children"][0]["children"], serde_json::json!([]));
    }

    #[test]
    fn test_file_response_defaults_mime_type() {
        let json = serde_json::to_value(FileResponse::from(file(1, 10, None))).unwrap();
        assert_eq!(json["mime_type"], "application/octet-stream");
        assert!(json.get("file_path").is_none());
    }

    #[test]
    fn test_upload_response_total_size() {
        let response = UploadResponse::new(vec![
            file(1, 10, Some("text/plain")),
            file(2, 32, Some("image/png")),
        ]);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["totalSize"], 42);
        assert_eq!(json["files"].as_array().unwrap().len(), 2);
        assert_eq!(json["message"], "2 file(s) uploaded successfully");
    }
}
