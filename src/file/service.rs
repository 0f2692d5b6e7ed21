//! Folder and file services for Drivebox.
//!
//! This module provides the operations behind the REST surface:
//! - Folder create, list, tree, rename, move and delete
//! - Upload commit with quota accounting
//! - File lookup, rename, move and delete
//!
//! Every operation is scoped to the owning user. A resource of another user
//! is reported as not found.

use tracing::{info, warn};

use crate::db::{release_storage, reserve_storage, Database};
use crate::{DriveError, Result};

use super::folder::{Folder, FolderRepository, FolderScope, NewFolder};
use super::metadata::{FileListQuery, FileMetadata, FileRepository, FileScope, NewFile};
use super::path;
use super::storage::{FileStorage, StagedFile};
use super::tree::{build_tree, FolderNode};

fn folder_not_found() -> DriveError {
    DriveError::NotFound("Folder".to_string())
}

fn file_not_found() -> DriveError {
    DriveError::NotFound("File".to_string())
}

fn sibling_conflict() -> DriveError {
    DriveError::Conflict("A folder with this name already exists in this location".to_string())
}

/// Map a unique-index violation on folder names to a conflict.
fn sibling_violation(err: DriveError) -> DriveError {
    if err.is_unique_violation() {
        sibling_conflict()
    } else {
        err
    }
}

/// Outcome of a folder delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FolderDeletion {
    /// File rows removed with the subtree.
    pub files_removed: usize,
    /// Bytes released from the owner's quota.
    pub bytes_freed: i64,
}

/// Folder service.
pub struct FolderService<'a> {
    db: &'a Database,
    storage: &'a FileStorage,
}

impl<'a> FolderService<'a> {
    /// Create a new FolderService.
    pub fn new(db: &'a Database, storage: &'a FileStorage) -> Self {
        Self { db, storage }
    }

    fn repo(&self) -> FolderRepository<'_> {
        FolderRepository::new(self.db.pool())
    }

    /// Get a folder owned by the user.
    pub async fn get(&self, user_id: i64, id: i64) -> Result<Folder> {
        self.repo()
            .get_owned(id, user_id)
            .await?
            .ok_or_else(folder_not_found)
    }

    /// Create a folder at the root or under `parent_id`.
    pub async fn create(&self, user_id: i64, name: &str, parent_id: Option<i64>) -> Result<Folder> {
        let name = path::validate_name(name)?;

        let mut new_folder = NewFolder::new(user_id, &name);
        if let Some(parent_id) = parent_id {
            let parent = self
                .repo()
                .get_owned(parent_id, user_id)
                .await?
                .ok_or_else(|| DriveError::NotFound("Parent folder".to_string()))?;
            new_folder = new_folder.with_parent(&parent);
        }

        let exists = {
            let mut conn = self.db.pool().acquire().await?;
            FolderRepository::sibling_exists_in(&mut conn, user_id, parent_id, &name, None).await?
        };
        if exists {
            return Err(sibling_conflict());
        }

        let folder = self
            .repo()
            .create(&new_folder)
            .await
            .map_err(sibling_violation)?;

        info!(user_id, folder_id = folder.id, path = %folder.path, "Folder created");
        Ok(folder)
    }

    /// List folders sorted by name.
    pub async fn list(&self, user_id: i64, scope: FolderScope) -> Result<Vec<Folder>> {
        if let FolderScope::Children(Some(parent_id)) = scope {
            self.get(user_id, parent_id).await?;
        }
        self.repo().list(user_id, scope).await
    }

    /// Nested tree of all the user's folders.
    pub async fn tree(&self, user_id: i64) -> Result<Vec<FolderNode>> {
        let folders = self.repo().list_by_path(user_id).await?;
        Ok(build_tree(folders))
    }

    /// Rename a folder and rewrite every descendant path.
    ///
    /// The folder update and the descendant rewrite share one transaction.
    pub async fn rename(&self, user_id: i64, id: i64, new_name: &str) -> Result<Folder> {
        let new_name = path::validate_name(new_name)?;

        let mut tx = self.db.pool().begin().await?;

        let folder = FolderRepository::get_owned_in(&mut tx, id, user_id)
            .await?
            .ok_or_else(folder_not_found)?;
        if folder.name == new_name {
            return Ok(folder);
        }

        if FolderRepository::sibling_exists_in(
            &mut tx,
            user_id,
            folder.parent_id,
            &new_name,
            Some(folder.id),
        )
        .await?
        {
            return Err(sibling_conflict());
        }

        let new_path = path::join(path::parent_of(&folder.path), &new_name);
        FolderRepository::relocate_in(&mut tx, &folder, &new_name, folder.parent_id, &new_path)
            .await
            .map_err(sibling_violation)?;
        let rewritten =
            FolderRepository::rewrite_descendant_paths_in(&mut tx, user_id, &folder.path, &new_path)
                .await?;

        let renamed = FolderRepository::get_owned_in(&mut tx, id, user_id)
            .await?
            .ok_or_else(folder_not_found)?;
        tx.commit().await?;

        info!(
            user_id,
            folder_id = id,
            old_path = %folder.path,
            new_path = %renamed.path,
            descendants = rewritten,
            "Folder renamed"
        );
        Ok(renamed)
    }

    /// Move a folder under another folder, or to the root for `None`.
    ///
    /// Moving a folder into itself or one of its descendants is rejected.
    pub async fn move_folder(
        &self,
        user_id: i64,
        id: i64,
        new_parent_id: Option<i64>,
    ) -> Result<Folder> {
        let mut tx = self.db.pool().begin().await?;

        let folder = FolderRepository::get_owned_in(&mut tx, id, user_id)
            .await?
            .ok_or_else(folder_not_found)?;

        let target = match new_parent_id {
            Some(parent_id) => Some(
                FolderRepository::get_owned_in(&mut tx, parent_id, user_id)
                    .await?
                    .ok_or_else(|| DriveError::NotFound("Target folder".to_string()))?,
            ),
            None => None,
        };

        if let Some(target) = &target {
            if path::is_same_or_descendant(&target.path, &folder.path) {
                return Err(DriveError::InvalidRequest(
                    "Cannot move a folder into itself or one of its subfolders".to_string(),
                ));
            }
        }

        if folder.parent_id == new_parent_id {
            return Ok(folder);
        }

        if FolderRepository::sibling_exists_in(
            &mut tx,
            user_id,
            new_parent_id,
            &folder.name,
            Some(folder.id),
        )
        .await?
        {
            return Err(sibling_conflict());
        }

        let new_path = path::join(target.as_ref().map(|t| t.path.as_str()), &folder.name);
        FolderRepository::relocate_in(&mut tx, &folder, &folder.name, new_parent_id, &new_path)
            .await
            .map_err(sibling_violation)?;
        let rewritten =
            FolderRepository::rewrite_descendant_paths_in(&mut tx, user_id, &folder.path, &new_path)
                .await?;

        let moved = FolderRepository::get_owned_in(&mut tx, id, user_id)
            .await?
            .ok_or_else(folder_not_found)?;
        tx.commit().await?;

        info!(
            user_id,
            folder_id = id,
            old_path = %folder.path,
            new_path = %moved.path,
            descendants = rewritten,
            "Folder moved"
        );
        Ok(moved)
    }

    /// Delete a folder with its whole subtree.
    ///
    /// Rows are removed and the quota released in one transaction; the
    /// files on disk are unlinked afterwards.
    pub async fn delete(&self, user_id: i64, id: i64) -> Result<FolderDeletion> {
        let mut tx = self.db.pool().begin().await?;

        let folder = FolderRepository::get_owned_in(&mut tx, id, user_id)
            .await?
            .ok_or_else(folder_not_found)?;
        let files = FolderRepository::subtree_files_in(&mut tx, &folder).await?;
        let bytes_freed: i64 = files.iter().map(|f| f.file_size).sum();

        FolderRepository::delete_in(&mut tx, folder.id, user_id).await?;
        if bytes_freed > 0 {
            release_storage(&mut tx, user_id, bytes_freed).await?;
        }
        tx.commit().await?;

        let paths: Vec<&str> = files.iter().map(|f| f.file_path.as_str()).collect();
        self.storage.discard(&paths).await;

        info!(
            user_id,
            folder_id = id,
            path = %folder.path,
            files = files.len(),
            bytes_freed,
            "Folder deleted"
        );
        Ok(FolderDeletion {
            files_removed: files.len(),
            bytes_freed,
        })
    }
}

/// A file written to storage together with its client-supplied metadata.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    /// Display name.
    pub original_name: String,
    /// Resolved MIME type.
    pub mime_type: String,
    /// Bytes on disk.
    pub staged: StagedFile,
}

/// File service.
pub struct FileService<'a> {
    db: &'a Database,
    storage: &'a FileStorage,
}

impl<'a> FileService<'a> {
    /// Create a new FileService.
    pub fn new(db: &'a Database, storage: &'a FileStorage) -> Self {
        Self { db, storage }
    }

    fn repo(&self) -> FileRepository<'_> {
        FileRepository::new(self.db.pool())
    }

    async fn check_folder(&self, user_id: i64, folder_id: Option<i64>, what: &str) -> Result<()> {
        if let Some(folder_id) = folder_id {
            FolderRepository::new(self.db.pool())
                .get_owned(folder_id, user_id)
                .await?
                .ok_or_else(|| DriveError::NotFound(what.to_string()))?;
        }
        Ok(())
    }

    /// Record staged uploads and charge them to the user's quota.
    ///
    /// Inserts and the quota increment share one transaction. On any error
    /// the staged files are removed from disk before the error is returned.
    pub async fn commit_upload(
        &self,
        user_id: i64,
        folder_id: Option<i64>,
        uploads: Vec<PendingUpload>,
    ) -> Result<Vec<FileMetadata>> {
        match self.try_commit_upload(user_id, folder_id, &uploads).await {
            Ok(files) => Ok(files),
            Err(e) => {
                let paths: Vec<&str> = uploads
                    .iter()
                    .map(|u| u.staged.relative_path.as_str())
                    .collect();
                self.storage.discard(&paths).await;
                if let DriveError::QuotaExceeded {
                    quota,
                    used,
                    required,
                } = &e
                {
                    warn!(user_id, quota, used, required, "Upload rejected: quota exceeded");
                }
                Err(e)
            }
        }
    }

    async fn try_commit_upload(
        &self,
        user_id: i64,
        folder_id: Option<i64>,
        uploads: &[PendingUpload],
    ) -> Result<Vec<FileMetadata>> {
        if uploads.is_empty() {
            return Err(DriveError::InvalidRequest("No files uploaded".to_string()));
        }
        self.check_folder(user_id, folder_id, "Folder").await?;

        let total: i64 = uploads.iter().map(|u| u.staged.size).sum();

        let mut tx = self.db.pool().begin().await?;
        reserve_storage(&mut tx, user_id, total).await?;

        let mut ids = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let new_file = NewFile {
                name: upload.staged.stored_name.clone(),
                original_name: upload.original_name.clone(),
                file_path: upload.staged.relative_path.clone(),
                file_size: upload.staged.size,
                mime_type: Some(upload.mime_type.clone()),
                folder_id,
                user_id,
            };
            ids.push(FileRepository::insert_in(&mut tx, &new_file).await?);
        }
        tx.commit().await?;

        info!(user_id, files = ids.len(), total_size = total, "Upload committed");
        self.repo().get_many(&ids, user_id).await
    }

    /// Get a file owned by the user.
    pub async fn get(&self, user_id: i64, id: i64) -> Result<FileMetadata> {
        self.repo()
            .get_owned(id, user_id)
            .await?
            .ok_or_else(file_not_found)
    }

    /// List files.
    pub async fn list(&self, user_id: i64, query: &FileListQuery) -> Result<Vec<FileMetadata>> {
        if let FileScope::Folder(folder_id) = query.scope {
            self.check_folder(user_id, folder_id, "Folder").await?;
        }
        self.repo().list(user_id, query).await
    }

    /// Change a file's display name.
    pub async fn rename(&self, user_id: i64, id: i64, new_name: &str) -> Result<FileMetadata> {
        let new_name = path::validate_name(new_name)?;
        if !self.repo().rename(id, user_id, &new_name).await? {
            return Err(file_not_found());
        }
        self.get(user_id, id).await
    }

    /// Move a file to a folder, or to the root for `None`.
    pub async fn move_file(
        &self,
        user_id: i64,
        id: i64,
        folder_id: Option<i64>,
    ) -> Result<FileMetadata> {
        self.get(user_id, id).await?;
        self.check_folder(user_id, folder_id, "Target folder").await?;

        if !self.repo().move_to(id, user_id, folder_id).await? {
            return Err(file_not_found());
        }
        self.get(user_id, id).await
    }

    /// Delete a file, release its quota and unlink it from disk.
    pub async fn delete(&self, user_id: i64, id: i64) -> Result<FileMetadata> {
        let mut tx = self.db.pool().begin().await?;

        let file = FileRepository::get_owned_in(&mut tx, id, user_id)
            .await?
            .ok_or_else(file_not_found)?;
        FileRepository::delete_in(&mut tx, id, user_id).await?;
        release_storage(&mut tx, user_id, file.file_size).await?;
        tx.commit().await?;

        self.storage.discard(&[file.file_path.as_str()]).await;

        info!(user_id, file_id = id, size = file.file_size, "File deleted");
        Ok(file)
    }
}
