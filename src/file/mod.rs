//! File management module for Drivebox.
//!
//! This module provides:
//! - Per-user folder hierarchy with materialized paths
//! - File metadata with filtered, sorted listings
//! - Streamed disk storage in per-user directories
//! - Services tying metadata, disk and quota accounting together

mod folder;
mod metadata;
mod path;
mod service;
mod storage;
mod tree;
mod upload;

pub use folder::{Folder, FolderRepository, FolderScope, NewFolder, SubtreeFile};
pub use metadata::{
    escape_like, FileListQuery, FileMetadata, FileRepository, FileScope, FileSort, NewFile,
    SortColumn, SortOrder,
};
pub use path::{validate_name, MAX_NAME_LENGTH};
pub use service::{FileService, FolderDeletion, FolderService, PendingUpload};
pub use storage::{generate_stored_name, FileStorage, StagedFile};
pub use tree::{build_tree, FolderNode};
pub use upload::{
    display_name, mime_matches, resolve_mime_type, UploadPolicy, FILES_FIELD, FOLDER_FIELD,
};
