//! File storage for Drivebox.
//!
//! This module provides physical file storage functionality:
//! - One directory per user under the storage root
//! - Streamed writes with a per-file size limit
//! - Open, delete and discard operations

use std::io;
use std::path::{Component, Path, PathBuf};

use futures::{pin_mut, Stream, StreamExt};
use rand::Rng;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::datetime::unix_millis;
use crate::{DriveError, Result};

/// Maximum length of the name stem kept in a stored filename.
const MAX_STEM_LENGTH: usize = 100;

/// Maximum length of the extension kept in a stored filename.
const MAX_EXTENSION_LENGTH: usize = 16;

/// A file written to disk whose metadata has not been committed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Stored filename.
    pub stored_name: String,
    /// Path relative to the storage root (`<user id>/<stored name>`).
    pub relative_path: String,
    /// Bytes written.
    pub size: i64,
}

/// File storage service for managing physical files.
///
/// Files are stored per user:
/// ```text
/// {base_path}/
/// ├── 1/
/// │   └── report-1700000000000-123456789.pdf
/// └── 2/
///     └── photo-1700000000123-987654321.jpg
/// ```
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new FileStorage with the given base path.
    ///
    /// The base directory will be created if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Directory holding a user's files.
    pub fn user_dir(&self, user_id: i64) -> PathBuf {
        self.base_path.join(user_id.to_string())
    }

    /// Stream `chunks` to a new file in the user's directory.
    ///
    /// Fails with `TooLarge` as soon as more than `max_size` bytes arrive;
    /// a partially written file is removed before any error is returned.
    pub async fn write_stream<S, B, E>(
        &self,
        user_id: i64,
        original_name: &str,
        chunks: S,
        max_size: u64,
    ) -> Result<StagedFile>
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: std::fmt::Display,
    {
        let dir = self.user_dir(user_id);
        fs::create_dir_all(&dir).await?;

        let stored_name = generate_stored_name(original_name);
        let full_path = dir.join(&stored_name);
        let mut file = fs::File::create(&full_path).await?;

        pin_mut!(chunks);
        let mut written: u64 = 0;
        let outcome: Result<()> = async {
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk.map_err(|e| {
                    DriveError::InvalidRequest(format!("upload stream error: {e}"))
                })?;
                let bytes = chunk.as_ref();
                written += bytes.len() as u64;
                if written > max_size {
                    return Err(DriveError::TooLarge("File too large".to_string()));
                }
                file.write_all(bytes).await?;
            }
            file.flush().await?;
            Ok::<(), DriveError>(())
        }
        .await;
        drop(file);

        if let Err(e) = outcome {
            if let Err(rm) = fs::remove_file(&full_path).await {
                warn!(path = %full_path.display(), error = %rm, "Failed to remove partial upload");
            }
            return Err(e);
        }

        debug!(user_id, stored_name = %stored_name, size = written, "File staged");
        Ok(StagedFile {
            relative_path: format!("{user_id}/{stored_name}"),
            stored_name,
            size: written as i64,
        })
    }

    /// Resolve a stored relative path below the storage root.
    ///
    /// Rejects absolute paths and any `..` or root components.
    pub fn resolve(&self, relative_path: &str) -> Result<PathBuf> {
        let relative = Path::new(relative_path);
        if relative_path.is_empty()
            || !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(DriveError::InvalidRequest(format!(
                "invalid storage path: {relative_path}"
            )));
        }
        Ok(self.base_path.join(relative))
    }

    /// Open a stored file for reading.
    ///
    /// Returns `None` if the file is missing from disk.
    pub async fn open(&self, relative_path: &str) -> Result<Option<(fs::File, u64)>> {
        let full_path = self.resolve(relative_path)?;

        match fs::File::open(&full_path).await {
            Ok(file) => {
                let len = file.metadata().await?.len();
                Ok(Some((file, len)))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if a file exists in storage.
    pub async fn exists(&self, relative_path: &str) -> bool {
        match self.resolve(relative_path) {
            Ok(path) => fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Delete a file from storage.
    ///
    /// Returns `true` if the file was deleted, `false` if it didn't exist.
    pub async fn delete(&self, relative_path: &str) -> Result<bool> {
        let full_path = self.resolve(relative_path)?;

        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort removal of files whose metadata was never committed
    /// or has already been deleted. Failures are logged, not returned.
    pub async fn discard(&self, relative_paths: &[&str]) {
        for relative_path in relative_paths {
            if let Err(e) = self.delete(relative_path).await {
                warn!(path = %relative_path, error = %e, "Failed to remove stored file");
            }
        }
    }
}

/// Generate a stored filename: `<stem>-<unix millis>-<random><.ext>`.
///
/// Stem and extension come from `original_name` with anything other than
/// ASCII letters, digits, `-` and `_` replaced by `_`.
pub fn generate_stored_name(original_name: &str) -> String {
    let path = Path::new(original_name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| sanitize_component(s, MAX_STEM_LENGTH))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "file".to_string());
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| sanitize_component(s, MAX_EXTENSION_LENGTH))
        .filter(|s| !s.is_empty());

    let suffix: u32 = rand::rng().random_range(0..1_000_000_000);
    match ext {
        Some(ext) => format!("{stem}-{}-{suffix}.{ext}", unix_millis()),
        None => format!("{stem}-{}-{suffix}", unix_millis()),
    }
}

fn sanitize_component(s: &str, max_len: usize) -> String {
    s.chars()
        .take(max_len)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tempfile::TempDir;

    fn setup_storage() -> (TempDir, FileStorage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path()).unwrap();
        (temp_dir, storage)
    }

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = std::result::Result<&'static [u8], String>> {
        stream::iter(parts.to_vec().into_iter().map(Ok))
    }

    #[test]
    fn test_new_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let storage_path = temp_dir.path().join("storage");

        assert!(!storage_path.exists());

        let storage = FileStorage::new(&storage_path).unwrap();

        assert!(storage_path.exists());
        assert_eq!(storage.base_path(), storage_path);
    }

    #[test]
    fn test_generate_stored_name_format() {
        let name = generate_stored_name("My Report.pdf");
        assert!(name.starts_with("My_Report-"));
        assert!(name.ends_with(".pdf"));

        let parts: Vec<&str> = name.trim_end_matches(".pdf").rsplitn(3, '-').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[0].parse::<u32>().unwrap() < 1_000_000_000);
        assert!(parts[1].parse::<i64>().is_ok());
    }

    #[test]
    fn test_generate_stored_name_edge_cases() {
        let name = generate_stored_name("no_extension");
        assert!(name.starts_with("no_extension-"));
        assert!(!name.contains('.'));

        let name = generate_stored_name("../../etc/passwd");
        assert!(name.starts_with("passwd-"));
        assert!(!name.contains('/'));

        let name = generate_stored_name("写真.JPG");
        assert!(name.starts_with("__-"));
        assert!(name.ends_with(".JPG"));

        let name = generate_stored_name("");
        assert!(name.starts_with("file-"));
    }

    #[tokio::test]
    async fn test_write_stream_and_open() {
        let (_temp_dir, storage) = setup_storage();

        let staged = storage
            .write_stream(7, "hello.txt", chunks(&[b"Hello, ", b"World!"]), 1024)
            .await
            .unwrap();

        assert_eq!(staged.size, 13);
        assert!(staged.relative_path.starts_with("7/hello-"));
        assert!(storage.user_dir(7).join(&staged.stored_name).exists());

        let (_file, len) = storage.open(&staged.relative_path).await.unwrap().unwrap();
        assert_eq!(len, 13);
        let content = std::fs::read(storage.resolve(&staged.relative_path).unwrap()).unwrap();
        assert_eq!(content, b"Hello, World!");
    }

    #[tokio::test]
    async fn test_write_stream_too_large_removes_partial() {
        let (_temp_dir, storage) = setup_storage();

        let result = storage
            .write_stream(1, "big.bin", chunks(&[b"12345", b"67890"]), 8)
            .await;

        assert!(matches!(result, Err(DriveError::TooLarge(_))));
        let leftovers = std::fs::read_dir(storage.user_dir(1)).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_write_stream_exact_limit() {
        let (_temp_dir, storage) = setup_storage();

        let staged = storage
            .write_stream(1, "exact.bin", chunks(&[b"1234", b"5678"]), 8)
            .await
            .unwrap();
        assert_eq!(staged.size, 8);
    }

    #[tokio::test]
    async fn test_write_stream_error_removes_partial() {
        let (_temp_dir, storage) = setup_storage();

        let parts: Vec<std::result::Result<&'static [u8], String>> =
            vec![Ok(&b"partial"[..]), Err("connection reset".to_string())];
        let result = storage
            .write_stream(1, "broken.txt", stream::iter(parts), 1024)
            .await;

        assert!(matches!(result, Err(DriveError::InvalidRequest(_))));
        assert_eq!(std::fs::read_dir(storage.user_dir(1)).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let (_temp_dir, storage) = setup_storage();
        assert!(storage.open("1/missing.txt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_rejects_traversal() {
        let (_temp_dir, storage) = setup_storage();

        assert!(storage.resolve("../outside").is_err());
        assert!(storage.resolve("/etc/passwd").is_err());
        assert!(storage.resolve("1/../../x").is_err());
        assert!(storage.resolve("").is_err());
        assert!(storage.resolve("1/file.txt").is_ok());
    }

    #[tokio::test]
    async fn test_delete_and_discard() {
        let (_temp_dir, storage) = setup_storage();

        let a = storage
            .write_stream(1, "a.txt", chunks(&[b"a"]), 10)
            .await
            .unwrap();
        let b = storage
            .write_stream(1, "b.txt", chunks(&[b"b"]), 10)
            .await
            .unwrap();

        assert!(storage.exists(&a.relative_path).await);
        assert!(storage.delete(&a.relative_path).await.unwrap());
        assert!(!storage.delete(&a.relative_path).await.unwrap());
        assert!(!storage.exists(&a.relative_path).await);

        // Missing entries are skipped silently
        storage
            .discard(&[a.relative_path.as_str(), b.relative_path.as_str()])
            .await;
        assert!(!storage.exists(&b.relative_path).await);
    }
}
