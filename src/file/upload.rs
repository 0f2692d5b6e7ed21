//! Upload limits and MIME type handling.

use crate::config::StorageConfig;
use crate::{DriveError, Result};

/// Multipart field carrying file parts.
pub const FILES_FIELD: &str = "files";

/// Multipart field carrying the optional target folder ID.
pub const FOLDER_FIELD: &str = "folderId";

/// Fallback MIME type.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Limits applied to one upload request.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Maximum bytes per file.
    pub max_file_size: u64,
    /// Maximum file parts per request.
    pub max_files: usize,
    /// Allowed MIME patterns; empty allows everything.
    pub allowed_mime_types: Vec<String>,
}

impl UploadPolicy {
    /// Build the policy from storage configuration.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            max_file_size: config.max_file_size_bytes(),
            max_files: config.max_files_per_upload,
            allowed_mime_types: config.allowed_mime_types.clone(),
        }
    }

    /// Upper bound on a whole multipart body, used as the request body limit.
    pub fn max_request_size(&self) -> usize {
        let files = self.max_file_size.saturating_mul(self.max_files as u64);
        // Headroom for part headers and the folderId field
        usize::try_from(files.saturating_add(1024 * 1024)).unwrap_or(usize::MAX)
    }

    /// Reject a request carrying more than `max_files` files.
    ///
    /// `count` is the number of file parts seen so far, including this one.
    pub fn check_count(&self, count: usize) -> Result<()> {
        if count > self.max_files {
            return Err(DriveError::TooLarge("Too many files".to_string()));
        }
        Ok(())
    }

    /// Reject a MIME type outside the allow-list.
    pub fn check_mime(&self, mime: &str) -> Result<()> {
        if self.allowed_mime_types.is_empty()
            || self
                .allowed_mime_types
                .iter()
                .any(|pattern| mime_matches(pattern, mime))
        {
            return Ok(());
        }
        Err(DriveError::UnsupportedType(mime.to_string()))
    }
}

/// Match a MIME type against a pattern such as `image/png`, `image/*` or `*/*`.
pub fn mime_matches(pattern: &str, mime: &str) -> bool {
    let mime = essence(mime);
    let pattern = pattern.trim().to_ascii_lowercase();

    if pattern == "*" || pattern == "*/*" {
        return true;
    }
    match pattern.strip_suffix("/*") {
        Some(top) => mime
            .split_once('/')
            .is_some_and(|(mime_top, _)| mime_top == top),
        None => mime == pattern,
    }
}

/// Lowercased MIME type without parameters (`text/plain; charset=utf-8` -> `text/plain`).
fn essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// MIME type of an uploaded part.
///
/// Uses the declared content type unless it is missing or the generic
/// `application/octet-stream`, in which case the filename extension decides.
pub fn resolve_mime_type(declared: Option<&str>, filename: &str) -> String {
    match declared.map(essence) {
        Some(mime) if !mime.is_empty() && mime != OCTET_STREAM => mime,
        _ => mime_guess::from_path(filename)
            .first_raw()
            .unwrap_or(OCTET_STREAM)
            .to_string(),
    }
}

/// Display name for an uploaded part.
///
/// Browsers may send a client-side path; only the last component is kept.
pub fn display_name(filename: Option<&str>) -> String {
    let name = filename
        .unwrap_or_default()
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let name: String = name.chars().filter(|c| !c.is_control()).collect();
    let name = name.trim();

    if name.is_empty() {
        "unnamed".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(allowed: &[&str]) -> UploadPolicy {
        UploadPolicy {
            max_file_size: 100,
            max_files: 2,
            allowed_mime_types: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_from_config_defaults() {
        let policy = UploadPolicy::from_config(&StorageConfig::default());
        assert_eq!(policy.max_file_size, 100 * 1024 * 1024);
        assert_eq!(policy.max_files, 10);
        assert!(policy.allowed_mime_types.is_empty());
        assert!(policy.max_request_size() > 1000 * 1024 * 1024);
    }

    #[test]
    fn test_check_count() {
        let policy = policy(&[]);
        assert!(policy.check_count(2).is_ok());
        assert!(matches!(policy.check_count(3), Err(DriveError::TooLarge(_))));
    }

    #[test]
    fn test_empty_allow_list_accepts_everything() {
        assert!(policy(&[]).check_mime("application/x-anything").is_ok());
    }

    #[test]
    fn test_allow_list_with_wildcards() {
        let policy = policy(&["image/*", "application/pdf"]);
        assert!(policy.check_mime("image/png").is_ok());
        assert!(policy.check_mime("IMAGE/JPEG").is_ok());
        assert!(policy.check_mime("application/pdf").is_ok());
        assert!(matches!(
            policy.check_mime("text/plain"),
            Err(DriveError::UnsupportedType(_))
        ));
        assert!(policy.check_mime("imagex/png").is_err());
    }

    #[test]
    fn test_mime_matches() {
        assert!(mime_matches("*/*", "video/mp4"));
        assert!(mime_matches("text/plain", "text/plain; charset=utf-8"));
        assert!(!mime_matches("text/*", "application/text"));
    }

    #[test]
    fn test_resolve_mime_type() {
        assert_eq!(resolve_mime_type(Some("image/png"), "x.bin"), "image/png");
        assert_eq!(
            resolve_mime_type(Some("application/octet-stream"), "photo.jpg"),
            "image/jpeg"
        );
        assert_eq!(resolve_mime_type(None, "doc.pdf"), "application/pdf");
        assert_eq!(resolve_mime_type(None, "unknown"), OCTET_STREAM);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Some("report.pdf")), "report.pdf");
        assert_eq!(display_name(Some("C:\\Users\\me\\report.pdf")), "report.pdf");
        assert_eq!(display_name(Some("dir/sub/a b.txt")), "a b.txt");
        assert_eq!(display_name(Some("bad\u{7}name")), "badname");
        assert_eq!(display_name(Some("")), "unnamed");
        assert_eq!(display_name(None), "unnamed");
    }
}
