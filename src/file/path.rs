//! Materialized folder paths and name rules.
//!
//! A folder's path is its parent's path followed by `/` and its name; root
//! folders have `/` + name. Names never contain `/`, so every `/` in a path
//! is a separator.

use crate::{DriveError, Result};

/// Maximum length of a folder or file display name, in characters.
pub const MAX_NAME_LENGTH: usize = 255;

/// Path separator.
pub const SEPARATOR: char = '/';

/// Validate a folder or file display name and return it trimmed.
///
/// # Examples
///
/// ```
/// use drivebox::file::validate_name;
///
/// assert_eq!(validate_name("  Photos ").unwrap(), "Photos");
/// assert!(validate_name("a/b").is_err());
/// assert!(validate_name("..").is_err());
/// ```
pub fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(DriveError::Validation("name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(DriveError::Validation(format!(
            "name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    if name.contains(SEPARATOR) || name.contains('\\') {
        return Err(DriveError::Validation(
            "name must not contain path separators".to_string(),
        ));
    }
    if name.chars().any(char::is_control) {
        return Err(DriveError::Validation(
            "name must not contain control characters".to_string(),
        ));
    }
    if name == "." || name == ".." {
        return Err(DriveError::Validation("name is reserved".to_string()));
    }

    Ok(name.to_string())
}

/// Build a child path from an optional parent path.
pub fn join(parent_path: Option<&str>, name: &str) -> String {
    match parent_path {
        Some(parent) => format!("{parent}{SEPARATOR}{name}"),
        None => format!("{SEPARATOR}{name}"),
    }
}

/// Path of the parent folder, or `None` for a root folder.
pub fn parent_of(path: &str) -> Option<&str> {
    match path.rfind(SEPARATOR) {
        Some(0) | None => None,
        Some(idx) => Some(&path[..idx]),
    }
}

/// Prefix shared by every descendant of `path`.
pub fn descendant_prefix(path: &str) -> String {
    format!("{path}{SEPARATOR}")
}

/// Whether `candidate` is `ancestor` itself or lies beneath it.
pub fn is_same_or_descendant(candidate: &str, ancestor: &str) -> bool {
    candidate == ancestor || candidate.starts_with(&descendant_prefix(ancestor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("Docs").unwrap(), "Docs");
        assert_eq!(validate_name(" 50% off_ ").unwrap(), "50% off_");
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("a\\b").is_err());
        assert!(validate_name("bad\u{0}name").is_err());
        assert!(validate_name(".").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("...").is_ok());
    }

    #[test]
    fn test_validate_name_length_in_chars() {
        assert!(validate_name(&"é".repeat(MAX_NAME_LENGTH)).is_ok());
        assert!(validate_name(&"é".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_join() {
        assert_eq!(join(None, "a"), "/a");
        assert_eq!(join(Some("/a"), "b"), "/a/b");
        assert_eq!(join(Some("/a/b"), "c d"), "/a/b/c d");
    }

    #[test]
    fn test_parent_of() {
        assert_eq!(parent_of("/a"), None);
        assert_eq!(parent_of("/a/b"), Some("/a"));
        assert_eq!(parent_of("/a/b/c"), Some("/a/b"));
    }

    #[test]
    fn test_is_same_or_descendant() {
        assert!(is_same_or_descendant("/a", "/a"));
        assert!(is_same_or_descendant("/a/b", "/a"));
        assert!(!is_same_or_descendant("/ab", "/a"));
        assert!(!is_same_or_descendant("/a", "/a/b"));
    }
}
