//! Validation utilities for Web API DTOs.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::web::error::ApiError;

/// A JSON extractor that validates the request body.
///
/// Malformed JSON and missing fields are rejected with 400; field-level
/// validation failures are rejected with 422 and per-field details.
///
/// # Example
///
/// ```ignore
/// use drivebox::web::dto::ValidatedJson;
///
/// async fn create_folder(
///     ValidatedJson(payload): ValidatedJson<CreateFolderRequest>,
/// ) -> Result<Json<FolderResponse>, ApiError> {
///     // payload is already validated
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e.body_text())))?;

        value.validate().map_err(ApiError::from_validation_errors)?;

        Ok(ValidatedJson(value))
    }
}

// ============================================================================
// Custom Validators
// ============================================================================

/// Validate that a string is not empty after trimming whitespace.
pub fn not_empty_trimmed(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("not_empty_trimmed")
            .with_message("Must not be empty".into()));
    }
    Ok(())
}

/// Validate a folder or file name: not blank and free of control characters,
/// newlines included.
pub fn single_line_name(value: &str) -> Result<(), validator::ValidationError> {
    not_empty_trimmed(value)?;
    if value.chars().any(char::is_control) {
        return Err(validator::ValidationError::new("single_line_name")
            .with_message("Must not contain control characters".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty_trimmed() {
        assert!(not_empty_trimmed("Hello").is_ok());
        assert!(not_empty_trimmed("  Hello  ").is_ok());
        assert!(not_empty_trimmed("").is_err());
        assert!(not_empty_trimmed("   ").is_err());
        assert!(not_empty_trimmed("\t\n").is_err());
    }

    #[test]
    fn test_single_line_name_valid() {
        assert!(single_line_name("Reports 2024").is_ok());
        assert!(single_line_name("写真").is_ok());
        assert!(single_line_name("100%_done").is_ok());
    }

    #[test]
    fn test_single_line_name_invalid() {
        assert!(single_line_name("").is_err());
        assert!(single_line_name("a\nb").is_err());
        assert!(single_line_name("a\x00b").is_err());
        assert!(single_line_name("tab\there").is_err());
    }

    #[test]
    fn test_single_line_name_message() {
        let err = single_line_name("a\x07").unwrap_err();
        assert_eq!(err.code, "single_line_name");
        assert_eq!(
            err.message.as_deref(),
            Some("Must not contain control characters")
        );
    }
}
