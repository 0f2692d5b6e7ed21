//! API handlers.

pub mod auth;
pub mod file;
pub mod folder;
pub mod health;

pub use auth::*;
pub use file::*;
pub use folder::*;
pub use health::*;

use jsonwebtoken::{encode, EncodingKey, Header};

use crate::auth::RegistrationPolicy;
use crate::config::Config;
use crate::db::{Database, User};
use crate::file::{FileService, FileStorage, FolderService, UploadPolicy};
use crate::web::error::ApiError;
use crate::web::middleware::JwtClaims;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database pool.
    pub db: Database,
    /// Disk storage for uploaded files.
    pub storage: FileStorage,
    /// JWT encoding key.
    pub encoding_key: EncodingKey,
    /// Access token expiry in seconds.
    pub token_expiry: u64,
    /// Upload limits.
    pub upload: UploadPolicy,
    /// Account policy for new registrations.
    pub registration: RegistrationPolicy,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Database, storage: FileStorage, config: &Config) -> Self {
        Self {
            db,
            storage,
            encoding_key: EncodingKey::from_secret(config.auth.jwt_secret.as_bytes()),
            token_expiry: config.auth.token_expiry_secs,
            upload: UploadPolicy::from_config(&config.storage),
            registration: RegistrationPolicy {
                min_password_length: config.auth.min_password_length,
                storage_quota: config.storage.default_quota_bytes,
            },
        }
    }

    /// Folder operations.
    pub fn folders(&self) -> FolderService<'_> {
        FolderService::new(&self.db, &self.storage)
    }

    /// File operations.
    pub fn files(&self) -> FileService<'_> {
        FileService::new(&self.db, &self.storage)
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(&self, user: &User) -> Result<String, ApiError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: user.id,
            username: user.username.clone(),
            iat: now,
            exp: now + self.token_expiry,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode JWT: {}", e);
            ApiError::internal("Failed to generate token")
        })
    }
}
