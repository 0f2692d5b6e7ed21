//! Configuration module for Drivebox.

use serde::Deserialize;
use std::path::Path;

use crate::{DriveError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins (empty = any origin, no credentials).
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Take the client IP from `X-Forwarded-For` / `X-Real-IP`.
    /// Enable only behind a reverse proxy that sets these headers.
    #[serde(default)]
    pub trust_proxy: bool,
    /// Whether to serve the built browser client.
    #[serde(default)]
    pub serve_static: bool,
    /// Path to the built browser client.
    #[serde(default = "default_static_path")]
    pub static_path: String,
    /// Maximum JSON request body size in bytes.
    #[serde(default = "default_json_body_limit")]
    pub json_body_limit: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_static_path() -> String {
    "client/dist".to_string()
}

fn default_json_body_limit() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
            trust_proxy: false,
            serve_static: false,
            static_path: default_static_path(),
            json_body_limit: default_json_body_limit(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/drivebox.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// File storage and upload limits.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory for uploaded files (one subdirectory per user).
    #[serde(default = "default_storage_path")]
    pub path: String,
    /// Maximum size of a single uploaded file in megabytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_mb: u64,
    /// Maximum number of files per upload request.
    #[serde(default = "default_max_files")]
    pub max_files_per_upload: usize,
    /// Storage quota assigned to new accounts, in bytes.
    #[serde(default = "default_quota")]
    pub default_quota_bytes: i64,
    /// Allowed MIME types (`image/*` wildcards allowed). Empty allows everything.
    #[serde(default)]
    pub allowed_mime_types: Vec<String>,
}

fn default_storage_path() -> String {
    "uploads".to_string()
}

fn default_max_file_size() -> u64 {
    100
}

fn default_max_files() -> usize {
    10
}

fn default_quota() -> i64 {
    1024 * 1024 * 1024 // 1 GiB
}

impl StorageConfig {
    /// Maximum single file size in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            max_file_size_mb: default_max_file_size(),
            max_files_per_upload: default_max_files(),
            default_quota_bytes: default_quota(),
            allowed_mime_types: vec![],
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// JWT signing secret (must be set).
    #[serde(default)]
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    #[serde(default = "default_token_expiry")]
    pub token_expiry_secs: u64,
    /// Minimum password length for registration.
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
    /// Login attempts allowed per IP within `login_window_secs`.
    #[serde(default = "default_login_attempts")]
    pub login_attempts: u32,
    /// Login rate limit window in seconds.
    #[serde(default = "default_login_window")]
    pub login_window_secs: u64,
    /// Registration attempts allowed per IP within `register_window_secs`.
    #[serde(default = "default_register_attempts")]
    pub register_attempts: u32,
    /// Registration rate limit window in seconds.
    #[serde(default = "default_register_window")]
    pub register_window_secs: u64,
}

fn default_token_expiry() -> u64 {
    24 * 3600 // 24 hours
}

fn default_min_password_length() -> usize {
    6
}

fn default_login_attempts() -> u32 {
    5
}

fn default_login_window() -> u64 {
    15 * 60
}

fn default_register_attempts() -> u32 {
    3
}

fn default_register_window() -> u64 {
    3600
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_expiry_secs: default_token_expiry(),
            min_password_length: default_min_password_length(),
            login_attempts: default_login_attempts(),
            login_window_secs: default_login_window(),
            register_attempts: default_register_attempts(),
            register_window_secs: default_register_window(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/drivebox.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// File storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(DriveError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| DriveError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `DRIVEBOX_JWT_SECRET`: JWT signing secret
    /// - `DRIVEBOX_PORT`: HTTP port
    pub fn apply_env_overrides(&mut self) {
        if let Ok(jwt_secret) = std::env::var("DRIVEBOX_JWT_SECRET") {
            if !jwt_secret.is_empty() {
                self.auth.jwt_secret = jwt_secret;
            }
        }

        if let Ok(port) = std::env::var("DRIVEBOX_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid DRIVEBOX_PORT"),
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(DriveError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via DRIVEBOX_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.storage.max_file_size_mb == 0 || self.storage.max_files_per_upload == 0 {
            return Err(DriveError::Config(
                "upload limits must be greater than zero".to_string(),
            ));
        }
        if self.storage.default_quota_bytes < 0 {
            return Err(DriveError::Config(
                "default_quota_bytes must not be negative".to_string(),
            ));
        }
        if self.auth.login_attempts == 0 || self.auth.register_attempts == 0 {
            return Err(DriveError::Config(
                "rate limit attempts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
