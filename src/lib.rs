//! Drivebox - personal cloud storage server
//!
//! A REST backend that keeps user, folder and file metadata in SQLite and
//! streams file contents to and from per-user directories on local disk.
//! Folders carry a materialized path that is rewritten for the whole subtree
//! on rename or move; every upload and delete is charged against the owner's
//! storage quota.

pub mod auth;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use auth::{
    authenticate, hash_password, register, validate_password, verify_password, PasswordError,
    RegistrationError, RegistrationPolicy, RegistrationRequest, ValidationError,
};
pub use config::Config;
pub use db::{Database, NewUser, StorageDrift, User, UserRepository};
pub use error::{DriveError, Result};
pub use file::{FileService, FileStorage, FolderService};
pub use web::WebServer;
