//! Authentication module for Drivebox.
//!
//! This module provides password hashing, input validation,
//! user registration, and credential checks.

mod password;
mod registration;
pub mod validation;

pub use password::{
    hash_password, validate_password, verify_password, PasswordError, MAX_PASSWORD_LENGTH,
    MIN_PASSWORD_LENGTH,
};
pub use registration::{
    authenticate, register, RegistrationError, RegistrationPolicy, RegistrationRequest,
};
pub use validation::ValidationError;
