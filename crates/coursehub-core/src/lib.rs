//! # CourseHub Core
//!
//! Configuration, shared types and input validation for CourseHub.
//!
//! This crate provides:
//! - Configuration loading and validation (JSON5 format)
//! - Identifier newtypes shared by the gateway and the CLI
//! - Validation and normalization of account input

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod types;
pub mod validation;

pub use config::{Config, ConfigError};
pub use types::IdentityId;
pub use validation::{ValidationError, normalize_email, validate_email, validate_name, validate_password};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::types::*;
    pub use crate::validation::{validate_email, validate_name, validate_password};
}
