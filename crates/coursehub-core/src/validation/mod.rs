//! Input validation and normalization for account data.
//!
//! Everything a client submits during registration, social sign-in or a
//! profile update passes through here before it reaches the credential store.

use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

/// Validation error types.
///
/// The `Display` text is returned to clients verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Input exceeds maximum allowed length.
    #[error("Input exceeds maximum length ({max} characters, got {actual})")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual input length.
        actual: usize,
    },

    /// Display name missing.
    #[error("Please enter your name")]
    MissingName,

    /// Email missing.
    #[error("Please enter your email")]
    MissingEmail,

    /// Email does not look like `local@domain.tld`.
    #[error("please enter a valid email")]
    InvalidEmail,

    /// Password shorter than the minimum.
    #[error("Password must be at least {min} characters")]
    PasswordTooShort {
        /// Minimum length.
        min: usize,
    },
}

/// Size limits per input type.
pub mod limits {
    /// Maximum display name length.
    pub const MAX_NAME_LENGTH: usize = 100;

    /// Maximum email length (RFC 5321 path limit).
    pub const MAX_EMAIL_LENGTH: usize = 254;

    /// Minimum password length.
    pub const MIN_PASSWORD_LENGTH: usize = 6;

    /// Maximum password length, bounds hashing cost.
    pub const MAX_PASSWORD_LENGTH: usize = 128;
}

/// Strip control characters and apply NFKC normalization.
///
/// # Errors
///
/// Returns `ValidationError::TooLong` if input exceeds `max_len` characters.
pub fn sanitize_text(input: &str, max_len: usize) -> Result<String, ValidationError> {
    let actual = input.chars().count();
    if actual > max_len {
        return Err(ValidationError::TooLong {
            max: max_len,
            actual,
        });
    }

    let sanitized: String = input.chars().filter(|c| !c.is_control()).collect();
    let normalized: String = sanitized.nfkc().collect();

    Ok(normalized.trim().to_string())
}

/// Validate and normalize a display name.
///
/// # Errors
///
/// Returns error if the name is empty or too long.
pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let name = sanitize_text(name, limits::MAX_NAME_LENGTH)?;
    if name.is_empty() {
        return Err(ValidationError::MissingName);
    }
    Ok(name)
}

/// Lower-case and trim an email address.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate and normalize an email address.
///
/// Accepts `local@domain.tld` where no part contains whitespace or a
/// second `@`.
///
/// # Errors
///
/// Returns error if the email is empty, too long or malformed.
pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(ValidationError::MissingEmail);
    }
    if email.len() > limits::MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            max: limits::MAX_EMAIL_LENGTH,
            actual: email.len(),
        });
    }
    if email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }

    let (local, domain) = email.split_once('@').ok_or(ValidationError::InvalidEmail)?;
    if local.is_empty() || domain.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }

    // Domain needs a dot with something on both sides.
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(email),
        _ => Err(ValidationError::InvalidEmail),
    }
}

/// Validate a new password.
///
/// # Errors
///
/// Returns error if the password is too short or too long.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if len < limits::MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort {
            min: limits::MIN_PASSWORD_LENGTH,
        });
    }
    if len > limits::MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong {
            max: limits::MAX_PASSWORD_LENGTH,
            actual: len,
        });
    }
    Ok(())
}
