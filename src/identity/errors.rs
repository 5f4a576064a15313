//! Identity resolution errors
//!
//! All identity errors are configuration errors: FATAL, never retried.

use std::fmt;

/// Identity error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityErrorCode {
    /// Privileged run without `--user`
    B2sIdentityUserRequired,
    /// Named account does not exist on the host
    B2sIdentityUnknownUser,
    /// Account database could not be read
    B2sIdentityLookupFailed,
}

impl IdentityErrorCode {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityErrorCode::B2sIdentityUserRequired => "B2S_IDENTITY_USER_REQUIRED",
            IdentityErrorCode::B2sIdentityUnknownUser => "B2S_IDENTITY_UNKNOWN_USER",
            IdentityErrorCode::B2sIdentityLookupFailed => "B2S_IDENTITY_LOOKUP_FAILED",
        }
    }
}

impl fmt::Display for IdentityErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity resolution error
#[derive(Debug)]
pub struct IdentityError {
    code: IdentityErrorCode,
    message: String,
}

impl IdentityError {
    /// `--user` is mandatory when running with elevated privilege
    pub fn user_required() -> Self {
        Self {
            code: IdentityErrorCode::B2sIdentityUserRequired,
            message: "--user must be specified when running as root".to_string(),
        }
    }

    /// The named account was not found
    pub fn unknown_user(name: &str) -> Self {
        Self {
            code: IdentityErrorCode::B2sIdentityUnknownUser,
            message: format!("User \"{}\" was not found on the system", name),
        }
    }

    /// The account lookup itself failed
    pub fn lookup_failed(name: &str, reason: impl fmt::Display) -> Self {
        Self {
            code: IdentityErrorCode::B2sIdentityLookupFailed,
            message: format!("Failed to look up user \"{}\": {}", name, reason),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> IdentityErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[FATAL] {}: {}", self.code, self.message)
    }
}

impl std::error::Error for IdentityError {}

/// Result type for identity resolution
pub type IdentityResult<T> = Result<T, IdentityError>;
