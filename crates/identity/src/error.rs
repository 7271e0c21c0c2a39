//! Error types for NoScalp identity operations.

use thiserror::Error;

/// Errors that can occur in identity operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// Legal name could not be parsed
    #[error("Invalid legal name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// No party registered under the name
    #[error("Distributor named {name} cannot be found.")]
    UnknownParty { name: String },

    /// Identity already exists
    #[error("Identity already exists: {name}")]
    IdentityExists { name: String },
}

/// Result type for identity operations.
pub type IdentityResult<T> = Result<T, IdentityError>;
