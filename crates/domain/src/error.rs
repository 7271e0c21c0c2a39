//! Domain errors
//!
//! Pure domain errors with no infrastructure dependencies

use thiserror::Error;

/// A proposed distribution broke a contract rule. The reason is the
/// human-readable rule text, surfaced verbatim to whoever built the proposal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct ValidationError {
    pub reason: String,
}

impl ValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Signature-level problems with a transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Invalid signature by key {key_id}: {reason}")]
    InvalidSignature { key_id: String, reason: String },

    #[error("Missing signatures from keys: {}", missing.join(", "))]
    MissingSignatures { missing: Vec<String> },

    #[error("Signature by key {key_id} is not required by any command")]
    UnexpectedSigner { key_id: String },

    #[error("Notary witness invalid: {0}")]
    InvalidWitness(String),
}
