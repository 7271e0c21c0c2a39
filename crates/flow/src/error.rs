//! Error types for the agreement protocol.

use noscalp_domain::{TransactionError, ValidationError};
use noscalp_identity::IdentityError;
use thiserror::Error;

/// Delivery failures reported by a [`Transport`](crate::Transport).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("No route to {0}")]
    NoRoute(String),

    #[error("{0} is no longer accepting messages")]
    Closed(String),

    #[error("Envelope encoding failed: {0}")]
    Encoding(String),
}

/// Reasons the finality service refuses to witness a transaction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FinalizationError {
    #[error("Transaction names notary {named} but was submitted to {actual}")]
    WrongNotary { named: String, actual: String },

    #[error("Input {0} has already been consumed")]
    InputConsumed(String),

    #[error("Transaction {0} has already been notarised")]
    AlreadyNotarised(String),

    #[error(transparent)]
    Signatures(#[from] TransactionError),
}

/// Terminal failures of a protocol run.
///
/// Only [`FlowError::CounterpartyUnreachable`] is worth retrying: every other
/// variant describes a proposal that would fail the same way again.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// The proposal broke a contract rule; nothing was sent.
    #[error("{reason}")]
    Validation { reason: String },

    /// The counterparty is not in the directory; nothing was sent.
    #[error("Distributor named {name} cannot be found.")]
    UnknownParty { name: String },

    #[error("Counterparty rejected the proposal: {reason}")]
    CounterpartyRejected { reason: String },

    #[error("Counterparty {counterparty} unreachable: {reason}")]
    CounterpartyUnreachable {
        counterparty: String,
        reason: String,
    },

    #[error("Finalization failed: {reason}")]
    Finalization { reason: String },

    #[error("Signature check failed: {0}")]
    Signing(#[from] TransactionError),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl FlowError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FlowError::CounterpartyUnreachable { .. })
    }
}

impl From<ValidationError> for FlowError {
    fn from(e: ValidationError) -> Self {
        FlowError::Validation { reason: e.reason }
    }
}

impl From<IdentityError> for FlowError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::UnknownParty { name } => FlowError::UnknownParty { name },
            other => FlowError::Protocol(other.to_string()),
        }
    }
}

impl From<FinalizationError> for FlowError {
    fn from(e: FinalizationError) -> Self {
        FlowError::Finalization {
            reason: e.to_string(),
        }
    }
}

pub type FlowResult<T> = Result<T, FlowError>;
