//! Ledger domain model for NoScalp ticket distribution.
//!
//! This crate contains pure domain logic with no I/O dependencies:
//! - The distribution state (the fact two distributors agree on)
//! - Transactions carrying it, their identifiers and signatures
//! - The distribution contract both parties evaluate before signing

pub mod contract;
pub mod error;
pub mod state;
pub mod transaction;

pub use contract::{validate_record, DistributionContract, ValidationOutcome};
pub use error::{TransactionError, ValidationError};
pub use state::{DistributionState, StateAndRef, StateRef};
pub use transaction::{
    Command, DistributionCommand, FinalizedTransaction, SignedTransaction, TransactionBuilder,
    WireTransaction,
};
