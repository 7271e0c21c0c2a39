//! The distribution state.
//!
//! Registers an on-ledger fact that tickets have been distributed from one
//! verified distributor to another.

use noscalp_crypto::SecureHash;
use noscalp_identity::Party;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Agreement between two distributors about a batch of tickets.
///
/// Constructed once by the initiating distributor and never mutated; a new
/// agreement always means a new state in a new transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionState {
    /// Number of tickets being distributed
    pub ticket_quantity: i64,
    /// Event the tickets are for
    pub event_name: String,
    /// Proposing distributor
    pub from_distributor: Party,
    /// Accepting distributor
    pub to_distributor: Party,
}

impl DistributionState {
    pub fn new(
        ticket_quantity: i64,
        event_name: impl Into<String>,
        from_distributor: Party,
        to_distributor: Party,
    ) -> Self {
        Self {
            ticket_quantity,
            event_name: event_name.into(),
            from_distributor,
            to_distributor,
        }
    }

    /// Parties that hold a copy of this state once it is finalized.
    pub fn participants(&self) -> [&Party; 2] {
        [&self.from_distributor, &self.to_distributor]
    }
}

/// Pointer to an output of a finalized transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateRef {
    pub txhash: SecureHash,
    pub index: u32,
}

impl fmt::Display for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.txhash, self.index)
    }
}

/// A state together with the reference it is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateAndRef {
    pub state: DistributionState,
    #[serde(rename = "ref")]
    pub reference: StateRef,
}
