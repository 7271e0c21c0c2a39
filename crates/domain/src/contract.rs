//! Distribution contract.
//!
//! The contract is a pure predicate over a proposed transaction. The
//! initiating and the accepting distributor each evaluate it independently
//! before signing, and both must reach the same verdict from the same input,
//! so nothing here may depend on which party is asking.

use noscalp_crypto::PublicKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::ValidationError;
use crate::state::DistributionState;
use crate::transaction::{DistributionCommand, WireTransaction};

pub const TICKET_QUANTITY_NOT_POSITIVE: &str = "Ticket quantity cannot be zero.";
pub const EVENT_NAME_BLANK: &str = "There must be event name.";
pub const SIGNERS_NOT_TWO: &str = "Both Distributors must sign the transaction";
pub const SAME_DISTRIBUTOR: &str = "Distributors must be different parties.";
pub const SINGLE_CREATE_COMMAND: &str = "Required a single Create command.";
pub const INPUTS_NOT_ALLOWED: &str = "Ticket distribution must not consume inputs.";
pub const SINGLE_OUTPUT: &str = "DistributionState must have a single output.";

/// Verdict of the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationOutcome {
    Accepted,
    Rejected { reason: String },
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted)
    }
}

impl From<Result<(), ValidationError>> for ValidationOutcome {
    fn from(result: Result<(), ValidationError>) -> Self {
        match result {
            Ok(()) => ValidationOutcome::Accepted,
            Err(e) => ValidationOutcome::Rejected { reason: e.reason },
        }
    }
}

fn require(condition: bool, reason: &str) -> Result<(), ValidationError> {
    if condition {
        Ok(())
    } else {
        Err(ValidationError::new(reason))
    }
}

/// Record-level rules. The first failing rule is reported, in this order:
///
/// 1. positive ticket quantity
/// 2. distinct distributors
/// 3. exactly two distinct signers
/// 4. non-blank event name
///
/// [`DistributionContract::verify`] runs its shape rules (one create
/// command, no inputs, one output) before any of these.
pub fn validate_record(
    record: &DistributionState,
    signers: &[PublicKey],
) -> Result<(), ValidationError> {
    require(record.ticket_quantity > 0, TICKET_QUANTITY_NOT_POSITIVE)?;
    require(
        record.from_distributor != record.to_distributor,
        SAME_DISTRIBUTOR,
    )?;

    let distinct: BTreeSet<&PublicKey> = signers.iter().collect();
    require(distinct.len() == 2, SIGNERS_NOT_TWO)?;

    require(!record.event_name.trim().is_empty(), EVENT_NAME_BLANK)
}

/// Contract governing [`DistributionState`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DistributionContract;

impl DistributionContract {
    pub const ID: &'static str = "noscalp.contracts.DistributionContract";

    /// Verifies a proposal. Distributions are only ever created, so a
    /// proposal that consumes earlier states is rejected.
    pub fn verify(tx: &WireTransaction) -> Result<(), ValidationError> {
        let creates: Vec<_> = tx
            .commands
            .iter()
            .filter(|c| c.value == DistributionCommand::Create)
            .collect();
        require(
            creates.len() == 1 && tx.commands.len() == 1,
            SINGLE_CREATE_COMMAND,
        )?;
        let command = creates[0];

        require(tx.inputs.is_empty(), INPUTS_NOT_ALLOWED)?;
        require(tx.outputs.len() == 1, SINGLE_OUTPUT)?;

        validate_record(&tx.outputs[0], &command.signers)
    }

    pub fn evaluate(tx: &WireTransaction) -> ValidationOutcome {
        Self::verify(tx).into()
    }
}
