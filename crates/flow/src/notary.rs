//! Finality: the notary witness over a fully signed transaction.
//!
//! The notary does not evaluate the contract. It checks that every required
//! party has signed, that the transaction was addressed to it, and that no
//! input or transaction id has been seen before, then signs the id. Witnessed
//! transactions stay retrievable by id, so a participant that missed the
//! initiator's hand-off can still obtain the result.

use async_trait::async_trait;
use noscalp_crypto::{PartySigner, SecureHash};
use noscalp_domain::{FinalizedTransaction, SignedTransaction, StateRef};
use noscalp_identity::{LegalName, Party};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::FinalizationError;

#[async_trait]
pub trait FinalityService: Send + Sync {
    /// Identity whose witness signature this service produces.
    fn identity(&self) -> &Party;

    async fn finalise(
        &self,
        stx: SignedTransaction,
    ) -> Result<FinalizedTransaction, FinalizationError>;

    /// The witnessed transaction with this id, if this service finalised it.
    async fn witnessed(&self, id: &SecureHash) -> Option<FinalizedTransaction>;
}

#[derive(Debug, Default)]
struct NotaryState {
    consumed: HashSet<StateRef>,
    notarised: HashMap<SecureHash, FinalizedTransaction>,
}

/// Single-process notary with an in-memory uniqueness store.
#[derive(Debug)]
pub struct InMemoryNotary {
    identity: Party,
    signer: PartySigner,
    state: Mutex<NotaryState>,
}

impl InMemoryNotary {
    pub fn new(name: LegalName) -> Self {
        Self::with_signer(name, PartySigner::new())
    }

    pub fn with_signer(name: LegalName, signer: PartySigner) -> Self {
        let identity = Party::new(name, signer.public_key());
        Self {
            identity,
            signer,
            state: Mutex::new(NotaryState::default()),
        }
    }

    pub async fn notarised_count(&self) -> usize {
        self.state.lock().await.notarised.len()
    }
}

#[async_trait]
impl FinalityService for InMemoryNotary {
    fn identity(&self) -> &Party {
        &self.identity
    }

    async fn finalise(
        &self,
        stx: SignedTransaction,
    ) -> Result<FinalizedTransaction, FinalizationError> {
        if stx.tx.notary != self.identity {
            return Err(FinalizationError::WrongNotary {
                named: stx.tx.notary.name.to_string(),
                actual: self.identity.name.to_string(),
            });
        }
        stx.verify_required_signatures()?;

        let id = stx.id();
        let mut state = self.state.lock().await;
        if state.notarised.contains_key(&id) {
            warn!(tx_id = %id, "Rejecting already notarised transaction");
            return Err(FinalizationError::AlreadyNotarised(id.to_hex()));
        }
        if let Some(input) = stx.tx.inputs.iter().find(|i| state.consumed.contains(*i)) {
            warn!(tx_id = %id, input = %input, "Rejecting double spend");
            return Err(FinalizationError::InputConsumed(input.to_string()));
        }
        state.consumed.extend(stx.tx.inputs.iter().copied());

        let notary_signature = self.signer.sign(id.as_bytes());
        let ftx = FinalizedTransaction {
            stx,
            notary_signature,
        };
        state.notarised.insert(id, ftx.clone());
        drop(state);

        info!(tx_id = %id, notary = %self.identity.name, "Transaction notarised");
        Ok(ftx)
    }

    async fn witnessed(&self, id: &SecureHash) -> Option<FinalizedTransaction> {
        self.state.lock().await.notarised.get(id).cloned()
    }
}
