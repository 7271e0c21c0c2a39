//! Per-node store of finalized transactions.

use noscalp_crypto::SecureHash;
use noscalp_domain::{FinalizedTransaction, StateAndRef};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct VaultState {
    transactions: HashMap<SecureHash, FinalizedTransaction>,
    /// Recording order, for stable listings
    order: Vec<SecureHash>,
}

/// Finalized transactions this node is a participant of.
#[derive(Debug, Default)]
pub struct Vault {
    state: RwLock<VaultState>,
}

impl Vault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `ftx`. Returns `false` if a transaction with the same id was
    /// already recorded, in which case the vault is unchanged.
    pub async fn record(&self, ftx: FinalizedTransaction) -> bool {
        let id = ftx.id();
        let mut state = self.state.write().await;
        if state.transactions.contains_key(&id) {
            debug!(tx_id = %id, "Transaction already recorded");
            return false;
        }
        state.order.push(id);
        state.transactions.insert(id, ftx);
        info!(tx_id = %id, total = state.order.len(), "Transaction recorded");
        true
    }

    pub async fn get(&self, id: &SecureHash) -> Option<FinalizedTransaction> {
        self.state.read().await.transactions.get(id).cloned()
    }

    /// Every recorded distribution state, oldest first.
    pub async fn states(&self) -> Vec<StateAndRef> {
        let state = self.state.read().await;
        state
            .order
            .iter()
            .filter_map(|id| state.transactions.get(id))
            .flat_map(|ftx| ftx.out_refs())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
