//! Accepting side of a distribution.
//!
//! The responder evaluates the proposal on its own before signing: the
//! contract first, then that the proposal is addressed to this node, names a
//! notary from the directory and is signed by the party it claims to come
//! from. If the initiator never hands over the finalized transaction, the
//! responder asks the notary for it before giving up.

use noscalp_domain::{DistributionContract, FinalizedTransaction, SignedTransaction};
use noscalp_identity::Party;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::error::{FlowError, FlowResult};
use crate::messages::{Envelope, FlowMessage};
use crate::node::{NodeServices, SessionGuard};
use crate::progress::FlowState;

pub const UNKNOWN_NOTARY: &str = "Proposal names an unknown notary.";

pub(crate) struct Responder {
    services: Arc<NodeServices>,
    session: SessionGuard,
    inbound: mpsc::UnboundedReceiver<Envelope>,
}

impl Responder {
    pub(crate) fn new(
        services: Arc<NodeServices>,
        session: SessionGuard,
        inbound: mpsc::UnboundedReceiver<Envelope>,
    ) -> Self {
        Self {
            services,
            session,
            inbound,
        }
    }

    pub(crate) async fn run(mut self, proposal: Envelope) {
        let session_id = self.session.id();
        let initiator = proposal.sender.name.clone();
        match self.execute(proposal).await {
            Ok(ftx) => info!(
                session_id = %session_id,
                tx_id = %ftx.id(),
                initiator = %initiator,
                "Distribution recorded"
            ),
            Err(FlowError::Validation { reason }) => warn!(
                session_id = %session_id,
                initiator = %initiator,
                reason = %reason,
                "Rejected proposal"
            ),
            Err(e) => error!(
                session_id = %session_id,
                initiator = %initiator,
                error = %e,
                "Responder failed"
            ),
        }
    }

    async fn execute(&mut self, proposal: Envelope) -> FlowResult<FinalizedTransaction> {
        let services = Arc::clone(&self.services);
        let session_id = self.session.id();
        let initiator = proposal.sender;
        let stx = match proposal.message {
            FlowMessage::Proposal { stx } => stx,
            other => {
                return Err(FlowError::Protocol(format!(
                    "session opened with a {} message",
                    other.kind()
                )))
            }
        };

        services.report(session_id, FlowState::CounterpartyVerify);
        if let Err(reason) = self.check_proposal(&initiator, &stx) {
            services.report(session_id, FlowState::Rejected);
            let reject = FlowMessage::Reject {
                reason: reason.clone(),
            };
            if let Err(e) = services.send(session_id, &initiator.name, reject).await {
                warn!(session_id = %session_id, error = %e, "Could not deliver rejection");
            }
            return Err(FlowError::Validation { reason });
        }

        services.report(session_id, FlowState::CounterpartySign);
        let signature = services.signer.sign(stx.id().as_bytes());
        services
            .send(session_id, &initiator.name, FlowMessage::Signature { signature })
            .await
            .map_err(|e| FlowError::CounterpartyUnreachable {
                counterparty: initiator.name.to_string(),
                reason: e.to_string(),
            })?;

        // The initiator still has to collect our signature and call the notary
        let wait = services.config.counterparty_timeout() + services.config.finality_timeout();
        let ftx = match timeout(wait, self.inbound.recv()).await {
            Ok(Some(reply)) => {
                if reply.sender != initiator {
                    return Err(FlowError::Protocol(format!(
                        "reply from {} in a session with {}",
                        reply.sender.name, initiator.name
                    )));
                }
                match reply.message {
                    FlowMessage::Finalized { ftx } => ftx,
                    other => {
                        return Err(FlowError::Protocol(format!(
                            "unexpected {} message while awaiting finality",
                            other.kind()
                        )))
                    }
                }
            }
            Ok(None) | Err(_) => {
                let id = stx.id();
                warn!(
                    session_id = %session_id,
                    tx_id = %id,
                    "No finalized transaction from initiator, asking the notary"
                );
                services.finality.witnessed(&id).await.ok_or_else(|| {
                    FlowError::CounterpartyUnreachable {
                        counterparty: initiator.name.to_string(),
                        reason: format!(
                            "no finalized transaction within {} ms and none witnessed",
                            wait.as_millis()
                        ),
                    }
                })?
            }
        };
        if ftx.id() != stx.id() {
            return Err(FlowError::Protocol(format!(
                "finalized transaction {} does not match proposal {}",
                ftx.id(),
                stx.id()
            )));
        }
        ftx.verify()?;

        services.vault.record(ftx.clone()).await;
        services.report(session_id, FlowState::Done);
        Ok(ftx)
    }

    /// Returns the rejection reason sent back to the initiator.
    fn check_proposal(&self, initiator: &Party, stx: &SignedTransaction) -> Result<(), String> {
        DistributionContract::verify(&stx.tx).map_err(|e| e.reason)?;

        let me = &self.services.identity;
        if !stx.tx.required_signing_keys().contains(&me.owning_key) {
            return Err("Transaction does not require our signature.".to_string());
        }
        if let Some(record) = stx.tx.outputs.first() {
            let [from, to] = record.participants();
            if from != initiator {
                return Err("Proposal must come from the proposing distributor.".to_string());
            }
            if to != me {
                return Err("We are not the accepting distributor.".to_string());
            }
        }
        if !self
            .services
            .directory
            .notary_identities()
            .contains(&stx.tx.notary)
        {
            return Err(UNKNOWN_NOTARY.to_string());
        }

        stx.verify_signatures_except(&[me.owning_key])
            .map_err(|e| e.to_string())
    }
}
