//! Initiating side of a distribution.

use noscalp_domain::{
    DistributionCommand, DistributionContract, DistributionState, FinalizedTransaction,
    SignedTransaction, TransactionBuilder, TransactionError,
};
use noscalp_identity::{LegalName, Party};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{FlowError, FlowResult};
use crate::messages::FlowMessage;
use crate::node::{NodeServices, SessionTable};
use crate::progress::FlowState;

/// What the initiating distributor asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionRequest {
    pub ticket_quantity: i64,
    pub event_name: String,
    /// Accepting distributor
    pub counterparty: LegalName,
}

impl DistributionRequest {
    pub fn new(ticket_quantity: i64, event_name: impl Into<String>, counterparty: LegalName) -> Self {
        Self {
            ticket_quantity,
            event_name: event_name.into(),
            counterparty,
        }
    }
}

pub(crate) struct Initiator {
    services: Arc<NodeServices>,
    sessions: Arc<SessionTable>,
    session_id: Uuid,
}

fn unreachable(counterparty: &Party, reason: impl Into<String>) -> FlowError {
    FlowError::CounterpartyUnreachable {
        counterparty: counterparty.name.to_string(),
        reason: reason.into(),
    }
}

impl Initiator {
    pub(crate) fn new(
        services: Arc<NodeServices>,
        sessions: Arc<SessionTable>,
        session_id: Uuid,
    ) -> Self {
        Self {
            services,
            sessions,
            session_id,
        }
    }

    pub(crate) async fn run(self, request: DistributionRequest) -> FlowResult<FinalizedTransaction> {
        let result = self.execute(&request).await;
        match &result {
            Ok(ftx) => info!(
                session_id = %self.session_id,
                tx_id = %ftx.id(),
                counterparty = %request.counterparty,
                "Distribution committed"
            ),
            Err(e @ (FlowError::Validation { .. } | FlowError::CounterpartyRejected { .. })) => {
                warn!(session_id = %self.session_id, error = %e, "Distribution rejected")
            }
            Err(e) => error!(
                session_id = %self.session_id,
                error = %e,
                retryable = e.is_retryable(),
                "Distribution failed"
            ),
        }
        result
    }

    async fn execute(&self, request: &DistributionRequest) -> FlowResult<FinalizedTransaction> {
        let services = &self.services;
        let me = &services.identity;

        services.report(self.session_id, FlowState::Building);
        let counterparty = services.directory.resolve(&request.counterparty)?;
        let notary = services
            .directory
            .notary_identities()
            .into_iter()
            .next()
            .ok_or_else(|| FlowError::Protocol("no notary in the network directory".to_string()))?;

        let output = DistributionState::new(
            request.ticket_quantity,
            request.event_name.clone(),
            me.clone(),
            counterparty.clone(),
        );
        let tx = TransactionBuilder::new(notary)
            .add_output_state(output)
            .add_command(
                DistributionCommand::Create,
                vec![me.owning_key, counterparty.owning_key],
            )
            .to_wire_transaction();

        services.report(self.session_id, FlowState::LocalVerify);
        DistributionContract::verify(&tx)?;

        services.report(self.session_id, FlowState::LocalSign);
        let stx = SignedTransaction::sign_initial(tx, &services.signer);

        services.report(self.session_id, FlowState::AwaitingCounterparty);
        let stx = self.collect_signature(stx, &counterparty).await?;

        services.report(self.session_id, FlowState::Finalizing);
        let finality_timeout = services.config.finality_timeout();
        let ftx = match timeout(finality_timeout, services.finality.finalise(stx)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(FlowError::Finalization {
                    reason: format!(
                        "notary did not respond within {} ms",
                        finality_timeout.as_millis()
                    ),
                })
            }
        };
        ftx.verify()?;
        services.vault.record(ftx.clone()).await;

        let finalized = FlowMessage::Finalized { ftx: ftx.clone() };
        if let Err(e) = services
            .send(self.session_id, &counterparty.name, finalized)
            .await
        {
            // Already notarised; the counterparty can still learn of it later
            warn!(
                session_id = %self.session_id,
                counterparty = %counterparty.name,
                error = %e,
                "Could not deliver finalized transaction"
            );
        }

        services.report(self.session_id, FlowState::Done);
        Ok(ftx)
    }

    async fn collect_signature(
        &self,
        stx: SignedTransaction,
        counterparty: &Party,
    ) -> FlowResult<SignedTransaction> {
        let services = &self.services;
        let (_session, mut inbound) = self
            .sessions
            .open(self.session_id)
            .ok_or_else(|| FlowError::Protocol(format!("session {} already open", self.session_id)))?;

        let proposal = FlowMessage::Proposal { stx: stx.clone() };
        services
            .send(self.session_id, &counterparty.name, proposal)
            .await
            .map_err(|e| unreachable(counterparty, e.to_string()))?;

        let counterparty_timeout = services.config.counterparty_timeout();
        let reply = match timeout(counterparty_timeout, inbound.recv()).await {
            Ok(Some(reply)) => reply,
            Ok(None) => return Err(unreachable(counterparty, "session closed")),
            Err(_) => {
                return Err(unreachable(
                    counterparty,
                    format!("no response within {} ms", counterparty_timeout.as_millis()),
                ))
            }
        };
        if reply.sender != *counterparty {
            return Err(FlowError::Protocol(format!(
                "reply from {} in a session with {}",
                reply.sender.name, counterparty.name
            )));
        }

        let signature = match reply.message {
            FlowMessage::Signature { signature } => signature,
            FlowMessage::Reject { reason } => {
                services.report(self.session_id, FlowState::Rejected);
                return Err(FlowError::CounterpartyRejected { reason });
            }
            other => {
                return Err(FlowError::Protocol(format!(
                    "unexpected {} message while awaiting a signature",
                    other.kind()
                )))
            }
        };

        if signature.by != counterparty.owning_key {
            return Err(TransactionError::UnexpectedSigner {
                key_id: signature.by.key_id(),
            }
            .into());
        }
        signature
            .verify(stx.id().as_bytes())
            .map_err(|e| TransactionError::InvalidSignature {
                key_id: signature.by.key_id(),
                reason: e.to_string(),
            })?;

        let stx = stx.with_additional_signature(signature);
        stx.verify_required_signatures()?;
        Ok(stx)
    }
}
