//! Messages exchanged between distributors during a protocol run.

use noscalp_crypto::DigitalSignature;
use noscalp_domain::{FinalizedTransaction, SignedTransaction};
use noscalp_identity::{LegalName, Party};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TransportError;

/// Protocol payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowMessage {
    /// Initiator to responder: the proposal carrying the initiator's signature
    Proposal { stx: SignedTransaction },
    /// Responder to initiator: counter-signature over the transaction id
    Signature { signature: DigitalSignature },
    /// Responder to initiator: the proposal failed verification
    Reject { reason: String },
    /// Initiator to responder: the notarised transaction
    Finalized { ftx: FinalizedTransaction },
}

impl FlowMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            FlowMessage::Proposal { .. } => "proposal",
            FlowMessage::Signature { .. } => "signature",
            FlowMessage::Reject { .. } => "reject",
            FlowMessage::Finalized { .. } => "finalized",
        }
    }
}

/// A message addressed to one party within one protocol session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub session_id: Uuid,
    pub sender: Party,
    pub recipient: LegalName,
    pub message: FlowMessage,
}

impl Envelope {
    pub fn new(session_id: Uuid, sender: Party, recipient: LegalName, message: FlowMessage) -> Self {
        Self {
            session_id,
            sender,
            recipient,
            message,
        }
    }

    /// Wire encoding.
    pub fn encode(&self) -> Result<Vec<u8>, TransportError> {
        serde_json::to_vec(self).map_err(|e| TransportError::Encoding(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, TransportError> {
        serde_json::from_slice(bytes).map_err(|e| TransportError::Encoding(e.to_string()))
    }
}
