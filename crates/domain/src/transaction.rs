//! Transactions carrying distribution states.
//!
//! A [`WireTransaction`] is the unsigned proposal. Its identifier is a BLAKE3
//! digest over a fixed, length-prefixed encoding of every field, and that
//! identifier is what parties and the notary sign. A [`SignedTransaction`]
//! accumulates party signatures; a [`FinalizedTransaction`] adds the notary's
//! witness.

use noscalp_crypto::{DigitalSignature, PartySigner, PublicKey, SecureHash};
use noscalp_identity::Party;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::TransactionError;
use crate::state::{DistributionState, StateAndRef, StateRef};

const TX_DOMAIN_TAG: &[u8] = b"noscalp.wire-transaction.v1";

/// Commands understood by the distribution contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionCommand {
    /// Register a new ticket distribution. Never consumes existing states.
    Create,
}

/// A command and the keys that must sign for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub value: DistributionCommand,
    pub signers: Vec<PublicKey>,
}

/// Unsigned transaction proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTransaction {
    pub inputs: Vec<StateRef>,
    pub outputs: Vec<DistributionState>,
    pub commands: Vec<Command>,
    pub notary: Party,
    /// Random salt so that identical proposals get distinct ids
    pub privacy_salt: SecureHash,
}

fn update_bytes(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn update_party(hasher: &mut blake3::Hasher, party: &Party) {
    update_bytes(hasher, party.name.to_string().as_bytes());
    hasher.update(party.owning_key.as_bytes());
}

impl WireTransaction {
    /// Transaction identifier.
    pub fn id(&self) -> SecureHash {
        let mut hasher = blake3::Hasher::new();
        update_bytes(&mut hasher, TX_DOMAIN_TAG);

        hasher.update(&(self.inputs.len() as u64).to_le_bytes());
        for input in &self.inputs {
            hasher.update(input.txhash.as_bytes());
            hasher.update(&input.index.to_le_bytes());
        }

        hasher.update(&(self.outputs.len() as u64).to_le_bytes());
        for output in &self.outputs {
            hasher.update(&output.ticket_quantity.to_le_bytes());
            update_bytes(&mut hasher, output.event_name.as_bytes());
            update_party(&mut hasher, &output.from_distributor);
            update_party(&mut hasher, &output.to_distributor);
        }

        hasher.update(&(self.commands.len() as u64).to_le_bytes());
        for command in &self.commands {
            let tag: u8 = match command.value {
                DistributionCommand::Create => 0,
            };
            hasher.update(&[tag]);
            hasher.update(&(command.signers.len() as u64).to_le_bytes());
            for signer in &command.signers {
                hasher.update(signer.as_bytes());
            }
        }

        update_party(&mut hasher, &self.notary);
        hasher.update(self.privacy_salt.as_bytes());

        SecureHash::from_bytes(*hasher.finalize().as_bytes())
    }

    /// Distinct keys named by any command, in key order.
    pub fn required_signing_keys(&self) -> Vec<PublicKey> {
        self.commands
            .iter()
            .flat_map(|c| c.signers.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Outputs paired with the references they will be stored under.
    pub fn out_refs(&self) -> Vec<StateAndRef> {
        let txhash = self.id();
        self.outputs
            .iter()
            .enumerate()
            .map(|(index, state)| StateAndRef {
                state: state.clone(),
                reference: StateRef {
                    txhash,
                    index: index as u32,
                },
            })
            .collect()
    }
}

/// Incrementally assembles a [`WireTransaction`].
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    notary: Party,
    inputs: Vec<StateRef>,
    outputs: Vec<DistributionState>,
    commands: Vec<Command>,
    privacy_salt: Option<SecureHash>,
}

impl TransactionBuilder {
    pub fn new(notary: Party) -> Self {
        Self {
            notary,
            inputs: Vec::new(),
            outputs: Vec::new(),
            commands: Vec::new(),
            privacy_salt: None,
        }
    }

    pub fn add_input_state(mut self, input: StateRef) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn add_output_state(mut self, state: DistributionState) -> Self {
        self.outputs.push(state);
        self
    }

    pub fn add_command(mut self, value: DistributionCommand, signers: Vec<PublicKey>) -> Self {
        self.commands.push(Command { value, signers });
        self
    }

    /// Fixes the salt instead of drawing a random one.
    pub fn with_privacy_salt(mut self, salt: SecureHash) -> Self {
        self.privacy_salt = Some(salt);
        self
    }

    pub fn to_wire_transaction(&self) -> WireTransaction {
        let privacy_salt = self.privacy_salt.unwrap_or_else(|| {
            use rand::RngCore;
            let mut salt = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut salt);
            SecureHash::from_bytes(salt)
        });
        WireTransaction {
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            commands: self.commands.clone(),
            notary: self.notary.clone(),
            privacy_salt,
        }
    }
}

/// A transaction plus the party signatures collected so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub tx: WireTransaction,
    pub sigs: Vec<DigitalSignature>,
}

impl SignedTransaction {
    /// Signs `tx` with the first signature.
    pub fn sign_initial(tx: WireTransaction, signer: &PartySigner) -> Self {
        let signature = signer.sign(tx.id().as_bytes());
        Self {
            tx,
            sigs: vec![signature],
        }
    }

    pub fn id(&self) -> SecureHash {
        self.tx.id()
    }

    /// Adds `signature`, replacing any earlier signature by the same key.
    pub fn with_additional_signature(mut self, signature: DigitalSignature) -> Self {
        self.sigs.retain(|s| s.by != signature.by);
        self.sigs.push(signature);
        self
    }

    /// Keys that have signed.
    pub fn signers(&self) -> BTreeSet<PublicKey> {
        self.sigs.iter().map(|s| s.by).collect()
    }

    /// Required keys that have not signed yet.
    pub fn missing_signers(&self) -> Vec<PublicKey> {
        let signed = self.signers();
        self.tx
            .required_signing_keys()
            .into_iter()
            .filter(|k| !signed.contains(k))
            .collect()
    }

    /// Checks every attached signature, and that every required key other
    /// than those in `allowed_to_be_missing` has signed.
    pub fn verify_signatures_except(
        &self,
        allowed_to_be_missing: &[PublicKey],
    ) -> Result<(), TransactionError> {
        let id = self.id();
        let required = self.tx.required_signing_keys();

        for sig in &self.sigs {
            if !required.contains(&sig.by) {
                return Err(TransactionError::UnexpectedSigner {
                    key_id: sig.by.key_id(),
                });
            }
            sig.verify(id.as_bytes())
                .map_err(|e| TransactionError::InvalidSignature {
                    key_id: sig.by.key_id(),
                    reason: e.to_string(),
                })?;
        }

        let missing: Vec<String> = self
            .missing_signers()
            .into_iter()
            .filter(|k| !allowed_to_be_missing.contains(k))
            .map(|k| k.key_id())
            .collect();
        if !missing.is_empty() {
            return Err(TransactionError::MissingSignatures { missing });
        }
        Ok(())
    }

    pub fn verify_required_signatures(&self) -> Result<(), TransactionError> {
        self.verify_signatures_except(&[])
    }
}

/// A fully signed transaction witnessed by the notary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedTransaction {
    pub stx: SignedTransaction,
    pub notary_signature: DigitalSignature,
}

impl FinalizedTransaction {
    pub fn id(&self) -> SecureHash {
        self.stx.id()
    }

    /// Checks the party signatures and the notary witness.
    pub fn verify(&self) -> Result<(), TransactionError> {
        self.stx.verify_required_signatures()?;

        if self.notary_signature.by != self.stx.tx.notary.owning_key {
            return Err(TransactionError::InvalidWitness(format!(
                "signed by {} instead of notary {}",
                self.notary_signature.by.key_id(),
                self.stx.tx.notary.name
            )));
        }
        self.notary_signature
            .verify(self.id().as_bytes())
            .map_err(|e| TransactionError::InvalidWitness(e.to_string()))
    }

    pub fn out_refs(&self) -> Vec<StateAndRef> {
        self.stx.tx.out_refs()
    }
}
