//! Proposals hand-crafted by an outsider party, checking what the responder
//! accepts and what it sends back.

use crate::test_utils::*;
use noscalp_crypto::{PartySigner, SecureHash};
use noscalp_domain::{
    DistributionCommand, DistributionContract, DistributionState, FinalizedTransaction,
    SignedTransaction, StateRef, TransactionBuilder, ValidationOutcome,
};
use noscalp_flow::responder::UNKNOWN_NOTARY;
use noscalp_flow::{Envelope, FinalityService, FlowMessage, Inbox, Transport};
use noscalp_identity::Party;
use tokio::time::{timeout, Duration};
use uuid::Uuid;

const OUTSIDER: &str = "O=Outsider, L=Berlin, C=DE";

struct Outsider {
    party: Party,
    signer: PartySigner,
    inbox: Inbox,
}

impl Outsider {
    fn join(net: &TwoPartyNetwork) -> Self {
        let signer = PartySigner::new();
        let party = Party::new(name(OUTSIDER), signer.public_key());
        net.net.directory().register_party(party.clone()).unwrap();
        let inbox = net.net.network().register(name(OUTSIDER));
        Self {
            party,
            signer,
            inbox,
        }
    }

    fn builder(&self, net: &TwoPartyNetwork, quantity: i64, event: &str) -> TransactionBuilder {
        TransactionBuilder::new(net.net.notary().identity().clone())
            .add_output_state(DistributionState::new(
                quantity,
                event,
                self.party.clone(),
                net.b.identity().clone(),
            ))
            .add_command(
                DistributionCommand::Create,
                vec![self.party.owning_key, net.b.identity().owning_key],
            )
    }

    /// Sends `message` to party B within `session_id`.
    async fn send(&self, net: &TwoPartyNetwork, session_id: Uuid, message: FlowMessage) {
        let envelope = Envelope::new(
            session_id,
            self.party.clone(),
            net.b.identity().name.clone(),
            message,
        );
        net.net.network().send(envelope).await.unwrap();
    }

    /// Opens a session with party B by proposing `stx` and returns B's reply.
    async fn open(&mut self, net: &TwoPartyNetwork, stx: SignedTransaction) -> (Uuid, FlowMessage) {
        let session_id = Uuid::new_v4();
        self.send(net, session_id, FlowMessage::Proposal { stx }).await;

        let bytes = timeout(Duration::from_secs(2), self.inbox.recv())
            .await
            .expect("reply within two seconds")
            .expect("inbox open");
        (session_id, Envelope::decode(&bytes).unwrap().message)
    }

    async fn propose(&mut self, net: &TwoPartyNetwork, stx: SignedTransaction) -> FlowMessage {
        self.open(net, stx).await.1
    }

    /// Proposes a valid distribution and returns the session id together
    /// with the transaction carrying both signatures.
    async fn counter_signed(&mut self, net: &TwoPartyNetwork) -> (Uuid, SignedTransaction) {
        let stx = SignedTransaction::sign_initial(
            self.builder(net, 6, "Ballet").to_wire_transaction(),
            &self.signer,
        );
        match self.open(net, stx.clone()).await {
            (session_id, FlowMessage::Signature { signature }) => {
                (session_id, stx.with_additional_signature(signature))
            }
            (_, other) => panic!("expected a signature, got {}", other.kind()),
        }
    }

    async fn expect_reject(&mut self, net: &TwoPartyNetwork, stx: SignedTransaction) -> String {
        match self.propose(net, stx).await {
            FlowMessage::Reject { reason } => reason,
            other => panic!("expected a rejection, got {}", other.kind()),
        }
    }
}

#[tokio::test]
async fn test_responder_verdict_matches_local_evaluation() {
    let net = TwoPartyNetwork::start();
    let mut outsider = Outsider::join(&net);

    let cases = vec![
        outsider.builder(&net, 0, "Concert").to_wire_transaction(),
        outsider.builder(&net, -4, "Concert").to_wire_transaction(),
        outsider.builder(&net, 5, "").to_wire_transaction(),
        outsider.builder(&net, 5, "   ").to_wire_transaction(),
        outsider
            .builder(&net, 5, "Concert")
            .add_input_state(StateRef {
                txhash: SecureHash::of(b"earlier distribution"),
                index: 0,
            })
            .to_wire_transaction(),
        {
            let mut tx = outsider.builder(&net, 5, "Concert").to_wire_transaction();
            tx.outputs.push(tx.outputs[0].clone());
            tx
        },
    ];

    for tx in cases {
        let expected = match DistributionContract::evaluate(&tx) {
            ValidationOutcome::Rejected { reason } => reason,
            ValidationOutcome::Accepted => panic!("case should be invalid"),
        };
        let stx = SignedTransaction::sign_initial(tx, &outsider.signer);
        assert_eq!(outsider.expect_reject(&net, stx).await, expected);
    }
    assert!(net.b.vault().is_empty().await);
}

#[tokio::test]
async fn test_valid_proposal_is_counter_signed() {
    let net = TwoPartyNetwork::start();
    let mut outsider = Outsider::join(&net);

    let stx = SignedTransaction::sign_initial(
        outsider.builder(&net, 7, "Opera").to_wire_transaction(),
        &outsider.signer,
    );
    let id = stx.id();
    match outsider.propose(&net, stx).await {
        FlowMessage::Signature { signature } => {
            assert_eq!(signature.by, net.b.identity().owning_key);
            assert!(signature.verify(id.as_bytes()).is_ok());
        }
        other => panic!("expected a signature, got {}", other.kind()),
    }
}

#[tokio::test]
async fn test_responder_refuses_when_not_a_signer() {
    let net = TwoPartyNetwork::start();
    let mut outsider = Outsider::join(&net);
    let stranger = PartySigner::new().public_key();

    let tx = TransactionBuilder::new(net.net.notary().identity().clone())
        .add_output_state(DistributionState::new(
            2,
            "Opera",
            outsider.party.clone(),
            net.b.identity().clone(),
        ))
        .add_command(DistributionCommand::Create, vec![outsider.party.owning_key, stranger])
        .to_wire_transaction();
    let stx = SignedTransaction::sign_initial(tx, &outsider.signer);

    assert_eq!(
        outsider.expect_reject(&net, stx).await,
        "Transaction does not require our signature."
    );
}

#[tokio::test]
async fn test_responder_refuses_impersonated_initiator() {
    let net = TwoPartyNetwork::start();
    let mut outsider = Outsider::join(&net);

    // Claims party A proposed it, but arrives from the outsider
    let tx = TransactionBuilder::new(net.net.notary().identity().clone())
        .add_output_state(DistributionState::new(
            2,
            "Opera",
            net.a.identity().clone(),
            net.b.identity().clone(),
        ))
        .add_command(
            DistributionCommand::Create,
            vec![net.a.identity().owning_key, net.b.identity().owning_key],
        )
        .to_wire_transaction();
    let stx = SignedTransaction::sign_initial(tx, &outsider.signer);

    assert_eq!(
        outsider.expect_reject(&net, stx).await,
        "Proposal must come from the proposing distributor."
    );
}

#[tokio::test]
async fn test_responder_refuses_unsigned_proposal() {
    let net = TwoPartyNetwork::start();
    let mut outsider = Outsider::join(&net);

    let stx = SignedTransaction {
        tx: outsider.builder(&net, 2, "Opera").to_wire_transaction(),
        sigs: Vec::new(),
    };

    let reason = outsider.expect_reject(&net, stx).await;
    assert!(reason.starts_with("Missing signatures from keys"), "{reason}");
    assert!(reason.contains(&outsider.party.owning_key.key_id()), "{reason}");
}

#[tokio::test]
async fn test_responder_refuses_notary_outside_directory() {
    let net = TwoPartyNetwork::start();
    let mut outsider = Outsider::join(&net);
    let fake_notary = Party::new(
        name("O=Fake Notary, L=London, C=GB"),
        PartySigner::new().public_key(),
    );

    let tx = TransactionBuilder::new(fake_notary)
        .add_output_state(DistributionState::new(
            2,
            "Opera",
            outsider.party.clone(),
            net.b.identity().clone(),
        ))
        .add_command(
            DistributionCommand::Create,
            vec![outsider.party.owning_key, net.b.identity().owning_key],
        )
        .to_wire_transaction();
    let stx = SignedTransaction::sign_initial(tx, &outsider.signer);

    assert_eq!(outsider.expect_reject(&net, stx).await, UNKNOWN_NOTARY);
    assert!(net.b.vault().is_empty().await);
}

#[tokio::test]
async fn test_finalized_for_another_transaction_is_not_recorded() {
    let net = TwoPartyNetwork::start();
    let mut outsider = Outsider::join(&net);
    let (session_id, _) = outsider.counter_signed(&net).await;

    let other = SignedTransaction::sign_initial(
        outsider.builder(&net, 9, "Other Event").to_wire_transaction(),
        &outsider.signer,
    );
    let notary_signature = outsider.signer.sign(other.id().as_bytes());
    let ftx = FinalizedTransaction {
        stx: other,
        notary_signature,
    };
    outsider.send(&net, session_id, FlowMessage::Finalized { ftx }).await;

    wait_for_idle(&net.b).await;
    assert_eq!(net.b.open_sessions(), 0);
    assert!(net.b.vault().is_empty().await);
}

#[tokio::test]
async fn test_forged_notary_witness_is_not_recorded() {
    let net = TwoPartyNetwork::start();
    let mut outsider = Outsider::join(&net);
    let (session_id, stx) = outsider.counter_signed(&net).await;

    // Right transaction, but witnessed by the proposer instead of the notary
    let notary_signature = outsider.signer.sign(stx.id().as_bytes());
    let ftx = FinalizedTransaction {
        stx,
        notary_signature,
    };
    outsider.send(&net, session_id, FlowMessage::Finalized { ftx }).await;

    wait_for_idle(&net.b).await;
    assert_eq!(net.b.open_sessions(), 0);
    assert!(net.b.vault().is_empty().await);
    assert_eq!(net.net.notary().notarised_count().await, 0);
}

#[tokio::test]
async fn test_unexpected_message_while_awaiting_finality() {
    let net = TwoPartyNetwork::start();
    let mut outsider = Outsider::join(&net);
    let (session_id, _) = outsider.counter_signed(&net).await;

    let reject = FlowMessage::Reject {
        reason: "changed my mind".to_string(),
    };
    outsider.send(&net, session_id, reject).await;

    wait_for_idle(&net.b).await;
    assert_eq!(net.b.open_sessions(), 0);
    assert!(net.b.vault().is_empty().await);
}
