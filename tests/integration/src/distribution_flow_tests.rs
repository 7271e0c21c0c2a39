//! Two live nodes running the agreement protocol end to end.

use crate::test_utils::*;
use noscalp_crypto::PartySigner;
use noscalp_flow::{DistributionRequest, FinalityService, FlowError, FlowState};
use noscalp_identity::Party;
use std::collections::BTreeSet;

#[tokio::test]
async fn test_football_final_is_agreed_and_witnessed() {
    let net = TwoPartyNetwork::start();
    let request = DistributionRequest::new(3, "Football Final", name(PARTY_B));

    let (session_id, handle) = net.a.start_distribution(request);
    let ftx = handle.await.unwrap().unwrap();

    // Two party signatures plus the notary witness
    assert_eq!(ftx.stx.sigs.len(), 2);
    let signers: BTreeSet<_> = ftx.stx.signers();
    let expected: BTreeSet<_> = [net.a.identity().owning_key, net.b.identity().owning_key]
        .into_iter()
        .collect();
    assert_eq!(signers, expected);
    assert_eq!(ftx.notary_signature.by, net.net.notary().identity().owning_key);
    assert!(ftx.verify().is_ok());

    let record = &ftx.stx.tx.outputs[0];
    assert_eq!(record.ticket_quantity, 3);
    assert_eq!(record.event_name, "Football Final");
    assert_eq!(&record.from_distributor, net.a.identity());
    assert_eq!(&record.to_distributor, net.b.identity());

    // Both sides hold the identical artifact
    assert_eq!(net.a.vault().get(&ftx.id()).await.as_ref(), Some(&ftx));
    assert_eq!(wait_for_transaction(&net.b, &ftx.id()).await.as_ref(), Some(&ftx));

    assert_eq!(
        net.a_progress.steps_for(session_id),
        vec![
            FlowState::Building,
            FlowState::LocalVerify,
            FlowState::LocalSign,
            FlowState::AwaitingCounterparty,
            FlowState::Finalizing,
            FlowState::Done,
        ]
    );
    wait_for_steps(&net.b_progress, session_id, 3).await;
    assert_eq!(
        net.b_progress.steps_for(session_id),
        vec![
            FlowState::CounterpartyVerify,
            FlowState::CounterpartySign,
            FlowState::Done,
        ]
    );
    assert_eq!(net.a_transport.sent_kinds(), vec!["proposal", "finalized"]);
}

#[tokio::test]
async fn test_zero_quantity_fails_locally_without_messages() {
    let net = TwoPartyNetwork::start();
    let request = DistributionRequest::new(0, "Concert", name(PARTY_B));

    let (session_id, handle) = net.a.start_distribution(request);
    let error = handle.await.unwrap().unwrap_err();

    assert_eq!(
        error,
        FlowError::Validation {
            reason: "Ticket quantity cannot be zero.".to_string()
        }
    );
    assert!(!error.is_retryable());
    assert!(net.a_transport.sent_kinds().is_empty());
    assert_eq!(
        net.a_progress.steps_for(session_id),
        vec![FlowState::Building, FlowState::LocalVerify]
    );
    assert!(net.a.vault().is_empty().await);
    assert_eq!(net.net.notary().notarised_count().await, 0);
}

#[tokio::test]
async fn test_blank_event_fails_locally_without_messages() {
    let net = TwoPartyNetwork::start();
    let request = DistributionRequest::new(5, "", name(PARTY_B));

    let error = net.a.run_distribution(request).await.unwrap_err();

    assert_eq!(
        error,
        FlowError::Validation {
            reason: "There must be event name.".to_string()
        }
    );
    assert!(net.a_transport.sent_kinds().is_empty());
}

#[tokio::test]
async fn test_event_blanked_in_transit_is_rejected_by_counterparty() {
    let net = TwoPartyNetwork::start_with(noscalp_core::FlowConfig::default(), TransitFault::BlankEventName);
    let request = DistributionRequest::new(3, "Football Final", name(PARTY_B));

    let (session_id, handle) = net.a.start_distribution(request);
    let error = handle.await.unwrap().unwrap_err();

    assert_eq!(
        error,
        FlowError::CounterpartyRejected {
            reason: "There must be event name.".to_string()
        }
    );
    assert!(!error.is_retryable());
    assert_eq!(net.a_transport.sent_kinds(), vec!["proposal"]);
    assert_eq!(
        net.a_progress.steps_for(session_id),
        vec![
            FlowState::Building,
            FlowState::LocalVerify,
            FlowState::LocalSign,
            FlowState::AwaitingCounterparty,
            FlowState::Rejected,
        ]
    );
    wait_for_steps(&net.b_progress, session_id, 2).await;
    assert_eq!(
        net.b_progress.steps_for(session_id),
        vec![FlowState::CounterpartyVerify, FlowState::Rejected]
    );

    // Nothing was finalized or recorded anywhere
    assert_eq!(net.net.notary().notarised_count().await, 0);
    assert!(net.a.vault().is_empty().await);
    assert!(net.b.vault().is_empty().await);
}

#[tokio::test]
async fn test_unknown_counterparty_makes_no_network_attempt() {
    let net = TwoPartyNetwork::start();
    let request = DistributionRequest::new(3, "Football Final", name("O=PartyZ, L=Oslo, C=NO"));

    let error = net.a.run_distribution(request).await.unwrap_err();

    assert_eq!(
        error,
        FlowError::UnknownParty {
            name: "O=PartyZ, L=Oslo, C=NO".to_string()
        }
    );
    assert!(net.a_transport.sent_kinds().is_empty());
}

#[tokio::test]
async fn test_counterparty_without_route_is_unreachable() {
    let net = TwoPartyNetwork::start();
    // In the directory, but no node is attached to the network
    net.net
        .directory()
        .register_party(Party::new(name(PARTY_C), PartySigner::new().public_key()))
        .unwrap();

    let request = DistributionRequest::new(3, "Football Final", name(PARTY_C));
    let error = net.a.run_distribution(request).await.unwrap_err();

    assert!(
        matches!(error, FlowError::CounterpartyUnreachable { ref counterparty, .. } if counterparty == PARTY_C),
        "{error:?}"
    );
    assert!(error.is_retryable());
    assert_eq!(net.a.open_sessions(), 0);
}

#[tokio::test]
async fn test_silent_counterparty_times_out() {
    let net = TwoPartyNetwork::start_with(short_timeouts(), TransitFault::None);
    net.net
        .directory()
        .register_party(Party::new(name(PARTY_C), PartySigner::new().public_key()))
        .unwrap();
    // Attached to the network but nobody reads the inbox
    let _inbox = net.net.network().register(name(PARTY_C));

    let request = DistributionRequest::new(3, "Football Final", name(PARTY_C));
    let error = net.a.run_distribution(request).await.unwrap_err();

    assert!(error.is_retryable(), "{error:?}");
    assert_eq!(net.a_transport.sent_kinds(), vec!["proposal"]);
    assert_eq!(net.net.notary().notarised_count().await, 0);
}

#[tokio::test]
async fn test_concurrent_runs_in_both_directions() {
    let net = TwoPartyNetwork::start();

    let mut handles = Vec::new();
    for i in 1..=5i64 {
        let (_, to_b) = net.a.start_distribution(DistributionRequest::new(
            i,
            format!("Match {i}"),
            name(PARTY_B),
        ));
        let (_, to_a) = net.b.start_distribution(DistributionRequest::new(
            i * 10,
            format!("Gig {i}"),
            name(PARTY_A),
        ));
        handles.push(to_b);
        handles.push(to_a);
    }

    let mut ids = BTreeSet::new();
    for handle in handles {
        let ftx = handle.await.unwrap().unwrap();
        assert!(ftx.verify().is_ok());
        ids.insert(ftx.id());
    }
    assert_eq!(ids.len(), 10);

    for id in &ids {
        assert!(wait_for_transaction(&net.a, id).await.is_some());
        assert!(wait_for_transaction(&net.b, id).await.is_some());
    }
    assert_eq!(net.a.vault().states().await.len(), 10);
    assert_eq!(net.b.vault().states().await.len(), 10);
    assert_eq!(net.net.notary().notarised_count().await, 10);
}

#[tokio::test]
async fn test_self_distribution_rejected_before_sending() {
    let net = TwoPartyNetwork::start();
    let request = DistributionRequest::new(3, "Football Final", name(PARTY_A));

    let error = net.a.run_distribution(request).await.unwrap_err();

    assert_eq!(
        error,
        FlowError::Validation {
            reason: "Distributors must be different parties.".to_string()
        }
    );
    assert!(net.a_transport.sent_kinds().is_empty());
}

#[tokio::test]
async fn test_lost_finalized_message_is_recovered_from_notary() {
    let config = noscalp_core::FlowConfig {
        counterparty_timeout_ms: 500,
        finality_timeout_ms: 500,
    };
    let net = TwoPartyNetwork::start_with(config, TransitFault::DropFinalized);
    let request = DistributionRequest::new(4, "Cup Final", name(PARTY_B));

    let (session_id, handle) = net.a.start_distribution(request);
    let ftx = handle.await.unwrap().unwrap();
    assert_eq!(net.a_transport.sent_kinds(), vec!["proposal", "finalized"]);

    // B never sees the hand-off, but both parties end with the same artifact
    assert_eq!(wait_for_transaction(&net.b, &ftx.id()).await.as_ref(), Some(&ftx));
    assert_eq!(net.a.vault().get(&ftx.id()).await.as_ref(), Some(&ftx));
    wait_for_steps(&net.b_progress, session_id, 3).await;
    assert_eq!(
        net.b_progress.steps_for(session_id).last(),
        Some(&FlowState::Done)
    );
}
