//! Protocol progress reporting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tracing::info;
use uuid::Uuid;

/// Steps of a protocol run, across both roles.
///
/// An initiator moves through `Building`, `LocalVerify`, `LocalSign`,
/// `AwaitingCounterparty`, `Finalizing` and `Done`. A responder moves through
/// `CounterpartyVerify`, then `CounterpartySign` or `Rejected`, and `Done`
/// once it holds the finalized transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowState {
    Building,
    LocalVerify,
    LocalSign,
    AwaitingCounterparty,
    CounterpartyVerify,
    CounterpartySign,
    Rejected,
    Finalizing,
    Done,
}

impl FlowState {
    pub fn description(&self) -> &'static str {
        match self {
            FlowState::Building => "Generating transaction based on new ticket distribution.",
            FlowState::LocalVerify => "Verifying contract constraints.",
            FlowState::LocalSign => "Signing transaction with our private key.",
            FlowState::AwaitingCounterparty => "Gathering the counterparty's signature.",
            FlowState::CounterpartyVerify => "Verifying the proposed distribution.",
            FlowState::CounterpartySign => "Counter-signing the proposed distribution.",
            FlowState::Rejected => "Proposal rejected.",
            FlowState::Finalizing => "Obtaining notary signature and recording transaction.",
            FlowState::Done => "Distribution recorded.",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Rejected | FlowState::Done)
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Receives every state transition of every run on a node.
pub trait ProgressObserver: Send + Sync {
    fn on_transition(&self, session_id: Uuid, state: FlowState);
}

/// Observer that keeps the transitions it has seen.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    steps: Mutex<Vec<(Uuid, FlowState)>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transitions of one session, in order.
    pub fn steps_for(&self, session_id: Uuid) -> Vec<FlowState> {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(id, _)| *id == session_id)
            .map(|(_, state)| *state)
            .collect()
    }

    /// All transitions, in order.
    pub fn steps(&self) -> Vec<(Uuid, FlowState)> {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ProgressObserver for ProgressTracker {
    fn on_transition(&self, session_id: Uuid, state: FlowState) {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((session_id, state));
    }
}

/// Logs a transition and forwards it to the node's observer, if any.
pub(crate) fn report(observer: Option<&dyn ProgressObserver>, session_id: Uuid, state: FlowState) {
    info!(session_id = %session_id, state = %state, "{}", state.description());
    if let Some(observer) = observer {
        observer.on_transition(session_id, state);
    }
}
