//! Test utilities for multi-node protocol tests

use async_trait::async_trait;
use noscalp_core::FlowConfig;
use noscalp_crypto::SecureHash;
use noscalp_domain::FinalizedTransaction;
use noscalp_flow::{
    Envelope, FlowMessage, FlowNode, LocalNetwork, ProgressTracker, Transport, TransportError,
};
use noscalp_identity::LegalName;
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Duration};

pub const NOTARY: &str = "O=Notary, L=London, C=GB";
pub const PARTY_A: &str = "O=PartyA, L=London, C=GB";
pub const PARTY_B: &str = "O=PartyB, L=New York, C=US";
pub const PARTY_C: &str = "O=PartyC, L=Paris, C=FR";

pub fn name(s: &str) -> LegalName {
    LegalName::parse(s).expect("test legal name")
}

/// Installs a test-writer subscriber once; later calls are no-ops.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Flow timeouts short enough for tests that wait on a silent peer.
pub fn short_timeouts() -> FlowConfig {
    FlowConfig {
        counterparty_timeout_ms: 200,
        finality_timeout_ms: 2_000,
    }
}

/// Wraps another transport and remembers every envelope it forwards.
pub struct RecordingTransport {
    inner: Arc<dyn Transport>,
    sent: Mutex<Vec<Envelope>>,
}

impl RecordingTransport {
    pub fn new(inner: Arc<dyn Transport>) -> Self {
        Self {
            inner,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent_kinds(&self) -> Vec<&'static str> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.message.kind())
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(envelope.clone());
        self.inner.send(envelope).await
    }
}

/// Drops every `Finalized` message, reporting success to the sender.
pub struct DroppingFinalizedTransport {
    inner: Arc<dyn Transport>,
}

impl DroppingFinalizedTransport {
    pub fn new(inner: Arc<dyn Transport>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Transport for DroppingFinalizedTransport {
    async fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        if matches!(envelope.message, FlowMessage::Finalized { .. }) {
            return Ok(());
        }
        self.inner.send(envelope).await
    }
}

/// Blanks the event name of every proposal it forwards.
pub struct TamperingTransport {
    inner: Arc<dyn Transport>,
}

impl TamperingTransport {
    pub fn new(inner: Arc<dyn Transport>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Transport for TamperingTransport {
    async fn send(&self, mut envelope: Envelope) -> Result<(), TransportError> {
        if let FlowMessage::Proposal { stx } = &mut envelope.message {
            for output in &mut stx.tx.outputs {
                output.event_name = String::new();
            }
        }
        self.inner.send(envelope).await
    }
}

/// What happens to messages party A sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitFault {
    None,
    BlankEventName,
    DropFinalized,
}

/// Two distributors and a notary on one in-memory network, with progress
/// trackers and a recording transport on the initiating side.
pub struct TwoPartyNetwork {
    pub net: LocalNetwork,
    pub a: Arc<FlowNode>,
    pub b: Arc<FlowNode>,
    pub a_progress: Arc<ProgressTracker>,
    pub b_progress: Arc<ProgressTracker>,
    pub a_transport: Arc<RecordingTransport>,
}

impl TwoPartyNetwork {
    pub fn start() -> Self {
        Self::start_with(FlowConfig::default(), TransitFault::None)
    }

    pub fn start_with(config: FlowConfig, fault: TransitFault) -> Self {
        init_test_logging();
        let mut net = LocalNetwork::new(name(NOTARY), config).expect("notary");

        let a_progress = Arc::new(ProgressTracker::new());
        let b_progress = Arc::new(ProgressTracker::new());
        let mut a_transport = None;

        let a = {
            let a_progress = Arc::clone(&a_progress);
            let a_transport = &mut a_transport;
            net.add_node_with(name(PARTY_A), move |mut services| {
                let network = services.transport.clone();
                let inner: Arc<dyn Transport> = match fault {
                    TransitFault::None => network,
                    TransitFault::BlankEventName => Arc::new(TamperingTransport::new(network)),
                    TransitFault::DropFinalized => {
                        Arc::new(DroppingFinalizedTransport::new(network))
                    }
                };
                let recording = Arc::new(RecordingTransport::new(inner));
                *a_transport = Some(Arc::clone(&recording));
                services.transport = recording;
                services.with_observer(a_progress)
            })
            .expect("party A")
        };
        let b = {
            let b_progress = Arc::clone(&b_progress);
            net.add_node_with(name(PARTY_B), move |services| {
                services.with_observer(b_progress)
            })
            .expect("party B")
        };

        Self {
            net,
            a,
            b,
            a_progress,
            b_progress,
            a_transport: a_transport.expect("transport installed"),
        }
    }
}

/// Polls `node`'s vault until `id` is recorded or about three seconds pass.
pub async fn wait_for_transaction(node: &FlowNode, id: &SecureHash) -> Option<FinalizedTransaction> {
    for _ in 0..300 {
        if let Some(ftx) = node.vault().get(id).await {
            return Some(ftx);
        }
        sleep(Duration::from_millis(10)).await;
    }
    None
}

/// Waits until `tracker` has seen `count` transitions for `session_id`.
pub async fn wait_for_steps(tracker: &ProgressTracker, session_id: uuid::Uuid, count: usize) {
    for _ in 0..200 {
        if tracker.steps_for(session_id).len() >= count {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
}

/// Waits until every protocol session on `node` has finished.
pub async fn wait_for_idle(node: &FlowNode) {
    for _ in 0..200 {
        if node.open_sessions() == 0 {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
}
