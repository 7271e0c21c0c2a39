//! A distributor node: its services, session table and inbound dispatcher.

use noscalp_core::FlowConfig;
use noscalp_crypto::PartySigner;
use noscalp_domain::FinalizedTransaction;
use noscalp_identity::{IdentityResolver, LegalName, Party};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{FlowError, FlowResult, TransportError};
use crate::initiator::{DistributionRequest, Initiator};
use crate::messages::{Envelope, FlowMessage};
use crate::notary::FinalityService;
use crate::progress::{self, FlowState, ProgressObserver};
use crate::responder::Responder;
use crate::transport::{Inbox, Transport};
use crate::vault::Vault;

/// Everything a protocol run needs from its hosting node.
pub struct NodeServices {
    pub identity: Party,
    pub signer: Arc<PartySigner>,
    pub directory: Arc<dyn IdentityResolver>,
    pub transport: Arc<dyn Transport>,
    pub finality: Arc<dyn FinalityService>,
    pub vault: Arc<Vault>,
    pub config: FlowConfig,
    pub observer: Option<Arc<dyn ProgressObserver>>,
}

impl NodeServices {
    pub fn new(
        name: LegalName,
        signer: Arc<PartySigner>,
        directory: Arc<dyn IdentityResolver>,
        transport: Arc<dyn Transport>,
        finality: Arc<dyn FinalityService>,
    ) -> Self {
        Self {
            identity: Party::new(name, signer.public_key()),
            signer,
            directory,
            transport,
            finality,
            vault: Arc::new(Vault::new()),
            config: FlowConfig::default(),
            observer: None,
        }
    }

    pub fn with_config(mut self, config: FlowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub(crate) fn report(&self, session_id: Uuid, state: FlowState) {
        progress::report(self.observer.as_deref(), session_id, state);
    }

    pub(crate) async fn send(
        &self,
        session_id: Uuid,
        recipient: &LegalName,
        message: FlowMessage,
    ) -> Result<(), TransportError> {
        let envelope = Envelope::new(session_id, self.identity.clone(), recipient.clone(), message);
        self.transport.send(envelope).await
    }
}

pub(crate) enum Delivery {
    Delivered,
    /// The session exists but its run has stopped listening
    Closed,
    NoSession(Envelope),
}

/// Open sessions of a node, keyed by session id.
#[derive(Debug, Default)]
pub(crate) struct SessionTable {
    sessions: Mutex<HashMap<Uuid, mpsc::UnboundedSender<Envelope>>>,
}

impl SessionTable {
    /// Opens `session_id`, or returns `None` if it is already open.
    pub(crate) fn open(
        self: &Arc<Self>,
        session_id: Uuid,
    ) -> Option<(SessionGuard, mpsc::UnboundedReceiver<Envelope>)> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if sessions.contains_key(&session_id) {
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        sessions.insert(session_id, tx);
        let guard = SessionGuard {
            table: Arc::clone(self),
            session_id,
        };
        Some((guard, rx))
    }

    pub(crate) fn deliver(&self, envelope: Envelope) -> Delivery {
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        match sessions.get(&envelope.session_id) {
            Some(tx) => match tx.send(envelope) {
                Ok(()) => Delivery::Delivered,
                Err(_) => Delivery::Closed,
            },
            None => Delivery::NoSession(envelope),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn close(&self, session_id: &Uuid) {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id);
    }
}

/// Closes its session when the owning run finishes.
#[derive(Debug)]
pub(crate) struct SessionGuard {
    table: Arc<SessionTable>,
    session_id: Uuid,
}

impl SessionGuard {
    pub(crate) fn id(&self) -> Uuid {
        self.session_id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.table.close(&self.session_id);
    }
}

/// A running distributor node.
///
/// Dropping the node stops its dispatcher; runs already in flight keep going
/// until they finish or time out.
pub struct FlowNode {
    services: Arc<NodeServices>,
    sessions: Arc<SessionTable>,
    dispatcher: JoinHandle<()>,
}

impl FlowNode {
    /// Starts the dispatcher for `inbox`. Must be called inside a tokio runtime.
    pub fn start(services: NodeServices, inbox: Inbox) -> Self {
        let services = Arc::new(services);
        let sessions = Arc::new(SessionTable::default());
        let dispatcher = tokio::spawn(dispatch(
            Arc::clone(&services),
            Arc::clone(&sessions),
            inbox,
        ));
        info!(node = %services.identity.name, key_id = %services.identity.owning_key.key_id(), "Node started");
        Self {
            services,
            sessions,
            dispatcher,
        }
    }

    pub fn identity(&self) -> &Party {
        &self.services.identity
    }

    pub fn services(&self) -> &Arc<NodeServices> {
        &self.services
    }

    pub fn vault(&self) -> &Arc<Vault> {
        &self.services.vault
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Spawns an initiator run and returns its session id and handle.
    pub fn start_distribution(
        &self,
        request: DistributionRequest,
    ) -> (Uuid, JoinHandle<FlowResult<FinalizedTransaction>>) {
        let session_id = Uuid::new_v4();
        let initiator = Initiator::new(
            Arc::clone(&self.services),
            Arc::clone(&self.sessions),
            session_id,
        );
        (session_id, tokio::spawn(initiator.run(request)))
    }

    /// Runs the initiator to completion.
    pub async fn run_distribution(
        &self,
        request: DistributionRequest,
    ) -> FlowResult<FinalizedTransaction> {
        let (session_id, handle) = self.start_distribution(request);
        handle.await.map_err(|e| {
            FlowError::Protocol(format!("run {} did not complete: {}", session_id, e))
        })?
    }
}

impl Drop for FlowNode {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

async fn dispatch(services: Arc<NodeServices>, sessions: Arc<SessionTable>, mut inbox: Inbox) {
    while let Some(bytes) = inbox.recv().await {
        let envelope = match Envelope::decode(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(node = %services.identity.name, error = %e, "Dropping undecodable envelope");
                continue;
            }
        };
        if envelope.recipient != services.identity.name {
            warn!(
                node = %services.identity.name,
                recipient = %envelope.recipient,
                "Dropping misaddressed envelope"
            );
            continue;
        }

        let session_id = envelope.session_id;
        let envelope = match sessions.deliver(envelope) {
            Delivery::Delivered => continue,
            Delivery::Closed => {
                debug!(session_id = %session_id, "Session already finished, dropping envelope");
                continue;
            }
            Delivery::NoSession(envelope) => envelope,
        };

        if !matches!(envelope.message, FlowMessage::Proposal { .. }) {
            warn!(
                session_id = %session_id,
                kind = envelope.message.kind(),
                from = %envelope.sender.name,
                "No open session for envelope"
            );
            continue;
        }
        match sessions.open(session_id) {
            Some((guard, inbound)) => {
                let responder = Responder::new(Arc::clone(&services), guard, inbound);
                tokio::spawn(responder.run(envelope));
            }
            None => warn!(session_id = %session_id, "Session opened concurrently, dropping proposal"),
        }
    }
    debug!(node = %services.identity.name, "Inbox closed, dispatcher stopping");
}
