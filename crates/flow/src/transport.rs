//! Message delivery between nodes.
//!
//! [`InMemoryNetwork`] routes encoded envelopes by recipient legal name over
//! unbounded channels, so a send never waits on the receiver and the route
//! table lock is never held across an await.

use async_trait::async_trait;
use noscalp_identity::LegalName;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::messages::Envelope;

/// Encoded envelopes addressed to one node.
pub type Inbox = mpsc::UnboundedReceiver<Vec<u8>>;

/// Delivers envelopes to their recipients.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, envelope: Envelope) -> Result<(), TransportError>;
}

/// In-process network shared by every node of a demo or test deployment.
#[derive(Debug, Default)]
pub struct InMemoryNetwork {
    routes: RwLock<HashMap<LegalName, mpsc::UnboundedSender<Vec<u8>>>>,
}

impl InMemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `name` to the network, replacing any earlier registration.
    pub fn register(&self, name: LegalName) -> Inbox {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        if routes.insert(name.clone(), tx).is_some() {
            warn!(node = %name, "Replacing existing network registration");
        }
        rx
    }

    /// Detaches `name`; later sends to it fail with [`TransportError::NoRoute`].
    pub fn deregister(&self, name: &LegalName) -> bool {
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }

    pub fn is_registered(&self, name: &LegalName) -> bool {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

#[async_trait]
impl Transport for InMemoryNetwork {
    async fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        let bytes = envelope.encode()?;
        let route = self
            .routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&envelope.recipient)
            .cloned()
            .ok_or_else(|| TransportError::NoRoute(envelope.recipient.to_string()))?;

        debug!(
            session_id = %envelope.session_id,
            from = %envelope.sender.name,
            to = %envelope.recipient,
            kind = envelope.message.kind(),
            "Delivering envelope"
        );
        route
            .send(bytes)
            .map_err(|_| TransportError::Closed(envelope.recipient.to_string()))
    }
}
