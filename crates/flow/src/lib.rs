//! Two-party agreement protocol for NoScalp ticket distributions.
//!
//! An initiating distributor proposes a [`DistributionState`] to a
//! counterparty, both evaluate the distribution contract independently, the
//! counterparty counter-signs, and the notary witnesses the result. Each run
//! is a tokio task with its own session; a node's dispatcher routes incoming
//! envelopes to the run that owns them and starts a responder for every new
//! proposal.
//!
//! Network delivery, the directory and finality are reached through the
//! [`Transport`], [`IdentityResolver`](noscalp_identity::IdentityResolver) and
//! [`FinalityService`] seams, with in-memory implementations for running a
//! whole network in one process.
//!
//! [`DistributionState`]: noscalp_domain::DistributionState

pub mod error;
pub mod initiator;
pub mod messages;
pub mod network;
pub mod node;
pub mod notary;
pub mod progress;
pub mod responder;
pub mod transport;
pub mod vault;

pub use error::{FinalizationError, FlowError, FlowResult, TransportError};
pub use initiator::DistributionRequest;
pub use messages::{Envelope, FlowMessage};
pub use network::LocalNetwork;
pub use node::{FlowNode, NodeServices};
pub use notary::{FinalityService, InMemoryNotary};
pub use progress::{FlowState, ProgressObserver, ProgressTracker};
pub use transport::{InMemoryNetwork, Inbox, Transport};
pub use vault::Vault;
