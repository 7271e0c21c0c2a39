//! Single-process deployment: one notary and any number of distributor
//! nodes sharing an [`InMemoryNetwork`] and a [`NetworkDirectory`].

use noscalp_core::FlowConfig;
use noscalp_crypto::PartySigner;
use noscalp_identity::{LegalName, NetworkDirectory};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::error::FlowResult;
use crate::node::{FlowNode, NodeServices};
use crate::notary::{FinalityService, InMemoryNotary};
use crate::transport::InMemoryNetwork;

pub struct LocalNetwork {
    network: Arc<InMemoryNetwork>,
    directory: Arc<NetworkDirectory>,
    notary: Arc<InMemoryNotary>,
    config: FlowConfig,
    nodes: BTreeMap<LegalName, Arc<FlowNode>>,
}

impl LocalNetwork {
    pub fn new(notary_name: LegalName, config: FlowConfig) -> FlowResult<Self> {
        let directory = Arc::new(NetworkDirectory::new());
        let notary = Arc::new(InMemoryNotary::new(notary_name));
        directory.register_notary(notary.identity().clone())?;
        Ok(Self {
            network: Arc::new(InMemoryNetwork::new()),
            directory,
            notary,
            config,
            nodes: BTreeMap::new(),
        })
    }

    /// Starts a node for `name` with a fresh key. Must be called inside a
    /// tokio runtime.
    pub fn add_node(&mut self, name: LegalName) -> FlowResult<Arc<FlowNode>> {
        self.add_node_with(name, |services| services)
    }

    /// Like [`add_node`](Self::add_node), letting `customize` adjust the
    /// node's services (observer, transport, timeouts) before it starts.
    pub fn add_node_with<F>(&mut self, name: LegalName, customize: F) -> FlowResult<Arc<FlowNode>>
    where
        F: FnOnce(NodeServices) -> NodeServices,
    {
        let signer = Arc::new(PartySigner::new());
        let services = NodeServices::new(
            name.clone(),
            signer,
            self.directory.clone(),
            self.network.clone(),
            self.notary.clone(),
        )
        .with_config(self.config.clone());
        let services = customize(services);

        self.directory.register_party(services.identity.clone())?;
        let inbox = self.network.register(name.clone());
        let node = Arc::new(FlowNode::start(services, inbox));
        info!(node = %name, nodes = self.nodes.len() + 1, "Node joined local network");
        self.nodes.insert(name, Arc::clone(&node));
        Ok(node)
    }

    pub fn node(&self, name: &LegalName) -> Option<Arc<FlowNode>> {
        self.nodes.get(name).cloned()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Arc<FlowNode>> {
        self.nodes.values()
    }

    pub fn network(&self) -> &Arc<InMemoryNetwork> {
        &self.network
    }

    pub fn directory(&self) -> &Arc<NetworkDirectory> {
        &self.directory
    }

    pub fn notary(&self) -> &Arc<InMemoryNotary> {
        &self.notary
    }
}
