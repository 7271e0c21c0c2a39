use noscalp_core::Config;
use noscalp_flow::{FlowNode, LocalNetwork};
use noscalp_identity::LegalName;
use std::sync::Arc;

/// Shared handler state: the node this service acts for, plus the rest of the
/// in-process network it talks to.
pub struct AppState {
    pub config: Config,
    pub node: Arc<FlowNode>,
    pub network: LocalNetwork,
}

impl AppState {
    /// Starts the notary, the local node and one auto-responding node per
    /// configured peer.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let me = LegalName::parse(&config.node.legal_name)?;
        let notary = LegalName::parse(&config.network.notary_name)?;

        let mut network = LocalNetwork::new(notary, config.flow.clone())?;
        let node = network.add_node(me)?;
        for peer in &config.network.peers {
            network.add_node(LegalName::parse(peer)?)?;
        }

        Ok(AppState {
            config,
            node,
            network,
        })
    }
}
