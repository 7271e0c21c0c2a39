//! Configuration management for NoScalp nodes.
//!
//! A node is configured from a TOML file:
//!
//! ```toml
//! [node]
//! legal_name = "O=PartyA, L=London, C=GB"
//! listen_addr = "127.0.0.1:10050"
//!
//! [network]
//! notary_name = "O=Notary, L=London, C=GB"
//! peers = ["O=PartyB, L=New York, C=US"]
//!
//! [flow]
//! counterparty_timeout_ms = 30000
//! finality_timeout_ms = 30000
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    pub network: NetworkConfig,
    #[serde(default)]
    pub flow: FlowConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// X.500-style legal name of the party this node acts for
    pub legal_name: String,
    /// Address the HTTP command surface binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub notary_name: String,
    /// Counterparties hosted on the same in-memory network
    #[serde(default)]
    pub peers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// How long an initiator waits for the counterparty's signature
    #[serde(default = "default_counterparty_timeout_ms")]
    pub counterparty_timeout_ms: u64,
    /// How long an initiator waits for the notary. A responder waits this
    /// plus `counterparty_timeout_ms` for the finalized transaction.
    #[serde(default = "default_finality_timeout_ms")]
    pub finality_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_listen_addr() -> String {
    "127.0.0.1:10050".to_string()
}

fn default_counterparty_timeout_ms() -> u64 {
    30_000
}

fn default_finality_timeout_ms() -> u64 {
    30_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            counterparty_timeout_ms: default_counterparty_timeout_ms(),
            finality_timeout_ms: default_finality_timeout_ms(),
        }
    }
}

impl FlowConfig {
    pub fn counterparty_timeout(&self) -> Duration {
        Duration::from_millis(self.counterparty_timeout_ms)
    }

    pub fn finality_timeout(&self) -> Duration {
        Duration::from_millis(self.finality_timeout_ms)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            node: NodeConfig {
                legal_name: "O=PartyA, L=London, C=GB".to_string(),
                listen_addr: default_listen_addr(),
            },
            network: NetworkConfig {
                notary_name: "O=Notary, L=London, C=GB".to_string(),
                peers: vec![
                    "O=PartyB, L=New York, C=US".to_string(),
                    "O=PartyC, L=Paris, C=FR".to_string(),
                ],
            },
            flow: FlowConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Checks the values serde cannot: non-empty names, a parseable bind
    /// address, distinct parties and non-zero timeouts.
    pub fn validate(&self) -> Result<()> {
        if self.node.legal_name.trim().is_empty() {
            return Err(CoreError::InvalidConfig(
                "node.legal_name must not be empty".to_string(),
            ));
        }
        if self.network.notary_name.trim().is_empty() {
            return Err(CoreError::InvalidConfig(
                "network.notary_name must not be empty".to_string(),
            ));
        }
        self.node.listen_addr.parse::<SocketAddr>().map_err(|e| {
            CoreError::InvalidConfig(format!(
                "node.listen_addr '{}' is not a socket address: {}",
                self.node.listen_addr, e
            ))
        })?;

        let mut seen = std::collections::HashSet::new();
        let names = std::iter::once(&self.node.legal_name)
            .chain(std::iter::once(&self.network.notary_name))
            .chain(self.network.peers.iter());
        for name in names {
            if !seen.insert(name.as_str()) {
                return Err(CoreError::InvalidConfig(format!(
                    "legal name '{}' is configured more than once",
                    name
                )));
            }
        }

        if self.flow.counterparty_timeout_ms == 0 || self.flow.finality_timeout_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "flow timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
