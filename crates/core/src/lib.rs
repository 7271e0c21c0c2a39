//! Core functionality for the NoScalp ticket-distribution network.
//!
//! This crate provides the configuration, logging and error types shared by
//! every other NoScalp crate and by the node service.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{Config, FlowConfig, LoggingConfig, NetworkConfig, NodeConfig};
pub use error::{CoreError, Error, Result};
