//! End-to-end tests for the NoScalp agreement protocol
//!
//! This test suite validates:
//! - The four reference distribution scenarios across two live nodes
//! - That local validation failures never reach the network
//! - Responder-side rejection of tampered or misaddressed proposals
//! - Concurrent protocol runs between the same pair of nodes

pub mod test_utils;

#[cfg(test)]
mod distribution_flow_tests;

#[cfg(test)]
mod responder_rejection_tests;
