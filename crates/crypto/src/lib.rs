//! Cryptographic primitives for the NoScalp agreement protocol.
//!
//! Every party on the network owns one Ed25519 key. Parties sign the
//! identifier of a proposed transaction, and the identifier itself is a
//! BLAKE3 digest of the transaction's canonical encoding.
//!
//! # Supported Algorithms
//!
//! - **Signatures**: Ed25519
//! - **Hashing**: BLAKE3 (transaction ids and public key ids)
//!
//! # Security Principles
//!
//! - Private keys never leave a [`PartySigner`]
//! - All signatures must be verified before trust
//! - Secret key material is zeroized after use

pub mod hash;
pub mod keys;
pub mod signing;


pub use hash::SecureHash;
pub use keys::{DigitalSignature, PublicKey};
pub use signing::{PartySigner, SigningError, SigningMetrics, SigningMetricsSnapshot};
