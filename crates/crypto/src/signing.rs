//! Party signing service.
//!
//! A [`PartySigner`] holds the Ed25519 private key of one distributor. It is
//! shared between every protocol run of a node, so signing takes `&self` and
//! the metrics counters are atomic.
//!
//! # Security Model
//!
//! - Private keys never leave this service
//! - Signatures are deterministic for the same input
//! - Key bytes handed to [`PartySigner::from_key`] are zeroized

use ed25519_dalek::{Signer, SigningKey};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use zeroize::Zeroize;

use crate::keys::{DigitalSignature, PublicKey};

/// Errors that can occur during signing and verification.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("Invalid key: {reason}")]
    InvalidKey { reason: String },

    #[error("Invalid signature: {reason}")]
    InvalidSignature { reason: String },

    #[error("Signature verification failed for key {key_id}: {reason}")]
    VerificationFailed { key_id: String, reason: String },

    #[error("Invalid encoding: {reason}")]
    InvalidEncoding { reason: String },
}

/// Metrics for observability.
#[derive(Debug, Default)]
pub struct SigningMetrics {
    signatures_total: AtomicU64,
}

/// Point-in-time copy of [`SigningMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningMetricsSnapshot {
    pub signatures_total: u64,
}

impl SigningMetrics {
    pub fn snapshot(&self) -> SigningMetricsSnapshot {
        SigningMetricsSnapshot {
            signatures_total: self.signatures_total.load(Ordering::Relaxed),
        }
    }
}

/// Holder of a party's Ed25519 signing key.
pub struct PartySigner {
    signing_key: SigningKey,
    public_key: PublicKey,
    metrics: SigningMetrics,
}

impl PartySigner {
    /// Creates a signer with a freshly generated key.
    pub fn new() -> Self {
        use rand::RngCore;
        let mut rng = rand::thread_rng();
        let mut secret_key_bytes = [0u8; 32];
        rng.fill_bytes(&mut secret_key_bytes);

        let signing_key = SigningKey::from_bytes(&secret_key_bytes);
        secret_key_bytes.zeroize();

        Self::with_signing_key(signing_key)
    }

    /// Creates a signer from an existing 32-byte private key.
    ///
    /// # Security
    /// The intermediate copy of the key bytes is zeroized.
    pub fn from_key(key_bytes: &[u8]) -> Result<Self, SigningError> {
        if key_bytes.len() != 32 {
            return Err(SigningError::InvalidKey {
                reason: format!("Invalid key length: {} (expected 32)", key_bytes.len()),
            });
        }

        let mut key_array = [0u8; 32];
        key_array.copy_from_slice(key_bytes);
        let signing_key = SigningKey::from_bytes(&key_array);
        key_array.zeroize();

        Ok(Self::with_signing_key(signing_key))
    }

    fn with_signing_key(signing_key: SigningKey) -> Self {
        let public_key = PublicKey::from_bytes(signing_key.verifying_key().to_bytes());
        Self {
            signing_key,
            public_key,
            metrics: SigningMetrics::default(),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    pub fn public_key_id(&self) -> String {
        self.public_key.key_id()
    }

    /// Signs `message` and returns the signature tagged with this signer's key.
    ///
    /// # Examples
    /// ```
    /// use noscalp_crypto::PartySigner;
    ///
    /// let signer = PartySigner::new();
    /// let signature = signer.sign(b"tx-id");
    /// assert_eq!(signature.bytes.len(), 64);
    /// assert!(signature.verify(b"tx-id").is_ok());
    /// ```
    pub fn sign(&self, message: &[u8]) -> DigitalSignature {
        let signature = self.signing_key.sign(message);
        self.metrics.signatures_total.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(key_id = %self.public_key.key_id(), "message signed");
        DigitalSignature::new(self.public_key, signature.to_bytes().to_vec())
    }

    pub fn metrics(&self) -> SigningMetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl Default for PartySigner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PartySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartySigner")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}
