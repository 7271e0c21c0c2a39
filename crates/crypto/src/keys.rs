//! Public keys and the signatures made with them.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::signing::SigningError;

/// An Ed25519 public key (32 bytes). Parties are identified on the wire by
/// the key that owns them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Stable short identifier: first 16 bytes of the BLAKE3 digest, hex encoded.
    pub fn key_id(&self) -> String {
        let hash = blake3::hash(&self.0);
        hex::encode(&hash.as_bytes()[..16])
    }

    /// Verifies `signature` over `message` with this key.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), SigningError> {
        if signature.len() != 64 {
            return Err(SigningError::InvalidSignature {
                reason: format!("Expected 64 bytes, got {}", signature.len()),
            });
        }

        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|e| SigningError::InvalidKey {
                reason: e.to_string(),
            })?;

        let sig_bytes: [u8; 64] =
            signature
                .try_into()
                .map_err(|_| SigningError::InvalidSignature {
                    reason: "Failed to convert signature".to_string(),
                })?;
        let sig = Signature::from_bytes(&sig_bytes);

        verifying_key
            .verify(message, &sig)
            .map_err(|e| SigningError::VerificationFailed {
                key_id: self.key_id(),
                reason: e.to_string(),
            })
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.key_id())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("public key must be 32 bytes"))?;
        Ok(Self(array))
    }
}

/// A signature together with the key that made it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitalSignature {
    /// Key that produced the signature
    pub by: PublicKey,
    /// Ed25519 signature (64 bytes)
    #[serde(with = "hex_bytes")]
    pub bytes: Vec<u8>,
}

impl DigitalSignature {
    pub fn new(by: PublicKey, bytes: Vec<u8>) -> Self {
        Self { by, bytes }
    }

    /// Verifies this signature over `message` with its own key.
    pub fn verify(&self, message: &[u8]) -> Result<(), SigningError> {
        self.by.verify(message, &self.bytes)
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
