//! Identity primitives for the NoScalp network.
//!
//! Every distributor and notary is a [`Party`]: an X.500-style [`LegalName`]
//! bound to the Ed25519 key that signs on its behalf. The
//! [`NetworkDirectory`] maps legal names to parties, playing the role of the
//! network map.

pub mod directory;
pub mod error;
pub mod identity;

pub use directory::{IdentityResolver, NetworkDirectory};
pub use error::{IdentityError, IdentityResult};
pub use identity::{LegalName, Party};
