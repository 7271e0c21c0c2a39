//! Network directory: resolves legal names to parties.
//!
//! The directory is the only identity lookup the agreement protocol performs.
//! It is read on every protocol run and written only when nodes join, so it
//! sits behind a `std::sync::RwLock` and is never held across an await.

use noscalp_crypto::PublicKey;
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{IdentityError, IdentityResult};
use crate::identity::{LegalName, Party};

/// Lookup interface consumed by the protocol when building a proposal.
pub trait IdentityResolver: Send + Sync {
    /// Returns the party registered under `name`.
    fn well_known_party(&self, name: &LegalName) -> Option<Party>;

    /// Returns the party owning `key`.
    fn party_from_key(&self, key: &PublicKey) -> Option<Party>;

    /// All registered parties, notaries included, ordered by name.
    fn all_parties(&self) -> Vec<Party>;

    /// Parties registered as notaries, ordered by name.
    fn notary_identities(&self) -> Vec<Party>;

    /// Resolves `name`, failing with [`IdentityError::UnknownParty`].
    fn resolve(&self, name: &LegalName) -> IdentityResult<Party> {
        self.well_known_party(name)
            .ok_or_else(|| IdentityError::UnknownParty {
                name: name.to_string(),
            })
    }
}

#[derive(Debug, Default)]
struct DirectoryState {
    by_name: BTreeMap<LegalName, Party>,
    by_key: HashMap<PublicKey, LegalName>,
    notaries: BTreeMap<LegalName, Party>,
}

/// In-memory network map.
#[derive(Debug, Default)]
pub struct NetworkDirectory {
    state: RwLock<DirectoryState>,
}

impl NetworkDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, DirectoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DirectoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a distributor. Names and keys must be unique.
    pub fn register_party(&self, party: Party) -> IdentityResult<()> {
        let mut state = self.write();
        Self::insert(&mut state, party.clone())?;
        tracing::debug!(party = %party.name, key_id = %party.owning_key.key_id(), "party registered");
        Ok(())
    }

    /// Registers a notary. Notaries are also resolvable as ordinary parties.
    pub fn register_notary(&self, notary: Party) -> IdentityResult<()> {
        let mut state = self.write();
        Self::insert(&mut state, notary.clone())?;
        state.notaries.insert(notary.name.clone(), notary.clone());
        tracing::debug!(notary = %notary.name, "notary registered");
        Ok(())
    }

    fn insert(state: &mut DirectoryState, party: Party) -> IdentityResult<()> {
        if state.by_name.contains_key(&party.name) || state.by_key.contains_key(&party.owning_key)
        {
            return Err(IdentityError::IdentityExists {
                name: party.name.to_string(),
            });
        }
        state.by_key.insert(party.owning_key, party.name.clone());
        state.by_name.insert(party.name.clone(), party);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.read().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IdentityResolver for NetworkDirectory {
    fn well_known_party(&self, name: &LegalName) -> Option<Party> {
        self.read().by_name.get(name).cloned()
    }

    fn party_from_key(&self, key: &PublicKey) -> Option<Party> {
        let state = self.read();
        state
            .by_key
            .get(key)
            .and_then(|name| state.by_name.get(name))
            .cloned()
    }

    fn all_parties(&self) -> Vec<Party> {
        self.read().by_name.values().cloned().collect()
    }

    fn notary_identities(&self) -> Vec<Party> {
        self.read().notaries.values().cloned().collect()
    }
}
