//! Legal names and parties.

use noscalp_crypto::PublicKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{IdentityError, IdentityResult};

/// X.500-style distinguished name of a network participant,
/// e.g. `O=PartyA, L=London, C=GB`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LegalName {
    organisation: String,
    locality: String,
    country: String,
}

impl LegalName {
    pub fn new(
        organisation: impl Into<String>,
        locality: impl Into<String>,
        country: impl Into<String>,
    ) -> IdentityResult<Self> {
        let name = Self {
            organisation: organisation.into().trim().to_string(),
            locality: locality.into().trim().to_string(),
            country: country.into().trim().to_string(),
        };
        name.validate()?;
        Ok(name)
    }

    /// Parses `O=<organisation>, L=<locality>, C=<country>`. Attribute order
    /// is free and whitespace around separators is ignored.
    pub fn parse(s: &str) -> IdentityResult<Self> {
        let invalid = |reason: String| IdentityError::InvalidName {
            name: s.to_string(),
            reason,
        };

        let mut organisation = None;
        let mut locality = None;
        let mut country = None;

        for attribute in s.split(',') {
            let (key, value) = attribute
                .split_once('=')
                .ok_or_else(|| invalid(format!("attribute '{}' has no value", attribute.trim())))?;
            let slot = match key.trim() {
                "O" => &mut organisation,
                "L" => &mut locality,
                "C" => &mut country,
                other => return Err(invalid(format!("unsupported attribute '{}'", other))),
            };
            if slot.is_some() {
                return Err(invalid(format!("duplicate attribute '{}'", key.trim())));
            }
            *slot = Some(value.trim().to_string());
        }

        let organisation = organisation.ok_or_else(|| invalid("missing O".to_string()))?;
        let locality = locality.ok_or_else(|| invalid("missing L".to_string()))?;
        let country = country.ok_or_else(|| invalid("missing C".to_string()))?;

        let name = Self {
            organisation,
            locality,
            country,
        };
        name.validate().map_err(|e| match e {
            IdentityError::InvalidName { reason, .. } => invalid(reason),
            other => other,
        })?;
        Ok(name)
    }

    fn validate(&self) -> IdentityResult<()> {
        let invalid = |reason: &str| IdentityError::InvalidName {
            name: self.to_string(),
            reason: reason.to_string(),
        };
        if self.organisation.is_empty() {
            return Err(invalid("organisation must not be blank"));
        }
        if self.locality.is_empty() {
            return Err(invalid("locality must not be blank"));
        }
        if self.country.len() != 2 || !self.country.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(invalid("country must be a two-letter upper-case code"));
        }
        Ok(())
    }

    pub fn organisation(&self) -> &str {
        &self.organisation
    }

    pub fn locality(&self) -> &str {
        &self.locality
    }

    pub fn country(&self) -> &str {
        &self.country
    }
}

impl fmt::Display for LegalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "O={}, L={}, C={}",
            self.organisation, self.locality, self.country
        )
    }
}

impl FromStr for LegalName {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for LegalName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LegalName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A network participant: a legal name and the key that signs for it.
///
/// Two parties are equal only when both the name and the owning key match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Party {
    pub name: LegalName,
    pub owning_key: PublicKey,
}

impl Party {
    pub fn new(name: LegalName, owning_key: PublicKey) -> Self {
        Self { name, owning_key }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
