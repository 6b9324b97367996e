use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Public account identifier: 128 random bits, shown only in the canonical
/// 36-character lowercase hyphenated form. This is the one id that crosses
/// interface boundaries; the sequential storage key never leaves the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ExternalId(Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("not a canonical external id")]
pub struct ParseExternalIdError;

impl ExternalId {
    pub const ENCODED_LEN: usize = 36;

    /// Draws a fresh random identifier. No coordination, no sequencing; the
    /// UNIQUE constraint on the accounts table is the collision backstop.
    #[must_use]
    pub fn allocate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses the canonical form only. Simple, braced, URN and uppercase
    /// renditions are rejected even though the underlying parser knows them.
    pub fn parse(input: &str) -> Result<Self, ParseExternalIdError> {
        if input.len() != Self::ENCODED_LEN {
            return Err(ParseExternalIdError);
        }

        let uuid = Uuid::parse_str(input).map_err(|_| ParseExternalIdError)?;

        let mut buf = Uuid::encode_buffer();
        if uuid.as_hyphenated().encode_lower(&mut buf) != input {
            return Err(ParseExternalIdError);
        }

        Ok(Self(uuid))
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.as_hyphenated().fmt(f)
    }
}

impl<'de> Deserialize<'de> for ExternalId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
