//! Voter identity.

use super::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Normalized voter identity.
///
/// The surrounding system identifies voters by email address and compares
/// them case-insensitively, so the value is trimmed and lowercased once at
/// construction and compared verbatim afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VoterId(String);

impl VoterId {
    /// Normalizes and validates a raw identity.
    pub fn parse(raw: &str) -> Result<Self, ModelError> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(ModelError::EmptyVoterId);
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for VoterId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for VoterId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VoterId> for String {
    fn from(value: VoterId) -> Self {
        value.0
    }
}
