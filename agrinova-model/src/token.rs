use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::ModelError;

/// Synthetic scope attached to validated offline tokens.
pub const OFFLINE_ACCESS_SCOPE: &str = "offline_access";

/// The three credential kinds the token service issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TokenKind {
    Access,
    Refresh,
    Offline,
}

impl TokenKind {
    /// Value of the `type` claim inside signed tokens.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
            TokenKind::Offline => "offline",
        }
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminator persisted in the `token_type` column of a token record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenRecordType {
    /// An access + refresh family.
    Jwt,
    /// A standalone opaque offline credential.
    Offline,
}

impl TokenRecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenRecordType::Jwt => "JWT",
            TokenRecordType::Offline => "OFFLINE",
        }
    }
}

impl Display for TokenRecordType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenRecordType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "JWT" => Ok(TokenRecordType::Jwt),
            "OFFLINE" => Ok(TokenRecordType::Offline),
            other => Err(ModelError::UnknownTokenType(other.to_string())),
        }
    }
}
