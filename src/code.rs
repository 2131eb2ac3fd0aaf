//! Namespaced `domain:path` identifiers.
//!
//! Every mode, group and object definition is addressed by an [`AssetCode`]. Codes are
//! lower-cased on construction so `Game:Scythe-Trim` and `game:scythe-trim` compare equal,
//! and a bare `path` picks up a default domain.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ToolModeError;

/// Domain used when a code is written without one.
pub const DEFAULT_DOMAIN: &str = "game";

/// Immutable `domain:path` identifier. Serializes as its string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetCode {
    domain: String,
    path: String,
}

/// Code of a registered tool mode.
pub type ModeCode = AssetCode;
/// Code of a tool mode group.
pub type GroupCode = AssetCode;
/// Code of an object definition (item or block type).
pub type ObjectCode = AssetCode;

impl AssetCode {
    pub fn new(domain: &str, path: &str) -> Result<Self, ToolModeError> {
        let domain = domain.trim().to_ascii_lowercase();
        let path = path.trim().to_ascii_lowercase();
        if domain.is_empty() || path.is_empty() || domain.contains(':') || path.contains(':') {
            return Err(ToolModeError::InvalidCode(format!("{}:{}", domain, path)));
        }
        Ok(Self { domain, path })
    }

    /// Parse `domain:path`, falling back to [`DEFAULT_DOMAIN`] for a bare path.
    pub fn parse(s: &str) -> Result<Self, ToolModeError> {
        Self::parse_with_domain(s, DEFAULT_DOMAIN)
    }

    /// Parse `domain:path`, falling back to `default_domain` for a bare path.
    pub fn parse_with_domain(s: &str, default_domain: &str) -> Result<Self, ToolModeError> {
        match s.split_once(':') {
            Some((domain, path)) => Self::new(domain, path),
            None => Self::new(default_domain, s),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for AssetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.domain, self.path)
    }
}

impl FromStr for AssetCode {
    type Err = ToolModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AssetCode {
    type Error = ToolModeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for AssetCode {
    type Error = ToolModeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<AssetCode> for String {
    fn from(code: AssetCode) -> Self {
        code.to_string()
    }
}
