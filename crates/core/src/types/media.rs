//! Media resource locators

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

const DISC_SCHEMES: [&str; 2] = ["dvd", "vcd"];
const NETWORK_SCHEMES: [&str; 9] = [
    "http", "https", "mms", "mmsh", "rtsp", "rtmp", "ftp", "sftp", "smb",
];

/// Media resource locator, the URI-like identifier of what a session plays
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mrl(String);

impl Mrl {
    /// Parses an MRL, rejecting empty or whitespace-only input
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(CoreError::InvalidMrl {
                mrl: value,
                reason: "location is empty".to_string(),
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the lower-cased scheme, if the MRL has one
    ///
    /// Single-letter prefixes are treated as drive letters, not schemes.
    pub fn scheme(&self) -> Option<String> {
        let (scheme, _) = self.0.split_once(':')?;
        if scheme.len() < 2 {
            return None;
        }
        let mut chars = scheme.chars();
        let first = chars.next()?;
        if !first.is_ascii_alphabetic()
            || !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            return None;
        }
        Some(scheme.to_ascii_lowercase())
    }

    /// Returns true for optical disc locations (`dvd:`, `vcd:`)
    pub fn is_disc(&self) -> bool {
        self.scheme()
            .is_some_and(|s| DISC_SCHEMES.contains(&s.as_str()))
    }

    /// Returns true for locations fetched over the network
    pub fn is_network(&self) -> bool {
        self.scheme()
            .is_some_and(|s| NETWORK_SCHEMES.contains(&s.as_str()))
    }

    /// Returns true for plain files (`file:` or no scheme at all)
    pub fn is_local(&self) -> bool {
        match self.scheme() {
            None => true,
            Some(s) => s == "file",
        }
    }
}

impl fmt::Display for Mrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Mrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Mrl {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}
