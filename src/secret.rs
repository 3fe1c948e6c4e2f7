//! Secret handling for the Bungie API key
//!
//! The key is passed to `dclisync` on its command line, so anything that
//! renders a command line or echoes command output must go through here.
//! Identity is tracked with a truncated SHA-256 hash, never the key itself.

use sha2::{Digest, Sha256};
use std::fmt;

/// Placeholder shown wherever the key would otherwise appear
pub const REDACTED: &str = "[REDACTED]";

/// An API key whose `Debug` and `Display` never reveal the value
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value. Only for handing to the child process.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First 8 hex chars of the SHA-256 of the key, safe to log
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        let hash = hasher.finalize();
        format!("{:x}", hash)[..8].to_string()
    }

    /// Replace every occurrence of the key in `text`
    pub fn scrub(&self, text: &str) -> String {
        if self.0.is_empty() {
            return text.to_string();
        }
        text.replace(&self.0, REDACTED)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", REDACTED)
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}
