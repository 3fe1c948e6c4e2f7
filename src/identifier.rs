//! Platform-qualified player names (`name#tag`)
//!
//! Identifiers are normalized once, at the edge where they enter the
//! program (sheet cells, store rows, list output). After that, plain string
//! equality is a case-insensitive comparison.

use serde::Serialize;
use std::fmt;

/// Separator between the display name and the numeric tag
pub const TAG_SEPARATOR: char = '#';

/// Case folding shared by every comparison of player names
pub fn fold(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// A normalized `name#tag` identifier (trimmed, lowercased)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Normalize a raw value into an identifier.
    ///
    /// Returns `None` for blank values and values without a `#`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.contains(TAG_SEPARATOR) {
            return None;
        }
        Some(Self(fold(trimmed)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Parse every value, keeping order and dropping the ones that are not identifiers
pub fn parse_all<'a, I>(values: I) -> Vec<Identifier>
where
    I: IntoIterator<Item = &'a str>,
{
    values.into_iter().filter_map(Identifier::parse).collect()
}
