use std::fmt;
use std::str::FromStr;

use crate::error::ContentIdError;

/// Maximum length of a content identifier in bytes.
pub const MAX_CONTENT_ID_LEN: usize = 128;

/// A validated content identifier, e.g. `1-distilled` or `2-3-higher-order`.
///
/// Identifiers come straight from the request path and end up in a file name,
/// so only a conservative character set is accepted: ASCII alphanumerics,
/// `-`, `_` and `.` (never leading, never `..`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentId(String);

impl ContentId {
    /// Validate a raw path segment.
    pub fn parse(raw: &str) -> Result<Self, ContentIdError> {
        if raw.is_empty() {
            return Err(ContentIdError::Empty);
        }

        if raw.len() > MAX_CONTENT_ID_LEN {
            return Err(ContentIdError::TooLong {
                len: raw.len(),
                max: MAX_CONTENT_ID_LEN,
            });
        }

        if raw.starts_with('.')
            || raw.contains("..")
            || raw.contains('/')
            || raw.contains('\\')
            || raw.contains('\0')
        {
            return Err(ContentIdError::Traversal(raw.to_string()));
        }

        if let Some(c) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(ContentIdError::InvalidCharacter(c));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ContentId {
    type Err = ContentIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
