//! Case-insensitive `owner/name` repository identifiers.

use std::fmt;
use std::hash::{Hash, Hasher};

use hubsync_core::RepoIdError;

/// Repository identifier.
///
/// Keeps the spelling it was created with for display, but compares, hashes
/// and orders by the lower-cased form so `Foo/Bar` and `foo/bar` name the
/// same repository.
#[derive(Debug, Clone)]
pub struct RepoId {
    display: String,
    key: String,
}

impl RepoId {
    /// Parses and validates an `owner/name` id.
    ///
    /// Surrounding whitespace is trimmed; embedded whitespace, a missing or
    /// repeated `/`, and empty segments are rejected.
    pub fn parse(raw: &str) -> Result<Self, RepoIdError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RepoIdError::Empty);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(RepoIdError::Whitespace(trimmed.to_string()));
        }
        let mut parts = trimmed.split('/');
        let (Some(owner), Some(name), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(RepoIdError::WrongSeparatorCount(trimmed.to_string()));
        };
        if owner.is_empty() || name.is_empty() {
            return Err(RepoIdError::EmptySegment(trimmed.to_string()));
        }

        Ok(Self {
            display: trimmed.to_string(),
            key: trimmed.to_lowercase(),
        })
    }

    pub fn is_well_formed(raw: &str) -> bool {
        Self::parse(raw).is_ok()
    }

    /// The id as originally spelled.
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// The canonical lower-cased lookup key.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn owner(&self) -> &str {
        self.display.split('/').next().unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.display.split('/').nth(1).unwrap_or_default()
    }
}

impl PartialEq for RepoId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for RepoId {}

impl Hash for RepoId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for RepoId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RepoId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl std::str::FromStr for RepoId {
    type Err = RepoIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
