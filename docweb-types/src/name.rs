//! Canonical names — the primary key of the entry graph.
//!
//! A canonical name is a flat string identifier over one of two
//! namespaces: code-like (`pkg.module.Class.method`, separated by `.`)
//! or path-like (`doc/source/index.rst`, separated by `/`). The
//! separator is a property of the name itself: `/` wins whenever it is
//! present.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The unique, stable identifier for a documentation entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalName(String);

impl CanonicalName {
    /// Creates a canonical name from any string-like value.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the namespace separator for this name: `/` if the name
    /// contains a slash, `.` otherwise.
    #[must_use]
    pub fn separator(&self) -> char {
        if self.0.contains('/') {
            '/'
        } else {
            '.'
        }
    }

    /// Splits the name into its path components.
    #[must_use]
    pub fn components(&self) -> Vec<&str> {
        if self.0.is_empty() {
            return Vec::new();
        }
        self.0.split(self.separator()).collect()
    }

    /// Returns the parent name, or `None` for single-component names.
    #[must_use]
    pub fn parent(&self) -> Option<CanonicalName> {
        let sep = self.separator();
        self.0
            .rfind(sep)
            .map(|idx| CanonicalName::new(&self.0[..idx]))
    }

    /// Returns the last path component.
    #[must_use]
    pub fn leaf(&self) -> &str {
        let sep = self.separator();
        self.0.rsplit(sep).next().unwrap_or(&self.0)
    }

    /// Joins a child component onto this name using its separator.
    #[must_use]
    pub fn join(&self, child: &str) -> CanonicalName {
        if self.0.is_empty() {
            return CanonicalName::new(child);
        }
        CanonicalName::new(format!("{}{}{}", self.0, self.separator(), child))
    }

    /// Returns true if `other` lies strictly below this name in the
    /// hierarchy (prefix match on a separator boundary).
    #[must_use]
    pub fn is_ancestor_of(&self, other: &CanonicalName) -> bool {
        let sep = self.separator();
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0[self.0.len()..].starts_with(sep)
    }

    /// Joins raw components with the given separator. Used as the
    /// fallback result when alias resolution hits a cycle.
    #[must_use]
    pub fn from_components(components: &[&str], separator: char) -> CanonicalName {
        let mut buf = String::new();
        for (i, c) in components.iter().enumerate() {
            if i > 0 {
                buf.push(separator);
            }
            buf.push_str(c);
        }
        CanonicalName(buf)
    }
}

impl fmt::Display for CanonicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CanonicalName {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<&str> for CanonicalName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CanonicalName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for CanonicalName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
