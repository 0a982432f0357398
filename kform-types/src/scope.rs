//! Scope paths used to address nodes in the state tree.
//!
//! A scope path is an ordered list of segments (e.g. `app`, `form0`, `job`).
//! Comparison and prefix matching are structural: a segment is never split or
//! joined, so `["a.b"]` and `["a", "b"]` are different paths.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Structural address of a node in the state tree.
///
/// Ordering is lexicographic over segments, which puts every parent before
/// its descendants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopePath(Vec<String>);

impl ScopePath {
    /// The empty path, addressing the whole state tree.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Builds a path from its segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Returns the segments of this path.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the root path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Last segment, if any.
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Returns a new path with `segment` appended.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Returns the parent path, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.0.split_last()?;
        Some(Self(rest.to_vec()))
    }

    /// Concatenates two paths.
    #[must_use]
    pub fn join(&self, other: &ScopePath) -> Self {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        Self(segments)
    }

    /// True when `prefix` is equal to, or a leading part of, this path.
    pub fn starts_with(&self, prefix: &ScopePath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Removes `prefix` from the front of this path.
    ///
    /// Returns `None` when `prefix` does not match.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &ScopePath) -> Option<Self> {
        self.0.strip_prefix(prefix.0.as_slice()).map(|rest| Self(rest.to_vec()))
    }
}

impl fmt::Display for ScopePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for ScopePath {
    type Err = crate::Error;

    /// Parses the dotted form, e.g. `"app.form0"`. The empty string is the root.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        let segments: Vec<String> = s.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(crate::Error::InvalidScope(s.to_string()));
        }
        Ok(Self(segments))
    }
}

impl From<Vec<String>> for ScopePath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl From<&[&str]> for ScopePath {
    fn from(segments: &[&str]) -> Self {
        Self::new(segments.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for ScopePath {
    fn from(segments: [&str; N]) -> Self {
        Self::new(segments)
    }
}
