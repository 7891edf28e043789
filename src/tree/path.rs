// SPDX-License-Identifier: AGPL-3.0-or-later
//! Dotted field paths

use std::fmt;

/// Separator between path segments
const SEPARATOR: char = '.';

/// An ordered sequence of map keys locating a value inside a document tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<String>);

impl Path {
    /// Parse a dotted path such as `.spec.groupId` or `metadata.name`.
    ///
    /// A leading separator is allowed and dropped. Every other segment is kept
    /// verbatim, so `a..b` has an empty middle segment and `""` parses to a
    /// single empty segment.
    pub fn parse(path: &str) -> Self {
        let mut segments: Vec<String> = path.split(SEPARATOR).map(str::to_string).collect();
        if segments.len() > 1 && segments[0].is_empty() {
            segments.remove(0);
        }
        Self(segments)
    }

    /// Path with the segments of `other` appended
    pub fn join(&self, other: &Path) -> Self {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        Self(segments)
    }

    /// Path with one more segment appended
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Split into the parent segments and the final key
    pub fn split_last(&self) -> Option<(&String, &[String])> {
        self.0.split_last()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0.join("."))
    }
}

impl<const N: usize> From<[&str; N]> for Path {
    fn from(segments: [&str; N]) -> Self {
        Self(segments.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<String>> for Path {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rooted_path() {
        assert_eq!(Path::parse(".licenseKey"), Path::from(["licenseKey"]));
        assert_eq!(Path::parse(".a.b.c"), Path::from(["a", "b", "c"]));
    }

    #[test]
    fn test_parse_relative_path() {
        assert_eq!(Path::parse("metadata.name"), Path::from(["metadata", "name"]));
        assert_eq!(Path::parse("credentialsSecret"), Path::from(["credentialsSecret"]));
    }

    #[test]
    fn test_parse_keeps_inner_empty_segments() {
        assert_eq!(Path::parse("a..b"), Path::from(["a", "", "b"]));
        assert_eq!(Path::parse(".a."), Path::from(["a", ""]));
    }

    #[test]
    fn test_parse_empty_string() {
        assert_eq!(Path::parse(""), Path::from([""]));
        assert_eq!(Path::parse("."), Path::from([""]));
    }

    #[test]
    fn test_join_and_display() {
        let base = Path::from(["spec", "v20231115"]);
        let joined = base.join(&Path::parse(".groupId")).child("x");
        assert_eq!(joined.to_string(), "spec.v20231115.groupId.x");
        assert_eq!(base, Path::from(["spec", "v20231115"]));
    }
}
