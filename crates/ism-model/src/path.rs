//! Dotted field paths.
//!
//! A [`FieldPath`] addresses a value inside a nested JSON structure, e.g.
//! `settings.index.number_of_shards` or `dataSource.0.channels`. Numeric
//! segments address array indices when the container is an array and plain
//! keys when it is an object; the path itself does not decide which.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ModelError, Result};

/// A non-empty sequence of non-empty path segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dot-delimited path.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(ModelError::invalid_path(raw, "path is empty"));
        }
        Self::from_segments(raw.split('.'))
            .map_err(|_| ModelError::invalid_path(raw, "path contains an empty segment"))
    }

    /// Build a path from individual segments.
    ///
    /// Segments may not be empty and may not contain `.`, since the joined
    /// form would no longer parse back to the same path.
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(ModelError::invalid_path("", "path is empty"));
        }
        let joined = segments.join(".");
        for segment in &segments {
            if segment.is_empty() {
                return Err(ModelError::invalid_path(
                    joined,
                    "path contains an empty segment",
                ));
            }
            if segment.contains('.') {
                return Err(ModelError::invalid_path(joined, "segment contains '.'"));
            }
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment of the path.
    pub fn leaf(&self) -> &str {
        // Construction guarantees at least one segment.
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Path of the containing value, `None` for top-level paths.
    pub fn parent(&self) -> Option<FieldPath> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Extend the path with one more segment.
    pub fn child(&self, segment: impl Into<String>) -> Result<FieldPath> {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self::from_segments(segments)
    }

    /// True when `self` is a strict prefix of `other`.
    pub fn is_ancestor_of(&self, other: &FieldPath) -> bool {
        other.segments.len() > self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// Dot-joined representation, used as a map key.
    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }
}

/// Interpret a segment as an array index.
///
/// Only canonical decimal numbers qualify: `"0"`, `"12"`, but not `"01"`,
/// `"+1"` or `"-1"`.
pub fn segment_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if segment.len() > 1 && segment.starts_with('0') {
        return None;
    }
    segment.parse().ok()
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted())
    }
}

impl FromStr for FieldPath {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for FieldPath {
    type Error = ModelError;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.dotted())
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
