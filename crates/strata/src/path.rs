//! Data paths: ordered name segments addressing a node in the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::store::PathError;

/// An ordered, immutable list of name segments.
///
/// Paths are resolved left-to-right from the store roots. The textual
/// form joins segments with `/`; a leading `/` is accepted and ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataPath {
    segments: Vec<String>,
}

impl DataPath {
    /// Build a path from name segments.
    ///
    /// Returns `PathError::EmptyPath` if there are no segments or any
    /// segment is empty.
    pub fn new<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
            return Err(PathError::EmptyPath);
        }
        Ok(Self { segments })
    }

    /// Parse a `/`-separated path string.
    pub fn parse(s: &str) -> Result<Self, PathError> {
        let trimmed = s.strip_prefix('/').unwrap_or(s);
        if trimmed.is_empty() {
            return Err(PathError::EmptyPath);
        }
        Self::new(trimmed.split('/'))
    }

    /// The name segments, in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The final segment (the addressed node's name).
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// All segments except the last, or `None` for a single-segment path.
    pub fn parent(&self) -> Option<DataPath> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(DataPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Extend this path with one more segment.
    pub fn child(&self, name: impl Into<String>) -> DataPath {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        DataPath { segments }
    }

    /// Replace the final segment.
    pub fn renamed(&self, name: impl Into<String>) -> DataPath {
        let mut segments = self.segments.clone();
        if let Some(last) = segments.last_mut() {
            *last = name.into();
        }
        DataPath { segments }
    }

    /// True if `self` equals `prefix` or lies beneath it.
    pub fn starts_with(&self, prefix: &DataPath) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }
}

impl fmt::Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl FromStr for DataPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DataPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DataPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        DataPath::parse(&s).map_err(serde::de::Error::custom)
    }
}
