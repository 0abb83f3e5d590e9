//! Paths for addressing fragments inside a manifest
//!
//! A [`FragmentPath`] starts with a rule index and descends through record keys
//! and array positions, e.g. `0.urls.1`.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// One step of a [`FragmentPath`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    /// Rule index (first segment) or array position
    Index(usize),
    /// Record key
    Field(String),
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Field(name) => f.write_str(name),
        }
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for PathSegment {
    fn from(name: &str) -> Self {
        Self::Field(name.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(name: String) -> Self {
        Self::Field(name)
    }
}

/// Path from the document root to a fragment
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FragmentPath(Vec<PathSegment>);

impl FragmentPath {
    /// Create path from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// Path addressing the rule at `index`
    #[inline]
    #[must_use]
    pub fn rule(index: usize) -> Self {
        Self(vec![PathSegment::Index(index)])
    }

    /// Append a record key, returning the new path
    #[inline]
    #[must_use]
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.0.push(PathSegment::Field(name.into()));
        self
    }

    /// Append an array position, returning the new path
    #[inline]
    #[must_use]
    pub fn index(mut self, index: usize) -> Self {
        self.0.push(PathSegment::Index(index));
        self
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path has no segments
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rule index addressed by the first segment
    #[inline]
    #[must_use]
    pub fn rule_index(&self) -> Option<usize> {
        match self.0.first() {
            Some(PathSegment::Index(i)) => Some(*i),
            _ => None,
        }
    }

    /// Segments below the rule
    #[inline]
    #[must_use]
    pub fn tail(&self) -> &[PathSegment] {
        self.0.get(1..).unwrap_or_default()
    }
}

impl Display for FragmentPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for FragmentPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }

        let segments: Vec<PathSegment> = s
            .split('.')
            .map(|seg| {
                if seg.is_empty() {
                    Err(PathError::EmptySegment)
                } else if seg.bytes().all(|b| b.is_ascii_digit()) {
                    seg.parse()
                        .map(PathSegment::Index)
                        .map_err(|_| PathError::InvalidSegment(seg.to_string()))
                } else if seg.contains(|c: char| c.is_whitespace()) {
                    Err(PathError::InvalidSegment(seg.to_string()))
                } else {
                    Ok(PathSegment::Field(seg.to_string()))
                }
            })
            .collect::<Result<_, _>>()?;

        if !matches!(segments.first(), Some(PathSegment::Index(_))) {
            return Err(PathError::MissingRuleIndex(s.to_string()));
        }

        Ok(Self(segments))
    }
}

impl From<Vec<PathSegment>> for FragmentPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

/// Errors related to fragment paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty path string
    #[error("path is empty")]
    Empty,

    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// Segment that is neither an index nor a key
    #[error("invalid segment: {0}")]
    InvalidSegment(String),

    /// Path does not start with a rule index
    #[error("path '{0}' must start with a rule index")]
    MissingRuleIndex(String),
}
