//! Section paths for addressing within a biography
//!
//! Provides [`SectionPath`] for hierarchical addressing of sections.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::grammar::validate_title_at_depth;

/// Separator between title segments.
pub const SEPARATOR: char = '/';

/// Maximum number of segments below the root.
pub const MAX_DEPTH: usize = 3;

/// Validated path from the root to a section
///
/// Each segment is a full section title. Parsing enforces the numbering
/// grammar, so a `SectionPath` in hand is always well-formed.
///
/// # Examples
/// - `[]` → root
/// - `["1 Early Life", "1.1 Childhood"]` → `1 Early Life/1.1 Childhood`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SectionPath(Vec<String>);

impl SectionPath {
    /// Empty path (root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty (root)
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Get parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Get last segment (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Check if this path is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.0.len() <= other.0.len() && self.0 == other.0[..self.0.len()]
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Path with the last segment replaced, validated again.
    ///
    /// # Errors
    /// Returns error if the path is the root or `title` breaks the grammar
    /// at this depth.
    pub fn with_last(&self, title: &str) -> Result<Self, PathError> {
        let parent = self.parent().ok_or(PathError::RootHasNoTitle)?;
        let mut segments = parent.0;
        segments.push(title.to_string());
        Self::from_segments(segments)
    }

    /// Validate raw segments against the numbering grammar
    ///
    /// # Errors
    /// Returns the first rule any segment breaks.
    pub fn from_segments(segments: Vec<String>) -> Result<Self, PathError> {
        if segments.len() > MAX_DEPTH {
            return Err(PathError::TooDeep {
                depth: segments.len(),
                max: MAX_DEPTH,
            });
        }

        let mut parent_number: Option<Vec<u32>> = None;
        for (idx, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                return Err(PathError::EmptySegment);
            }
            let number = validate_title_at_depth(segment, idx + 1, parent_number.as_deref())?;
            parent_number = Some(number);
        }

        Ok(Self(segments))
    }
}

impl Display for SectionPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(SEPARATOR.to_string().as_str()))
    }
}

impl FromStr for SectionPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        let segments: Vec<String> = s.split(SEPARATOR).map(str::to_string).collect();
        Self::from_segments(segments)
    }
}

impl<'a> IntoIterator for &'a SectionPath {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Errors related to section paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// A path was required but the root was given
    #[error("path cannot be empty, a section path is required")]
    EmptyPath,

    /// The root has no title segment to replace
    #[error("the root path has no title segment")]
    RootHasNoTitle,

    /// More segments than the grammar allows
    #[error("path has {depth} segments (max: {max})")]
    TooDeep { depth: usize, max: usize },

    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// Title contains the path separator
    #[error("title '{0}' must not contain '/'")]
    SeparatorInTitle(String),

    /// Segment does not start with `<numeral> <label>`
    #[error("segment '{0}' must start with a section number followed by a space and a label")]
    MissingNumber(String),

    /// Numeral has the wrong number of components for its depth
    #[error("segment '{segment}' must have a {expected}-part section number")]
    WrongDepth { segment: String, expected: usize },

    /// Numeral does not extend its parent's numeral
    #[error("segment '{segment}' must extend parent number '{parent}'")]
    ParentMismatch { segment: String, parent: String },

    /// Numbering starts at 1
    #[error("segment '{0}' uses 0 in its section number")]
    ZeroComponent(String),
}
