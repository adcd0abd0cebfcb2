//! Section addressing for the mutation API
//!
//! Callers name a section by path, by title, or by both. With both, the
//! path must end with the title.

use crate::error::BiographyError;
use crate::section::Section;
use bio_path::SectionPath;
use std::fmt::{self, Display, Formatter};

/// Path and/or title identifying one section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionLocator {
    /// `/`-separated numbered path; `""` is the root
    pub path: Option<String>,
    /// Exact title, searched depth-first when no path is given
    pub title: Option<String>,
}

impl SectionLocator {
    /// Locate by path
    #[inline]
    #[must_use]
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            title: None,
        }
    }

    /// Locate by title
    #[inline]
    #[must_use]
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            path: None,
            title: Some(title.into()),
        }
    }

    /// Locate by optional path and title, as agents supply them
    #[inline]
    #[must_use]
    pub fn new(path: Option<String>, title: Option<String>) -> Self {
        Self { path, title }
    }

    /// The root section
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self::path("")
    }

    /// Validate the identifiers against each other and the grammar.
    ///
    /// # Errors
    /// - `MissingIdentifier` when neither is set
    /// - `InvalidPath` when the path breaks the grammar
    /// - `InconsistentIdentifiers` when the path does not end with the title
    pub(crate) fn resolve(&self, root_title: &str) -> Result<Target, BiographyError> {
        match (&self.path, &self.title) {
            (None, None) => Err(BiographyError::MissingIdentifier),
            (None, Some(title)) => Ok(Target::Title(title.clone())),
            (Some(raw), title) => {
                let path: SectionPath = raw.parse()?;
                if let Some(title) = title {
                    if path.last().unwrap_or(root_title) != title.as_str() {
                        return Err(BiographyError::InconsistentIdentifiers {
                            path: raw.clone(),
                            title: title.clone(),
                        });
                    }
                }
                Ok(Target::Path(path))
            }
        }
    }
}

impl Display for SectionLocator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match (&self.path, &self.title) {
            (Some(path), Some(title)) => write!(f, "path '{path}' (title '{title}')"),
            (Some(path), None) => write!(f, "path '{path}'"),
            (None, Some(title)) => write!(f, "title '{title}'"),
            (None, None) => f.write_str("<no identifier>"),
        }
    }
}

/// Resolved, validated locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    Path(SectionPath),
    Title(String),
}

impl Target {
    /// Path segments of the target, if it exists in `root`
    pub(crate) fn locate(&self, root: &Section) -> Option<Vec<String>> {
        match self {
            Self::Path(path) => root
                .find_by_path(path.segments())
                .map(|_| path.segments().to_vec()),
            Self::Title(title) => root.path_of(title),
        }
    }

    /// The target section, if it exists in `root`
    pub(crate) fn find<'a>(&self, root: &'a Section) -> Option<&'a Section> {
        match self {
            Self::Path(path) => root.find_by_path(path.segments()),
            Self::Title(title) => root.find_by_title(title),
        }
    }
}
