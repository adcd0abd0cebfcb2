//! Error types for biography documents
//!
//! Provides error handling for:
//! - Path and numbering violations (rejected before any mutation)
//! - Identifier problems (missing or inconsistent path/title)
//! - Forbidden operations on the root section
//! - Persistence failures and save timeouts
//! - Configuration loading

use bio_path::PathError;
use std::path::PathBuf;

/// Main biography error type
#[derive(Debug, thiserror::Error)]
pub enum BiographyError {
    /// Path breaks the numbering grammar
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),

    /// Neither path nor title supplied
    #[error("either a path or a title must be provided")]
    MissingIdentifier,

    /// Path does not end with the supplied title
    #[error("path '{path}' does not end with title '{title}'")]
    InconsistentIdentifiers { path: String, title: String },

    /// Another sibling already uses this section number
    #[error("section number {number} is already used by '{existing}' under '{parent}'")]
    DuplicateNumber {
        parent: String,
        number: String,
        existing: String,
    },

    /// Strict numbering: earlier sibling numbers are missing
    #[error("section number {number} under '{parent}' skips missing section {missing}")]
    NumberingGap {
        parent: String,
        number: String,
        missing: String,
    },

    /// A sibling with the new title already exists
    #[error("a section titled '{title}' already exists at that level")]
    TitleConflict { title: String },

    /// Operation not allowed (root deletion)
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Pending writes or active readers did not settle in time
    #[error("save timed out after {waited_ms}ms waiting for in-flight operations")]
    SaveTimeout { waited_ms: u64 },

    /// Requested snapshot does not exist
    #[error("no biography version {version} for user '{user_id}'")]
    VersionNotFound { user_id: String, version: u64 },

    /// Snapshot persistence failed
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl BiographyError {
    /// Check if the caller can reasonably retry the same call
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SaveTimeout { .. } | Self::Storage(StoreError::Io { .. })
        )
    }

    /// Check if the error came from validating caller input
    ///
    /// These are never partially applied: the tree is unchanged.
    #[inline]
    #[must_use]
    pub fn is_rejected_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidPath(_)
                | Self::MissingIdentifier
                | Self::InconsistentIdentifiers { .. }
                | Self::DuplicateNumber { .. }
                | Self::NumberingGap { .. }
                | Self::TitleConflict { .. }
                | Self::Forbidden(_)
        )
    }
}

/// Errors from the snapshot store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error reading or writing a snapshot
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot could not be (de)serialized
    #[error("malformed snapshot {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Snapshot parsed but its tree is not a valid biography
    #[error("invalid snapshot {version} for user '{user_id}': {reason}")]
    InvalidSnapshot {
        user_id: String,
        version: u64,
        reason: String,
    },
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create serialization error for path
    pub fn serialization_error(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Serialization {
            path: path.into(),
            source,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// User id cannot be used as a directory name
    #[error("invalid user id '{0}'")]
    InvalidUserId(String),

    /// Config file could not be read
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = BiographyError::MissingIdentifier;
        assert!(err.to_string().contains("path or a title"));

        let err = BiographyError::from(PathError::EmptyPath);
        assert!(err.to_string().starts_with("invalid path"));
    }

    #[test]
    fn error_is_retryable() {
        assert!(BiographyError::SaveTimeout { waited_ms: 30_000 }.is_retryable());
        let io = StoreError::io_error(
            "data/u/biography_1.json",
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        assert!(BiographyError::Storage(io).is_retryable());
        assert!(!BiographyError::MissingIdentifier.is_retryable());
    }

    #[test]
    fn error_is_rejected_input() {
        assert!(BiographyError::Forbidden("root".into()).is_rejected_input());
        assert!(BiographyError::TitleConflict {
            title: "1 A".into()
        }
        .is_rejected_input());
        assert!(!BiographyError::SaveTimeout { waited_ms: 1 }.is_rejected_input());
    }
}
