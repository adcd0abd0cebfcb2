//! Biography configuration
//!
//! Everything that used to come from the process environment (where
//! snapshots live, whose biography this is) is passed in explicitly, so
//! tests can run isolated and in parallel.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BASE_DIR: &str = "data/biographies";
const DEFAULT_SAVE_TIMEOUT_MS: u64 = 30_000;

/// Configuration for one user's biography
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiographyConfig {
    /// Owner of the biography; also the storage directory name
    pub user_id: String,
    /// Directory holding one sub-directory per user
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    /// Reject section numbers that skip earlier siblings
    #[serde(default)]
    pub strict_numbering: bool,
    /// Upper bound for `save` to wait on in-flight operations
    #[serde(default = "default_save_timeout_ms")]
    pub save_timeout_ms: u64,
    /// Write the companion markdown file on every save
    #[serde(default = "default_markdown_on_save")]
    pub markdown_on_save: bool,
}

impl BiographyConfig {
    /// Create configuration with defaults
    #[inline]
    #[must_use]
    pub fn new(user_id: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            user_id: user_id.into(),
            base_dir: base_dir.into(),
            strict_numbering: false,
            save_timeout_ms: DEFAULT_SAVE_TIMEOUT_MS,
            markdown_on_save: true,
        }
    }

    /// With strict sequential numbering
    #[inline]
    #[must_use]
    pub fn with_strict_numbering(mut self, strict: bool) -> Self {
        self.strict_numbering = strict;
        self
    }

    /// With save timeout
    #[inline]
    #[must_use]
    pub fn with_save_timeout(mut self, timeout: Duration) -> Self {
        self.save_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With markdown companion on save
    #[inline]
    #[must_use]
    pub fn with_markdown_on_save(mut self, enabled: bool) -> Self {
        self.markdown_on_save = enabled;
        self
    }

    /// Save timeout as a duration
    #[inline]
    #[must_use]
    pub fn save_timeout(&self) -> Duration {
        Duration::from_millis(self.save_timeout_ms)
    }

    /// Directory holding this user's snapshots
    #[inline]
    #[must_use]
    pub fn user_dir(&self) -> PathBuf {
        self.base_dir.join(&self.user_id)
    }

    /// Check the user id is usable as a single directory name
    ///
    /// # Errors
    /// `ConfigError::InvalidUserId` for empty ids, `.`/`..`, or ids with
    /// path separators.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let id = self.user_id.as_str();
        if id.trim().is_empty()
            || id == "."
            || id == ".."
            || id.contains(['/', '\\'])
        {
            return Err(ConfigError::InvalidUserId(self.user_id.clone()));
        }
        Ok(())
    }

    /// Parse configuration from TOML
    ///
    /// # Errors
    /// Parse failures or an invalid user id.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// IO failures, parse failures or an invalid user id.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(DEFAULT_BASE_DIR)
}

fn default_save_timeout_ms() -> u64 {
    DEFAULT_SAVE_TIMEOUT_MS
}

fn default_markdown_on_save() -> bool {
    true
}
