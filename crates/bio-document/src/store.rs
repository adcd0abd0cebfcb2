//! Versioned snapshot persistence
//!
//! The biography only talks to storage through [`SnapshotStore`]. The
//! filesystem implementation keeps one JSON snapshot per version:
//!
//! ```text
//! <base_dir>/<user_id>/biography_<version>.json
//! <base_dir>/<user_id>/biography_<version>.md     (companion export)
//! <base_dir>/<user_id>/biography_<version>.draft.md  (unsaved edits on top of <version>)
//! ```

use crate::error::StoreError;
use crate::section::Section;
use async_trait::async_trait;
use std::fmt::Debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const SNAPSHOT_PREFIX: &str = "biography_";
const SNAPSHOT_EXT: &str = "json";
const MARKDOWN_EXT: &str = "md";
const DRAFT_EXT: &str = "draft.md";

/// Persistence adapter for biography snapshots
#[async_trait]
pub trait SnapshotStore: Debug + Send + Sync {
    /// Versions persisted for `user_id`, ascending
    async fn list_versions(&self, user_id: &str) -> Result<Vec<u64>, StoreError>;

    /// Highest persisted version, if any
    async fn latest_version(&self, user_id: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.list_versions(user_id).await?.into_iter().max())
    }

    /// Read one snapshot; `None` when that version does not exist
    async fn read(&self, user_id: &str, version: u64) -> Result<Option<Section>, StoreError>;

    /// Persist `root` as `version`
    async fn write(&self, user_id: &str, version: u64, root: &Section) -> Result<(), StoreError>;

    /// Persist the markdown export belonging to `version`
    async fn write_markdown(
        &self,
        user_id: &str,
        version: u64,
        markdown: &str,
    ) -> Result<(), StoreError>;

    /// Persist a markdown export of unsaved edits made after `base_version`
    async fn write_draft_markdown(
        &self,
        user_id: &str,
        base_version: u64,
        markdown: &str,
    ) -> Result<(), StoreError>;
}

/// Filesystem snapshot store
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    base_dir: PathBuf,
}

impl FsSnapshotStore {
    /// Create store rooted at `base_dir`
    #[inline]
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Directory holding one user's snapshots
    #[inline]
    #[must_use]
    pub fn user_dir(&self, user_id: &str) -> PathBuf {
        self.base_dir.join(user_id)
    }

    /// Snapshot file for a version
    #[must_use]
    pub fn snapshot_path(&self, user_id: &str, version: u64) -> PathBuf {
        self.user_dir(user_id)
            .join(format!("{SNAPSHOT_PREFIX}{version}.{SNAPSHOT_EXT}"))
    }

    /// Markdown companion file for a version
    #[must_use]
    pub fn markdown_path(&self, user_id: &str, version: u64) -> PathBuf {
        self.user_dir(user_id)
            .join(format!("{SNAPSHOT_PREFIX}{version}.{MARKDOWN_EXT}"))
    }

    /// Draft export of edits made after `base_version`
    #[must_use]
    pub fn draft_markdown_path(&self, user_id: &str, base_version: u64) -> PathBuf {
        self.user_dir(user_id)
            .join(format!("{SNAPSHOT_PREFIX}{base_version}.{DRAFT_EXT}"))
    }

    /// Write through a temporary file and rename, so a reader never sees
    /// half a snapshot.
    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| StoreError::io_error(dir, e))?;
        }
        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        let tmp = path.with_file_name(tmp_name);
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| StoreError::io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| StoreError::io_error(path, e))
    }
}

/// Version number encoded in a snapshot file name
fn parse_version(file_name: &str) -> Option<u64> {
    file_name
        .strip_prefix(SNAPSHOT_PREFIX)?
        .strip_suffix(SNAPSHOT_EXT)?
        .strip_suffix('.')?
        .parse()
        .ok()
}

#[async_trait]
impl SnapshotStore for FsSnapshotStore {
    async fn list_versions(&self, user_id: &str) -> Result<Vec<u64>, StoreError> {
        let dir = self.user_dir(user_id);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io_error(dir, e)),
        };

        let mut versions = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io_error(&dir, e))?
        {
            if let Some(version) = entry.file_name().to_str().and_then(parse_version) {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    async fn read(&self, user_id: &str, version: u64) -> Result<Option<Section>, StoreError> {
        let path = self.snapshot_path(user_id, version);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io_error(path, e)),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::serialization_error(path, e))
    }

    async fn write(&self, user_id: &str, version: u64, root: &Section) -> Result<(), StoreError> {
        let path = self.snapshot_path(user_id, version);
        let bytes = serde_json::to_vec_pretty(root)
            .map_err(|e| StoreError::serialization_error(&path, e))?;
        self.write_atomic(&path, &bytes).await
    }

    async fn write_markdown(
        &self,
        user_id: &str,
        version: u64,
        markdown: &str,
    ) -> Result<(), StoreError> {
        let path = self.markdown_path(user_id, version);
        self.write_atomic(&path, markdown.as_bytes()).await
    }

    async fn write_draft_markdown(
        &self,
        user_id: &str,
        base_version: u64,
        markdown: &str,
    ) -> Result<(), StoreError> {
        let path = self.draft_markdown_path(user_id, base_version);
        self.write_atomic(&path, markdown.as_bytes()).await
    }
}
