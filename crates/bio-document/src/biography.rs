//! Biography document
//!
//! One [`Biography`] is shared (behind an `Arc`) by every agent task working
//! on a user's document. Mutations serialize through the write side of the
//! [`AccessGate`]; exports use the read side; [`Biography::save`] excludes
//! both while it snapshots the tree.

use crate::citations::strip_memory_links;
use crate::config::BiographyConfig;
use crate::error::{BiographyError, StoreError};
use crate::gate::AccessGate;
use crate::locator::SectionLocator;
use crate::markdown::render_markdown;
use crate::section::{Section, SectionOutline};
use crate::store::{FsSnapshotStore, SnapshotStore};
use bio_path::{format_number, sort_key, validate_title_at_depth, PathError, SectionPath};
use indexmap::IndexSet;
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

/// Changes applied by [`Biography::update_section`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionUpdate {
    /// Replacement content
    pub content: Option<String>,
    /// New title; the section is re-keyed under its parent
    pub new_title: Option<String>,
}

impl SectionUpdate {
    /// Replace content only
    #[inline]
    #[must_use]
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            new_title: None,
        }
    }

    /// Rename only
    #[inline]
    #[must_use]
    pub fn retitle(new_title: impl Into<String>) -> Self {
        Self {
            content: None,
            new_title: Some(new_title.into()),
        }
    }

    /// Also rename
    #[inline]
    #[must_use]
    pub fn with_title(mut self, new_title: impl Into<String>) -> Self {
        self.new_title = Some(new_title.into());
        self
    }
}

/// Shape and coverage figures for completeness checks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BiographyStats {
    /// Sections below the root
    pub section_count: usize,
    /// Deepest level reached (root is 0)
    pub max_depth: usize,
    /// Words of content, citation markers excluded
    pub word_count: usize,
    /// Distinct memory ids cited anywhere
    pub cited_memory_count: usize,
    /// Non-root sections without content (e.g. implicit ancestors)
    pub empty_sections: usize,
}

/// A user's biography document
#[derive(Debug)]
pub struct Biography {
    config: BiographyConfig,
    store: Arc<dyn SnapshotStore>,
    root: RwLock<Section>,
    version: AtomicU64,
    /// Tree differs from snapshot `version`; only changed under the tree lock
    unsaved_changes: AtomicBool,
    gate: AccessGate,
}

/// Root title for a user
#[must_use]
pub fn root_title_for(user_id: &str) -> String {
    format!("Biography of {user_id}")
}

impl Biography {
    /// Empty biography stored on the filesystem under `config.base_dir`.
    ///
    /// The version counter starts at the highest persisted version, so the
    /// next save never overwrites history.
    ///
    /// # Errors
    /// Invalid configuration or an unreadable storage directory.
    pub async fn open(config: BiographyConfig) -> Result<Self, BiographyError> {
        let store = Arc::new(FsSnapshotStore::new(&config.base_dir));
        Self::open_with_store(config, store).await
    }

    /// Empty biography on a custom store
    ///
    /// # Errors
    /// Invalid configuration or a failing store.
    pub async fn open_with_store(
        config: BiographyConfig,
        store: Arc<dyn SnapshotStore>,
    ) -> Result<Self, BiographyError> {
        config.validate()?;
        let version = store.latest_version(&config.user_id).await?.unwrap_or(0);
        let root = Section::new(root_title_for(&config.user_id), "");
        info!(user_id = %config.user_id, version, "opened empty biography");
        Ok(Self::assemble(config, store, root, version, true))
    }

    /// Load the latest (or a specific) persisted version from the filesystem.
    ///
    /// With no snapshots and no requested version, this is [`Biography::open`].
    ///
    /// # Errors
    /// `VersionNotFound` for a missing requested version; storage errors.
    pub async fn load_from_file(
        config: BiographyConfig,
        version: Option<u64>,
    ) -> Result<Self, BiographyError> {
        let store = Arc::new(FsSnapshotStore::new(&config.base_dir));
        Self::load_with_store(config, store, version).await
    }

    /// Load from a custom store
    ///
    /// Loading an older version keeps the counter at the latest version.
    ///
    /// # Errors
    /// `VersionNotFound` for a missing requested version; storage errors.
    pub async fn load_with_store(
        config: BiographyConfig,
        store: Arc<dyn SnapshotStore>,
        version: Option<u64>,
    ) -> Result<Self, BiographyError> {
        config.validate()?;
        let latest = store.latest_version(&config.user_id).await?;
        let Some(requested) = version.or(latest) else {
            return Self::open_with_store(config, store).await;
        };

        let mut root = store
            .read(&config.user_id, requested)
            .await?
            .ok_or_else(|| BiographyError::VersionNotFound {
                user_id: config.user_id.clone(),
                version: requested,
            })?;
        root.normalize_loaded()
            .map_err(|reason| StoreError::InvalidSnapshot {
                user_id: config.user_id.clone(),
                version: requested,
                reason,
            })?;

        let counter = latest.unwrap_or(0).max(requested);
        // An older version loaded under a newer counter is not snapshot `counter`.
        let unsaved = counter != requested;
        info!(user_id = %config.user_id, version = requested, "loaded biography");
        Ok(Self::assemble(config, store, root, counter, unsaved))
    }

    fn assemble(
        config: BiographyConfig,
        store: Arc<dyn SnapshotStore>,
        root: Section,
        version: u64,
        unsaved_changes: bool,
    ) -> Self {
        Self {
            config,
            store,
            root: RwLock::new(root),
            version: AtomicU64::new(version),
            unsaved_changes: AtomicBool::new(unsaved_changes),
            gate: AccessGate::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.config.user_id
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &BiographyConfig {
        &self.config
    }

    /// Version of the last save (or load)
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Whether the tree differs from the snapshot of [`version`](Self::version)
    #[inline]
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved_changes.load(Ordering::SeqCst)
    }

    /// Current root title
    #[must_use]
    pub fn root_title(&self) -> String {
        self.root.read().title().to_string()
    }

    /// Copy of the whole tree
    #[must_use]
    pub fn root(&self) -> Section {
        self.root.read().clone()
    }

    /// Add the section at `path`.
    ///
    /// Missing ancestors are created with empty content, titled by their
    /// path segment, so `"2 Career/2.1 Jobs/2.1.1 First Job"` works before
    /// `"2 Career"` exists. A path that resolves on read may therefore have
    /// been created implicitly by a deeper write.
    ///
    /// If the section already exists, non-empty `content` replaces its
    /// content and the subtree is kept.
    ///
    /// Numbering gaps are accepted unless `strict_numbering` is set:
    /// `"3 Later"` may be added before `"1 Early"` and `"2 Middle"` exist,
    /// and siblings still display in numeral order. A number already used
    /// by a sibling is always rejected.
    ///
    /// # Errors
    /// - `InvalidPath` for the empty path or a grammar violation
    /// - `DuplicateNumber` if a sibling already uses a new segment's number
    /// - `NumberingGap` with strict numbering when earlier numbers are missing
    ///
    /// On error the tree is unchanged.
    pub async fn add_section(&self, path: &str, content: &str) -> Result<Section, BiographyError> {
        const OP: &str = "add_section";
        let parsed: SectionPath = match path.parse() {
            Ok(parsed) => parsed,
            Err(e) => return self.reject(OP, &path, e.into()),
        };
        if parsed.is_root() {
            return self.reject(OP, &path, PathError::EmptyPath.into());
        }

        let _write = self.gate.write().await;
        let mut root = self.root.write();
        if let Err(e) = self.check_insertion(&root, &parsed) {
            return self.reject(OP, &path, e);
        }
        let leaf = upsert_path(&mut root, parsed.segments(), content);
        self.unsaved_changes.store(true, Ordering::SeqCst);
        debug!(user_id = %self.config.user_id, path = %parsed, "section added");
        Ok(leaf)
    }

    /// Update content and/or title of one section.
    ///
    /// The root is edited in place and never re-keyed. A rename re-keys the
    /// section under its parent and carries its subtree over unchanged; a
    /// rename alone leaves `content` and `last_edit` untouched.
    ///
    /// Returns `Ok(None)` if the section does not exist.
    ///
    /// # Errors
    /// Identifier errors, `InvalidPath` for a new title that breaks the
    /// grammar at that depth, `TitleConflict`, `DuplicateNumber`,
    /// `NumberingGap`.
    pub async fn update_section(
        &self,
        locator: SectionLocator,
        update: SectionUpdate,
    ) -> Result<Option<Section>, BiographyError> {
        const OP: &str = "update_section";
        let _write = self.gate.write().await;
        let mut root = self.root.write();

        let target = match locator.resolve(root.title()) {
            Ok(target) => target,
            Err(e) => return self.reject(OP, &locator, e),
        };
        let Some(segments) = target.locate(&root) else {
            debug!(user_id = %self.config.user_id, target = %locator, "update target not found");
            return Ok(None);
        };

        let Some((title, parent_segments)) = segments.split_last() else {
            if let Some(new_title) = update.new_title.as_deref() {
                if let Err(e) = check_root_title(new_title) {
                    return self.reject(OP, &locator, e);
                }
                root.set_title(new_title);
            }
            if let Some(content) = update.content {
                root.set_content(content);
            }
            self.unsaved_changes.store(true, Ordering::SeqCst);
            debug!(user_id = %self.config.user_id, "root section updated");
            return Ok(Some(root.clone()));
        };

        let new_title = update
            .new_title
            .as_deref()
            .filter(|candidate| *candidate != title.as_str());
        if let Some(new_title) = new_title {
            if let Err(e) = self.check_rename(&root, parent_segments, title, new_title) {
                return self.reject(OP, &locator, e);
            }
        }

        let Some(parent) = root.find_by_path_mut(parent_segments) else {
            return Ok(None);
        };
        if update.content.is_some() || new_title.is_some() {
            self.unsaved_changes.store(true, Ordering::SeqCst);
        }
        if let Some(content) = update.content {
            if let Some(section) = parent.child_mut(title) {
                section.set_content(content);
            }
        }
        let final_title = match new_title {
            Some(new_title) if parent.rename_child(title, new_title) => new_title,
            _ => title.as_str(),
        };
        debug!(
            user_id = %self.config.user_id,
            target = %locator,
            title = final_title,
            "section updated"
        );
        Ok(parent.child(final_title).cloned())
    }

    /// Delete a section and its subtree.
    ///
    /// Returns `Ok(false)` if the section does not exist.
    ///
    /// # Errors
    /// Identifier errors; `Forbidden` when the target is the root.
    pub async fn delete_section(&self, locator: SectionLocator) -> Result<bool, BiographyError> {
        const OP: &str = "delete_section";
        let _write = self.gate.write().await;
        let mut root = self.root.write();

        let target = match locator.resolve(root.title()) {
            Ok(target) => target,
            Err(e) => return self.reject(OP, &locator, e),
        };
        let Some(segments) = target.locate(&root) else {
            return Ok(false);
        };
        let Some((title, parent_segments)) = segments.split_last() else {
            return self.reject(
                OP,
                &locator,
                BiographyError::Forbidden("the root section cannot be deleted".to_string()),
            );
        };

        let removed = root
            .find_by_path_mut(parent_segments)
            .and_then(|parent| parent.remove_child(title))
            .is_some();
        if removed {
            self.unsaved_changes.store(true, Ordering::SeqCst);
            debug!(user_id = %self.config.user_id, target = %locator, "section deleted");
        }
        Ok(removed)
    }

    /// Copy of one section.
    ///
    /// With `hide_memory_links`, citation markers are stripped from the
    /// returned copy; the stored content is not touched.
    ///
    /// # Errors
    /// Identifier errors.
    pub fn get_section(
        &self,
        locator: &SectionLocator,
        hide_memory_links: bool,
    ) -> Result<Option<Section>, BiographyError> {
        let root = self.root.read();
        let target = locator.resolve(root.title())?;
        Ok(target.find(&root).map(|section| {
            if hide_memory_links {
                section.without_memory_links()
            } else {
                section.clone()
            }
        }))
    }

    /// Section at `path`, `Ok(None)` if any segment is missing.
    ///
    /// # Errors
    /// `InvalidPath` for a malformed path.
    pub fn get_section_by_path(&self, path: &str) -> Result<Option<Section>, BiographyError> {
        let path: SectionPath = path.parse()?;
        Ok(self.root.read().find_by_path(path.segments()).cloned())
    }

    /// First section titled `title`, depth-first.
    #[must_use]
    pub fn get_section_by_title(&self, title: &str) -> Option<Section> {
        self.root.read().find_by_title(title).cloned()
    }

    /// Parent of the first section titled `title`.
    #[must_use]
    pub fn find_parent(&self, title: &str) -> Option<Section> {
        self.root.read().find_parent(title).cloned()
    }

    /// Title-only tree for prompting
    #[must_use]
    pub fn get_sections(&self) -> SectionOutline {
        self.root.read().outline()
    }

    /// Every section path in display order
    #[must_use]
    pub fn section_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        collect_paths(&self.root.read(), "", &mut paths);
        paths
    }

    /// Distinct memory ids cited anywhere, in tree order
    #[must_use]
    pub fn memory_ids(&self) -> Vec<String> {
        let root = self.root.read();
        let mut ids: IndexSet<String> = IndexSet::new();
        root.visit(&mut |section, _| ids.extend(section.memory_ids().iter().cloned()));
        ids.into_iter().collect()
    }

    /// Shape and coverage figures
    #[must_use]
    pub fn stats(&self) -> BiographyStats {
        let root = self.root.read();
        let mut stats = BiographyStats::default();
        let mut cited: IndexSet<&str> = IndexSet::new();
        root.visit(&mut |section, depth| {
            if depth > 0 {
                stats.section_count += 1;
                stats.max_depth = stats.max_depth.max(depth);
                if section.content().trim().is_empty() {
                    stats.empty_sections += 1;
                }
            }
            stats.word_count += strip_memory_links(section.content())
                .split_whitespace()
                .count();
            cited.extend(section.memory_ids().iter().map(String::as_str));
        });
        stats.cited_memory_count = cited.len();
        stats
    }

    /// Persisted versions, ascending
    ///
    /// # Errors
    /// Storage errors.
    pub async fn list_versions(&self) -> Result<Vec<u64>, BiographyError> {
        Ok(self.store.list_versions(&self.config.user_id).await?)
    }

    /// Render the document as markdown.
    ///
    /// Waits for pending writes, then reads a consistent tree. With
    /// `save_to_file` the result is also written to disk: as the companion
    /// of the current version when the tree is exactly that snapshot,
    /// otherwise as a draft next to it, so a version's companion always
    /// matches its snapshot.
    ///
    /// # Errors
    /// Storage errors when saving to file.
    pub async fn export_to_markdown(
        &self,
        save_to_file: bool,
        hide_memory_links: bool,
    ) -> Result<String, BiographyError> {
        let _read = self.gate.read().await;
        let (markdown, unsaved) = {
            let root = self.root.read();
            (
                render_markdown(&root, hide_memory_links),
                self.has_unsaved_changes(),
            )
        };
        if save_to_file {
            let version = self.version();
            let user_id = &self.config.user_id;
            if unsaved {
                self.store
                    .write_draft_markdown(user_id, version, &markdown)
                    .await?;
            } else {
                self.store.write_markdown(user_id, version, &markdown).await?;
            }
            info!(user_id = %user_id, version, draft = unsaved, "markdown exported");
        }
        Ok(markdown)
    }

    /// Persist a snapshot as the next version and return that version.
    ///
    /// Acts as a barrier: waits for pending writes to settle, holds off new
    /// readers and writers, and waits for active readers to finish. Each
    /// wait shares one deadline of `save_timeout`.
    ///
    /// # Errors
    /// `SaveTimeout` if the document does not go quiet in time; storage
    /// errors. The version is only bumped after a successful write.
    pub async fn save(&self) -> Result<u64, BiographyError> {
        let deadline = Instant::now() + self.config.save_timeout();

        if timeout_at(deadline, self.gate.settled()).await.is_err() {
            return Err(self.save_timed_out("pending writes"));
        }
        let Ok(_write) = timeout_at(deadline, self.gate.write()).await else {
            return Err(self.save_timed_out("write permit"));
        };
        if timeout_at(deadline, self.gate.readers_drained()).await.is_err() {
            return Err(self.save_timed_out("active readers"));
        }

        let snapshot = self.root.read().clone();
        let version = self.version() + 1;
        let user_id = &self.config.user_id;
        self.store.write(user_id, version, &snapshot).await?;
        if self.config.markdown_on_save {
            let markdown = render_markdown(&snapshot, true);
            self.store.write_markdown(user_id, version, &markdown).await?;
        }
        self.version.store(version, Ordering::SeqCst);
        self.unsaved_changes.store(false, Ordering::SeqCst);
        info!(user_id = %user_id, version, "biography saved");
        Ok(version)
    }

    /// Validate every new segment of `path` before anything is created.
    fn check_insertion(&self, root: &Section, path: &SectionPath) -> Result<(), BiographyError> {
        let mut node = Some(root);
        let mut parent_title = root.title();
        for segment in path.segments() {
            match node {
                Some(parent) => {
                    if let Some(existing) = parent.child(segment) {
                        node = Some(existing);
                    } else {
                        let siblings: Vec<&str> = parent.child_titles().collect();
                        self.check_numbering(parent.title(), &siblings, segment)?;
                        node = None;
                    }
                }
                // Parent is created by this same call and has no other children.
                None => self.check_numbering(parent_title, &[], segment)?,
            }
            parent_title = segment.as_str();
        }
        Ok(())
    }

    fn check_rename(
        &self,
        root: &Section,
        parent_segments: &[String],
        old_title: &str,
        new_title: &str,
    ) -> Result<(), BiographyError> {
        let parent_number = parent_segments.last().map(|title| sort_key(title));
        validate_title_at_depth(new_title, parent_segments.len() + 1, parent_number.as_deref())?;

        let Some(parent) = root.find_by_path(parent_segments) else {
            return Ok(());
        };
        if parent.child(new_title).is_some() {
            return Err(BiographyError::TitleConflict {
                title: new_title.to_string(),
            });
        }
        let siblings: Vec<&str> = parent
            .child_titles()
            .filter(|title| *title != old_title)
            .collect();
        self.check_numbering(parent.title(), &siblings, new_title)
    }

    /// Numbers are unique among siblings; strict mode also forbids gaps.
    fn check_numbering(
        &self,
        parent_title: &str,
        siblings: &[&str],
        title: &str,
    ) -> Result<(), BiographyError> {
        let number = sort_key(title);
        if let Some(existing) = siblings.iter().find(|sibling| sort_key(sibling) == number) {
            return Err(BiographyError::DuplicateNumber {
                parent: parent_title.to_string(),
                number: format_number(&number),
                existing: (*existing).to_string(),
            });
        }

        if !self.config.strict_numbering {
            return Ok(());
        }
        let Some((&last, prefix)) = number.split_last() else {
            return Ok(());
        };
        for n in 1..last {
            let mut wanted = prefix.to_vec();
            wanted.push(n);
            if !siblings.iter().any(|sibling| sort_key(sibling) == wanted) {
                return Err(BiographyError::NumberingGap {
                    parent: parent_title.to_string(),
                    number: format_number(&number),
                    missing: format_number(&wanted),
                });
            }
        }
        Ok(())
    }

    fn reject<T>(
        &self,
        operation: &'static str,
        target: &dyn Display,
        error: BiographyError,
    ) -> Result<T, BiographyError> {
        warn!(
            user_id = %self.config.user_id,
            operation,
            target = %target,
            error = %error,
            "mutation rejected"
        );
        Err(error)
    }

    fn save_timed_out(&self, waiting_for: &'static str) -> BiographyError {
        warn!(
            user_id = %self.config.user_id,
            waiting_for,
            timeout_ms = self.config.save_timeout_ms,
            "save timed out"
        );
        BiographyError::SaveTimeout {
            waited_ms: self.config.save_timeout_ms,
        }
    }
}

/// Walk `segments` from `node`, creating empty ancestors on the way, and
/// return a copy of the leaf.
fn upsert_path(node: &mut Section, segments: &[String], content: &str) -> Section {
    let Some((head, rest)) = segments.split_first() else {
        if !content.is_empty() {
            node.set_content(content);
        }
        return node.clone();
    };

    let created = node.child(head).is_none();
    if created {
        node.insert_child(Section::new(head.clone(), String::new()));
    }
    match node.child_mut(head) {
        Some(child) => upsert_path(child, rest, content),
        None => Section::new(head.clone(), content),
    }
}

fn check_root_title(title: &str) -> Result<(), BiographyError> {
    if title.trim().is_empty() {
        return Err(PathError::EmptySegment.into());
    }
    if title.contains(bio_path::SEPARATOR) {
        return Err(PathError::SeparatorInTitle(title.to_string()).into());
    }
    Ok(())
}

fn collect_paths(node: &Section, prefix: &str, out: &mut Vec<String>) {
    for (title, child) in node.subsections() {
        let path = if prefix.is_empty() {
            title.clone()
        } else {
            format!("{prefix}{}{title}", bio_path::SEPARATOR)
        };
        out.push(path.clone());
        collect_paths(child, &path, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn biography(dir: &TempDir) -> Biography {
        Biography::open(BiographyConfig::new("ada", dir.path()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn open_empty() {
        let dir = TempDir::new().unwrap();
        let bio = biography(&dir).await;
        assert_eq!(bio.version(), 0);
        assert_eq!(bio.root_title(), "Biography of ada");
        assert!(bio.root().subsections().is_empty());
    }

    #[tokio::test]
    async fn add_returns_leaf_and_creates_ancestors() {
        let dir = TempDir::new().unwrap();
        let bio = biography(&dir).await;
        let leaf = bio
            .add_section("2 Career/2.1 Jobs/2.1.1 First Job", "paper route [MEM_7]")
            .await
            .unwrap();
        assert_eq!(leaf.title(), "2.1.1 First Job");
        assert_eq!(leaf.memory_ids(), &["MEM_7"]);

        let career = bio.get_section_by_path("2 Career").unwrap().unwrap();
        assert_eq!(career.content(), "");
        let jobs = bio.get_section_by_path("2 Career/2.1 Jobs").unwrap().unwrap();
        assert_eq!(jobs.content(), "");
    }

    #[tokio::test]
    async fn add_rejects_empty_and_invalid_paths() {
        let dir = TempDir::new().unwrap();
        let bio = biography(&dir).await;
        assert!(matches!(
            bio.add_section("", "x").await,
            Err(BiographyError::InvalidPath(PathError::EmptyPath))
        ));
        assert!(matches!(
            bio.add_section("1 A/2.1 B", "x").await,
            Err(BiographyError::InvalidPath(_))
        ));
        assert!(bio.root().subsections().is_empty());
    }

    #[tokio::test]
    async fn add_existing_fills_content_and_keeps_children() {
        let dir = TempDir::new().unwrap();
        let bio = biography(&dir).await;
        bio.add_section("1 Early Life/1.1 Childhood", "games").await.unwrap();
        let filled = bio.add_section("1 Early Life", "born [MEM_1]").await.unwrap();
        assert_eq!(filled.content(), "born [MEM_1]");
        assert!(filled.child("1.1 Childhood").is_some());

        let untouched = bio.add_section("1 Early Life", "").await.unwrap();
        assert_eq!(untouched.content(), "born [MEM_1]");
    }

    #[tokio::test]
    async fn duplicate_number_is_rejected() {
        let dir = TempDir::new().unwrap();
        let bio = biography(&dir).await;
        bio.add_section("1 Early Life", "").await.unwrap();
        assert!(matches!(
            bio.add_section("1 Childhood", "").await,
            Err(BiographyError::DuplicateNumber { .. })
        ));
    }

    #[tokio::test]
    async fn lenient_numbering_allows_gaps() {
        let dir = TempDir::new().unwrap();
        let bio = biography(&dir).await;
        bio.add_section("3 C", "").await.unwrap();
        bio.add_section("1 A", "").await.unwrap();
        let titles: Vec<_> = bio.root().child_titles().map(str::to_string).collect();
        assert_eq!(titles, vec!["1 A", "3 C"]);
    }

    #[tokio::test]
    async fn strict_numbering_rejects_gaps() {
        let dir = TempDir::new().unwrap();
        let bio = Biography::open(
            BiographyConfig::new("ada", dir.path()).with_strict_numbering(true),
        )
        .await
        .unwrap();

        bio.add_section("1 A", "").await.unwrap();
        assert!(matches!(
            bio.add_section("3 C", "").await,
            Err(BiographyError::NumberingGap { .. })
        ));
        assert!(matches!(
            bio.add_section("2 B/2.2 Second", "").await,
            Err(BiographyError::NumberingGap { .. })
        ));
        // A rejected call leaves no implicit ancestors behind.
        assert!(bio.get_section_by_path("2 B").unwrap().is_none());

        bio.add_section("2 B/2.1 First", "").await.unwrap();
        bio.add_section("2 B/2.2 Second", "").await.unwrap();
        bio.add_section("3 C", "").await.unwrap();
    }

    #[tokio::test]
    async fn update_content_merges_ids() {
        let dir = TempDir::new().unwrap();
        let bio = biography(&dir).await;
        bio.add_section("1 A", "one [MEM_1]").await.unwrap();
        let updated = bio
            .update_section(SectionLocator::path("1 A"), SectionUpdate::content("two [MEM_2]"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.content(), "two [MEM_2]");
        assert_eq!(updated.memory_ids(), &["MEM_1", "MEM_2"]);
    }

    #[tokio::test]
    async fn update_by_title_and_missing() {
        let dir = TempDir::new().unwrap();
        let bio = biography(&dir).await;
        bio.add_section("1 A/1.1 B", "").await.unwrap();
        let updated = bio
            .update_section(SectionLocator::title("1.1 B"), SectionUpdate::content("text"))
            .await
            .unwrap();
        assert_eq!(updated.map(|s| s.content().to_string()), Some("text".into()));

        let missing = bio
            .update_section(SectionLocator::path("2 Z"), SectionUpdate::content("x"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn update_requires_identifier() {
        let dir = TempDir::new().unwrap();
        let bio = biography(&dir).await;
        assert!(matches!(
            bio.update_section(SectionLocator::default(), SectionUpdate::content("x"))
                .await,
            Err(BiographyError::MissingIdentifier)
        ));
    }

    #[tokio::test]
    async fn rename_rejections_leave_tree_unchanged() {
        let dir = TempDir::new().unwrap();
        let bio = biography(&dir).await;
        bio.add_section("1 A/1.1 B", "b").await.unwrap();
        bio.add_section("1 A/1.2 C", "c").await.unwrap();

        let conflict = bio
            .update_section(
                SectionLocator::path("1 A/1.1 B"),
                SectionUpdate::content("changed").with_title("1.2 C"),
            )
            .await;
        assert!(matches!(conflict, Err(BiographyError::TitleConflict { .. })));

        let duplicate = bio
            .update_section(SectionLocator::path("1 A/1.1 B"), SectionUpdate::retitle("1.2 Other"))
            .await;
        assert!(matches!(duplicate, Err(BiographyError::DuplicateNumber { .. })));

        let wrong_parent = bio
            .update_section(SectionLocator::path("1 A/1.1 B"), SectionUpdate::retitle("2.1 B"))
            .await;
        assert!(matches!(wrong_parent, Err(BiographyError::InvalidPath(_))));

        let b = bio.get_section_by_path("1 A/1.1 B").unwrap().unwrap();
        assert_eq!(b.content(), "b");
    }

    #[tokio::test]
    async fn update_root_in_place() {
        let dir = TempDir::new().unwrap();
        let bio = biography(&dir).await;
        bio.add_section("1 A", "").await.unwrap();
        let root = bio
            .update_section(
                SectionLocator::root(),
                SectionUpdate::content("preface").with_title("The Life of Ada"),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(root.title(), "The Life of Ada");
        assert_eq!(root.content(), "preface");
        assert!(root.child("1 A").is_some());
        assert_eq!(bio.root_title(), "The Life of Ada");
    }

    #[tokio::test]
    async fn delete_section_and_root() {
        let dir = TempDir::new().unwrap();
        let bio = biography(&dir).await;
        bio.add_section("1 A/1.1 B", "").await.unwrap();

        assert!(matches!(
            bio.delete_section(SectionLocator::root()).await,
            Err(BiographyError::Forbidden(_))
        ));
        assert!(matches!(
            bio.delete_section(SectionLocator::title("Biography of ada")).await,
            Err(BiographyError::Forbidden(_))
        ));
        assert!(matches!(
            bio.delete_section(SectionLocator::default()).await,
            Err(BiographyError::MissingIdentifier)
        ));

        assert!(bio.delete_section(SectionLocator::path("1 A")).await.unwrap());
        assert!(!bio.delete_section(SectionLocator::path("1 A")).await.unwrap());
        assert!(bio.get_section_by_title("1.1 B").is_none());
    }

    #[tokio::test]
    async fn get_section_hides_links() {
        let dir = TempDir::new().unwrap();
        let bio = biography(&dir).await;
        bio.add_section("1 A", "text [MEM_1].").await.unwrap();

        let hidden = bio.get_section(&SectionLocator::path("1 A"), true).unwrap().unwrap();
        assert_eq!(hidden.content(), "text.");
        let raw = bio.get_section(&SectionLocator::path("1 A"), false).unwrap().unwrap();
        assert_eq!(raw.content(), "text [MEM_1].");
        assert!(bio
            .get_section(&SectionLocator::title("9 Nope"), true)
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn paths_ids_and_stats() {
        let dir = TempDir::new().unwrap();
        let bio = biography(&dir).await;
        bio.add_section("2 Career/2.1 Jobs", "clerk [MEM_2]").await.unwrap();
        bio.add_section("1 Early Life", "born in Ohio [MEM_1] [MEM_2]").await.unwrap();

        assert_eq!(
            bio.section_paths(),
            vec!["1 Early Life", "2 Career", "2 Career/2.1 Jobs"]
        );
        assert_eq!(bio.memory_ids(), vec!["MEM_1", "MEM_2"]);
        assert_eq!(
            bio.stats(),
            BiographyStats {
                section_count: 3,
                max_depth: 2,
                word_count: 4,
                cited_memory_count: 2,
                empty_sections: 1,
            }
        );
        assert_eq!(
            bio.find_parent("2.1 Jobs").map(|s| s.title().to_string()),
            Some("2 Career".to_string())
        );
    }

    #[tokio::test]
    async fn save_bumps_version_and_writes_files() {
        let dir = TempDir::new().unwrap();
        let bio = biography(&dir).await;
        bio.add_section("1 A", "text").await.unwrap();
        assert_eq!(bio.save().await.unwrap(), 1);
        assert_eq!(bio.save().await.unwrap(), 2);
        assert_eq!(bio.list_versions().await.unwrap(), vec![1, 2]);
        assert!(dir.path().join("ada").join("biography_2.md").exists());

        let reopened = biography(&dir).await;
        assert_eq!(reopened.version(), 2);
    }

    #[tokio::test]
    async fn get_section_by_path_rejects_malformed_paths() {
        let dir = TempDir::new().unwrap();
        let bio = biography(&dir).await;
        bio.add_section("1 A", "").await.unwrap();
        assert!(matches!(
            bio.get_section_by_path("1 A/2.1 Wrong Parent"),
            Err(BiographyError::InvalidPath(PathError::ParentMismatch { .. }))
        ));
        assert!(matches!(
            bio.get_section_by_path("A"),
            Err(BiographyError::InvalidPath(_))
        ));
        assert!(bio.get_section_by_path("1 A/1.1 Missing").unwrap().is_none());
    }

    #[tokio::test]
    async fn unsaved_changes_track_saves() {
        let dir = TempDir::new().unwrap();
        let bio = biography(&dir).await;
        assert!(bio.has_unsaved_changes());
        bio.add_section("1 A", "text").await.unwrap();
        bio.save().await.unwrap();
        assert!(!bio.has_unsaved_changes());

        // Rejected and no-op calls leave the flag alone.
        assert!(bio.add_section("1 B", "").await.is_err());
        assert!(!bio.delete_section(SectionLocator::path("2 Z")).await.unwrap());
        assert!(!bio.has_unsaved_changes());

        bio.update_section(SectionLocator::path("1 A"), SectionUpdate::retitle("1 Alpha"))
            .await
            .unwrap();
        assert!(bio.has_unsaved_changes());
    }

    #[tokio::test]
    async fn load_missing_version() {
        let dir = TempDir::new().unwrap();
        let config = BiographyConfig::new("ada", dir.path());
        let result = Biography::load_from_file(config, Some(4)).await;
        assert!(matches!(result, Err(BiographyError::VersionNotFound { version: 4, .. })));
    }
}
