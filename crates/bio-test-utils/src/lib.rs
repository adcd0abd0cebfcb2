//! Testing utilities for the biographer workspace
//!
//! Shared fixtures, an in-memory snapshot store, and tree helpers.

#![allow(missing_docs)]

use async_trait::async_trait;
use bio_document::{Biography, BiographyConfig, Section, SnapshotStore, StoreError};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const TEST_USER: &str = "test_user";

/// A realistic tree, listed parent-first
pub const SAMPLE_SECTIONS: &[(&str, &str)] = &[
    ("1 Early Life", "Born in Leeds in 1950 [MEM_1]."),
    ("1 Early Life/1.1 Childhood", "Spent summers by the sea [MEM_2] [MEM_3]."),
    ("1 Early Life/1.2 School", "Top of the class in maths [MEM_4]."),
    ("2 Career", ""),
    ("2 Career/2.1 First Job", "Started as a clerk [MEM_5]."),
    ("2 Career/2.1 First Job/2.1.1 The Interview", "Nearly missed the train [MEM_6]."),
    ("3 Family", "Married in 1975 [MEM_7]."),
];

/// Biography on the filesystem inside a temporary directory
///
/// The directory lives as long as this value.
pub struct TempBiography {
    pub biography: Arc<Biography>,
    pub dir: TempDir,
}

impl TempBiography {
    /// Config pointing at the same directory, e.g. to reload
    pub fn config(&self) -> BiographyConfig {
        self.biography.config().clone()
    }
}

pub fn temp_config(dir: &TempDir) -> BiographyConfig {
    BiographyConfig::new(TEST_USER, dir.path())
}

pub async fn temp_biography() -> TempBiography {
    temp_biography_with(|config| config).await
}

/// Temporary biography with a customized config
pub async fn temp_biography_with(
    customize: impl FnOnce(BiographyConfig) -> BiographyConfig,
) -> TempBiography {
    let dir = TempDir::new().unwrap();
    let config = customize(temp_config(&dir));
    let biography = Arc::new(Biography::open(config).await.unwrap());
    TempBiography { biography, dir }
}

/// Biography backed by a fresh [`MemoryStore`]
pub async fn memory_biography(config: BiographyConfig) -> (Arc<Biography>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let biography = Biography::open_with_store(config, store.clone())
        .await
        .unwrap();
    (Arc::new(biography), store)
}

/// Add every entry of [`SAMPLE_SECTIONS`]
pub async fn populate_sample(biography: &Biography) {
    for (path, content) in SAMPLE_SECTIONS {
        biography.add_section(path, content).await.unwrap();
    }
}

/// Titles of a subtree in pre-order, with depth
pub fn titles_with_depth(root: &Section) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    root.visit(&mut |section, depth| out.push((depth, section.title().to_string())));
    out
}

/// In-memory snapshot store
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: Mutex<HashMap<String, BTreeMap<u64, Section>>>,
    markdown: Mutex<HashMap<(String, u64), String>>,
    drafts: Mutex<HashMap<(String, u64), String>>,
    fail_writes: AtomicBool,
    write_delay_ms: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following write fail with an I/O error
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Sleep this long inside every snapshot write, to hold a save open
    pub fn delay_writes(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.write_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Seed a snapshot without going through a biography
    pub fn insert(&self, user_id: &str, version: u64, root: Section) {
        self.snapshots
            .lock()
            .entry(user_id.to_string())
            .or_default()
            .insert(version, root);
    }

    pub fn markdown(&self, user_id: &str, version: u64) -> Option<String> {
        self.markdown
            .lock()
            .get(&(user_id.to_string(), version))
            .cloned()
    }

    pub fn draft_markdown(&self, user_id: &str, base_version: u64) -> Option<String> {
        self.drafts
            .lock()
            .get(&(user_id.to_string(), base_version))
            .cloned()
    }

    fn check_writable(&self, user_id: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::io_error(
                user_id,
                io::Error::new(io::ErrorKind::Other, "writes disabled"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn list_versions(&self, user_id: &str) -> Result<Vec<u64>, StoreError> {
        Ok(self
            .snapshots
            .lock()
            .get(user_id)
            .map(|versions| versions.keys().copied().collect())
            .unwrap_or_default())
    }

    async fn read(&self, user_id: &str, version: u64) -> Result<Option<Section>, StoreError> {
        Ok(self
            .snapshots
            .lock()
            .get(user_id)
            .and_then(|versions| versions.get(&version))
            .cloned())
    }

    async fn write(&self, user_id: &str, version: u64, root: &Section) -> Result<(), StoreError> {
        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.check_writable(user_id)?;
        self.insert(user_id, version, root.clone());
        Ok(())
    }

    async fn write_markdown(
        &self,
        user_id: &str,
        version: u64,
        markdown: &str,
    ) -> Result<(), StoreError> {
        self.check_writable(user_id)?;
        self.markdown
            .lock()
            .insert((user_id.to_string(), version), markdown.to_string());
        Ok(())
    }

    async fn write_draft_markdown(
        &self,
        user_id: &str,
        base_version: u64,
        markdown: &str,
    ) -> Result<(), StoreError> {
        self.check_writable(user_id)?;
        self.drafts
            .lock()
            .insert((user_id.to_string(), base_version), markdown.to_string());
        Ok(())
    }
}
