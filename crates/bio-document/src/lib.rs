//! Biographer document model
//!
//! A user's biography is a tree of numbered sections, edited concurrently by
//! several agent tasks and saved as versioned snapshots.
//!
//! # Core Concepts
//!
//! - [`Biography`]: the shared document; mutations, queries, export, save
//! - [`Section`]: one node of the tree with content and cited memory ids
//! - [`SectionLocator`]: path and/or title naming a section
//! - [`AccessGate`]: reader/writer coordination behind every operation
//! - [`SnapshotStore`]: versioned persistence, [`FsSnapshotStore`] on disk
//!
//! # Example
//!
//! ```rust,no_run
//! use bio_document::{Biography, BiographyConfig, SectionLocator};
//!
//! # async fn example() -> Result<(), bio_document::BiographyError> {
//! let bio = Biography::open(BiographyConfig::new("ada", "data/biographies")).await?;
//! bio.add_section("1 Early Life/1.1 Childhood", "Grew up in London [MEM_3].")
//!     .await?;
//!
//! let section = bio.get_section(&SectionLocator::path("1 Early Life/1.1 Childhood"), true)?;
//! assert_eq!(section.map(|s| s.content().to_string()), Some("Grew up in London.".into()));
//!
//! let version = bio.save().await?;
//! println!("saved version {version}");
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod biography;
pub mod citations;
pub mod config;
pub mod error;
pub mod gate;
pub mod locator;
pub mod markdown;
pub mod section;
pub mod store;

pub use biography::{root_title_for, Biography, BiographyStats, SectionUpdate};
pub use citations::{extract_memory_ids, merge_memory_ids, strip_memory_links};
pub use config::BiographyConfig;
pub use error::{BiographyError, ConfigError, StoreError};
pub use gate::{AccessGate, ReadGuard, WriteGuard};
pub use locator::SectionLocator;
pub use markdown::render_markdown;
pub use section::{Section, SectionOutline};
pub use store::{FsSnapshotStore, SnapshotStore};

pub use bio_path::{is_valid_path_format, PathError, SectionPath};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with biographies
    pub use crate::{
        Biography, BiographyConfig, BiographyError, Section, SectionLocator, SectionUpdate,
        SnapshotStore,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
