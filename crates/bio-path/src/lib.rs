//! Biographer section paths
//!
//! Numbered, hierarchical section addressing for biography documents.
//!
//! # Core Concepts
//!
//! - [`SectionPath`]: validated `/`-separated list of section titles
//! - [`is_valid_path_format`]: structural check of a raw path string
//! - [`sort_key`] / [`compare_titles`]: sibling ordering from title numerals
//!
//! # Example
//!
//! ```rust
//! use bio_path::{is_valid_path_format, sort_key, SectionPath};
//!
//! assert!(is_valid_path_format("1 Early Life/1.1 Childhood"));
//! assert!(!is_valid_path_format("1 Early Life/2.1 Career"));
//!
//! let path: SectionPath = "2 Career/2.1 Jobs".parse().unwrap();
//! assert_eq!(path.last(), Some("2.1 Jobs"));
//! assert_eq!(sort_key("2.1 Jobs"), vec![2, 1]);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod grammar;
mod path;

pub use grammar::{
    compare_titles, format_number, is_valid_path_format, sort_key, title_number,
    validate_title_at_depth,
};
pub use path::{PathError, SectionPath, MAX_DEPTH, SEPARATOR};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
