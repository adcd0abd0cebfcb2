//! Section numbering grammar
//!
//! Titles carry their own position: `"1 Early Life"`, `"1.2 Youth"`,
//! `"1.2.3 First Bike"`. Sibling order and nesting depth are both recovered
//! from that leading numeral, so nothing else has to be stored.

use std::cmp::Ordering;

use crate::path::{PathError, SectionPath, MAX_DEPTH, SEPARATOR};

/// Check a path string against the numbering grammar.
///
/// Purely structural: says nothing about whether the sections exist.
/// The empty path (root) is always valid.
#[inline]
#[must_use]
pub fn is_valid_path_format(path: &str) -> bool {
    path.parse::<SectionPath>().is_ok()
}

/// Leading dot-separated integers of a title, used to order siblings.
///
/// Lenient on purpose: `"2.1 Jobs"` gives `[2, 1]`, `"Preface"` gives `[]`.
#[must_use]
pub fn sort_key(title: &str) -> Vec<u32> {
    let numeral = title.split_whitespace().next().unwrap_or("");
    numeral.split('.').map_while(parse_component).collect()
}

fn parse_component(part: &str) -> Option<u32> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        None
    } else {
        part.parse::<u32>().ok()
    }
}

/// Total order for sibling titles.
///
/// Numbered titles come first, by numeral; unnumbered titles follow.
/// Ties fall back to the title text so the order is deterministic.
#[must_use]
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    let (ka, kb) = (sort_key(a), sort_key(b));
    match (ka.is_empty(), kb.is_empty()) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        _ => ka.cmp(&kb).then_with(|| a.cmp(b)),
    }
}

/// Parse the strict `<n>[.<m>[.<k>]] <label>` form of a title.
///
/// Returns `None` unless the numeral is followed by a single space and a
/// non-blank label.
#[must_use]
pub fn title_number(title: &str) -> Option<Vec<u32>> {
    let (numeral, label) = title.split_once(' ')?;
    if label.trim().is_empty() || label.starts_with(' ') {
        return None;
    }
    numeral.split('.').map(parse_component).collect()
}

/// Validate a single title at `depth` (1-based) below `parent_number`.
///
/// `parent_number` is `None` for top-level sections.
///
/// # Errors
/// Returns the first grammar rule the title breaks.
pub fn validate_title_at_depth(
    title: &str,
    depth: usize,
    parent_number: Option<&[u32]>,
) -> Result<Vec<u32>, PathError> {
    if depth == 0 || depth > MAX_DEPTH {
        return Err(PathError::TooDeep {
            depth,
            max: MAX_DEPTH,
        });
    }
    if title.trim().is_empty() {
        return Err(PathError::EmptySegment);
    }
    if title.contains(SEPARATOR) {
        return Err(PathError::SeparatorInTitle(title.to_string()));
    }

    let number =
        title_number(title).ok_or_else(|| PathError::MissingNumber(title.to_string()))?;

    if number.len() != depth {
        return Err(PathError::WrongDepth {
            segment: title.to_string(),
            expected: depth,
        });
    }
    if number.contains(&0) {
        return Err(PathError::ZeroComponent(title.to_string()));
    }
    let expected_prefix = parent_number.unwrap_or(&[]);
    if number[..depth - 1] != *expected_prefix {
        return Err(PathError::ParentMismatch {
            segment: title.to_string(),
            parent: format_number(expected_prefix),
        });
    }

    Ok(number)
}

/// Render a numeral as `1.2.3`.
#[must_use]
pub fn format_number(number: &[u32]) -> String {
    number
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}
