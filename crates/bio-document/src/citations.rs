//! Memory citation markers
//!
//! Content cites interview memories inline as `[MEM_<id>]`. The markers are
//! scraped into a section's `memory_ids` and hidden when rendering for a
//! reader.

use once_cell::sync::Lazy;
use regex::Regex;

static MEMORY_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(MEM_[^\[\]\s]+)\]").expect("memory marker pattern is valid"));

// Leading horizontal whitespace goes with the marker so "text [MEM_1]." reads "text.".
static MEMORY_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]*\[MEM_[^\[\]\s]+\]").expect("memory link pattern is valid"));

/// Unique memory ids cited in `content`, in order of first appearance.
///
/// Ids are returned without brackets: `"[MEM_42]"` yields `"MEM_42"`.
#[must_use]
pub fn extract_memory_ids(content: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for captures in MEMORY_MARKER.captures_iter(content) {
        let id = &captures[1];
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

/// Append ids cited in `content` that `known` does not hold yet.
///
/// Never removes anything. Returns how many ids were added.
pub fn merge_memory_ids(known: &mut Vec<String>, content: &str) -> usize {
    let before = known.len();
    for id in extract_memory_ids(content) {
        if !known.contains(&id) {
            known.push(id);
        }
    }
    known.len() - before
}

/// Remove every citation marker from `content`.
#[must_use]
pub fn strip_memory_links(content: &str) -> String {
    MEMORY_LINK.replace_all(content, "").into_owned()
}
