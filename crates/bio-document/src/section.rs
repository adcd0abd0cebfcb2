//! Section tree
//!
//! A [`Section`] owns its children, keyed by title. Children are kept in
//! numeral order (see [`bio_path::compare_titles`]) after every insertion or
//! rename, so iteration order is display order. There is no parent pointer:
//! parents are found by searching from the root.

use crate::citations::{merge_memory_ids, strip_memory_links};
use bio_path::{compare_titles, title_number, MAX_DEPTH};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use uuid::Uuid;

/// A node in the biography tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    id: Uuid,
    title: String,
    #[serde(default)]
    content: String,
    created_at: DateTime<Utc>,
    last_edit: DateTime<Utc>,
    #[serde(default)]
    memory_ids: Vec<String>,
    #[serde(default)]
    subsections: IndexMap<String, Section>,
}

impl Section {
    /// Create a section, scraping citation ids from `content`
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let now = Utc::now();
        let mut memory_ids = Vec::new();
        merge_memory_ids(&mut memory_ids, &content);
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            content,
            created_at: now,
            last_edit: now,
            memory_ids,
            subsections: IndexMap::new(),
        }
    }

    /// Stable identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Title (also the key in the parent's child map)
    #[inline]
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Text content, citation markers included
    #[inline]
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[inline]
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    #[must_use]
    pub fn last_edit(&self) -> DateTime<Utc> {
        self.last_edit
    }

    /// Every memory id this section has ever cited
    #[inline]
    #[must_use]
    pub fn memory_ids(&self) -> &[String] {
        &self.memory_ids
    }

    /// Children in display order
    #[inline]
    #[must_use]
    pub fn subsections(&self) -> &IndexMap<String, Section> {
        &self.subsections
    }

    /// Child by title
    #[inline]
    #[must_use]
    pub fn child(&self, title: &str) -> Option<&Section> {
        self.subsections.get(title)
    }

    /// Titles of the children in display order
    pub fn child_titles(&self) -> impl Iterator<Item = &str> {
        self.subsections.keys().map(String::as_str)
    }

    /// Replace content, refresh `last_edit`, and record newly cited ids.
    ///
    /// Ids that disappear from the content stay recorded.
    pub(crate) fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.last_edit = Utc::now();
        merge_memory_ids(&mut self.memory_ids, &self.content);
    }

    /// Change the title field only. Re-keying is the parent's job.
    pub(crate) fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Insert `child` under its title and restore display order.
    pub(crate) fn insert_child(&mut self, child: Section) {
        self.subsections.insert(child.title.clone(), child);
        self.sort_children();
    }

    /// Re-key child `old` as `new`, keeping its subtree intact.
    ///
    /// Returns `false` if there is no child titled `old`.
    pub(crate) fn rename_child(&mut self, old: &str, new: &str) -> bool {
        let Some(mut child) = self.subsections.shift_remove(old) else {
            return false;
        };
        child.set_title(new);
        self.insert_child(child);
        true
    }

    /// Remove child `title` together with its subtree.
    pub(crate) fn remove_child(&mut self, title: &str) -> Option<Section> {
        self.subsections.shift_remove(title)
    }

    pub(crate) fn sort_children(&mut self) {
        self.subsections
            .sort_by(|a, _, b, _| compare_titles(a, b));
    }

    pub(crate) fn child_mut(&mut self, title: &str) -> Option<&mut Section> {
        self.subsections.get_mut(title)
    }

    /// Walk child maps segment by segment.
    #[must_use]
    pub fn find_by_path<S: AsRef<str>>(&self, segments: &[S]) -> Option<&Section> {
        segments
            .iter()
            .try_fold(self, |node, segment| node.child(segment.as_ref()))
    }

    pub(crate) fn find_by_path_mut<S: AsRef<str>>(
        &mut self,
        segments: &[S],
    ) -> Option<&mut Section> {
        let mut node = self;
        for segment in segments {
            node = node.child_mut(segment.as_ref())?;
        }
        Some(node)
    }

    /// Depth-first search by exact title, this section included.
    ///
    /// Pre-order, children in display order; the first match wins.
    #[must_use]
    pub fn find_by_title(&self, title: &str) -> Option<&Section> {
        if self.title == title {
            return Some(self);
        }
        self.subsections
            .values()
            .find_map(|child| child.find_by_title(title))
    }

    /// Path segments from this section to the section
    /// [`find_by_title`](Self::find_by_title) would return.
    ///
    /// `Some(vec![])` means this section itself matches.
    #[must_use]
    pub fn path_of(&self, title: &str) -> Option<Vec<String>> {
        if self.title == title {
            return Some(Vec::new());
        }
        self.subsections.iter().find_map(|(key, child)| {
            child.path_of(title).map(|mut rest| {
                rest.insert(0, key.clone());
                rest
            })
        })
    }

    /// The section whose child map holds the first match for `title`.
    ///
    /// `None` if `title` names this section or is not in the tree.
    #[must_use]
    pub fn find_parent(&self, title: &str) -> Option<&Section> {
        let path = self.path_of(title)?;
        let (_, parent) = path.split_last()?;
        self.find_by_path(parent)
    }

    /// Pre-order visit with depth (this section is depth 0).
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Section, usize)) {
        self.visit_at(0, f);
    }

    fn visit_at<'a>(&'a self, depth: usize, f: &mut impl FnMut(&'a Section, usize)) {
        f(self, depth);
        for child in self.subsections.values() {
            child.visit_at(depth + 1, f);
        }
    }

    /// Copy of this subtree with citation markers removed from all content.
    ///
    /// A view for readers; `memory_ids` are kept.
    #[must_use]
    pub fn without_memory_links(&self) -> Section {
        let mut view = self.clone();
        view.strip_links_in_place();
        view
    }

    fn strip_links_in_place(&mut self) {
        self.content = strip_memory_links(&self.content);
        for child in self.subsections.values_mut() {
            child.strip_links_in_place();
        }
    }

    /// Restore display order of a deserialized tree and check its shape.
    ///
    /// Every child must be stored under its own title, with a numeral of as
    /// many parts as its depth. The numeral is not checked against the
    /// parent's, since a renamed section keeps its children's titles.
    ///
    /// # Errors
    /// A description of the first offending section.
    pub(crate) fn normalize_loaded(&mut self) -> Result<(), String> {
        self.normalize_at(0)
    }

    fn normalize_at(&mut self, depth: usize) -> Result<(), String> {
        let child_depth = depth + 1;
        for (key, child) in &mut self.subsections {
            if *key != child.title {
                return Err(format!(
                    "child key '{key}' does not match its title '{}'",
                    child.title
                ));
            }
            let well_formed = child_depth <= MAX_DEPTH
                && title_number(key)
                    .is_some_and(|number| number.len() == child_depth && !number.contains(&0));
            if !well_formed {
                return Err(format!(
                    "'{key}' is not a valid section title at depth {child_depth}"
                ));
            }
            child.normalize_at(child_depth)?;
        }
        self.sort_children();
        Ok(())
    }

    /// Title-only tree
    #[must_use]
    pub fn outline(&self) -> SectionOutline {
        SectionOutline {
            title: self.title.clone(),
            subsections: self.subsections.values().map(Section::outline).collect(),
        }
    }
}

/// Title-only view of a section tree, used when prompting agents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionOutline {
    /// Section title
    pub title: String,
    /// Children in display order
    pub subsections: Vec<SectionOutline>,
}

impl SectionOutline {
    fn fmt_at(&self, f: &mut Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{}{}", "  ".repeat(depth), self.title)?;
        for child in &self.subsections {
            child.fmt_at(f, depth + 1)?;
        }
        Ok(())
    }
}

impl Display for SectionOutline {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.fmt_at(f, 0)
    }
}
