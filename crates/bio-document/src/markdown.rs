//! Markdown rendering of a section tree

use crate::citations::strip_memory_links;
use crate::section::Section;

/// Render `root` and its subtree as markdown.
///
/// Heading level is depth + 1 (the root is `#`). Each heading is followed by
/// the section's content, then its children in display order.
#[must_use]
pub fn render_markdown(root: &Section, hide_memory_links: bool) -> String {
    let mut blocks: Vec<String> = Vec::new();
    root.visit(&mut |section, depth| {
        blocks.push(format!("{} {}", "#".repeat(depth + 1), section.title()));
        let content = if hide_memory_links {
            strip_memory_links(section.content())
        } else {
            section.content().to_string()
        };
        let content = content.trim();
        if !content.is_empty() {
            blocks.push(content.to_string());
        }
    });
    let mut markdown = blocks.join("\n\n");
    markdown.push('\n');
    markdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_headings_by_depth() {
        let mut root = Section::new("Biography of ada", "");
        let mut early = Section::new("1 Early Life", "bio text [MEM_1]");
        early.insert_child(Section::new("1.1 Childhood", "more"));
        root.insert_child(early);
        root.insert_child(Section::new("2 Career", ""));

        assert_eq!(
            render_markdown(&root, true),
            "# Biography of ada\n\n## 1 Early Life\n\nbio text\n\n### 1.1 Childhood\n\nmore\n\n## 2 Career\n"
        );
    }

    #[test]
    fn keeps_links_on_request() {
        let mut root = Section::new("Biography of ada", "");
        root.insert_child(Section::new("1 Early Life", "bio text [MEM_1]"));
        let markdown = render_markdown(&root, false);
        assert!(markdown.contains("bio text [MEM_1]"));
    }
}
