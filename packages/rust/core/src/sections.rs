//! Splitting plain-text results into titled sections.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use formscribe_shared::{SectionKey, SectionValue, StructuredContent};

/// One `## Title` block of plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSection {
    pub title: String,
    pub body: String,
}

/// Split `text` at level-two-or-deeper headings. Each body runs to the next
/// heading or the end of the text. Blocks with an empty title or body are
/// dropped, as is any text before the first heading.
pub fn split_sections(text: &str) -> Vec<TextSection> {
    static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^#{2,}[ \t]+(.+?)[ \t]*$").expect("valid regex")
    });

    let headings: Vec<_> = HEADING_RE.captures_iter(text).collect();
    let mut sections = Vec::with_capacity(headings.len());

    for (i, caps) in headings.iter().enumerate() {
        let (Some(whole), Some(title)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let body_end = headings
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(text.len(), |m| m.start());
        let title = title.as_str().trim();
        let body = text[whole.end()..body_end].trim();
        if title.is_empty() || body.is_empty() {
            continue;
        }
        sections.push(TextSection {
            title: title.to_string(),
            body: body.to_string(),
        });
    }
    sections
}

/// Map recognized titles onto content sections. Unrecognized titles are
/// skipped; a repeated title keeps its last body.
pub fn sections_to_content(sections: &[TextSection]) -> StructuredContent {
    let mut content = StructuredContent::new();
    for section in sections {
        match SectionKey::from_title(&section.title) {
            Some(key) => content.insert(key, SectionValue::Text(section.body.clone())),
            None => debug!(title = %section.title, "unrecognized section title"),
        }
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_at_headings() {
        let sections = split_sections("## Acceptance Criteria\nDo X\n\n## Test Cases\nTest Y");
        assert_eq!(
            sections,
            vec![
                TextSection { title: "Acceptance Criteria".into(), body: "Do X".into() },
                TextSection { title: "Test Cases".into(), body: "Test Y".into() },
            ]
        );
    }

    #[test]
    fn preamble_and_empty_sections_are_dropped() {
        let sections = split_sections("Intro text\n## Empty\n\n### Estimation \n 2 days \n");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "Estimation");
        assert_eq!(sections[0].body, "2 days");
    }

    #[test]
    fn single_hash_is_not_a_section() {
        assert!(split_sections("# Title\nbody").is_empty());
        assert!(split_sections("no headings at all").is_empty());
    }

    #[test]
    fn titles_map_case_insensitively() {
        let sections = split_sections("## RISKS/CONSTRAINTS\nBudget\n## Notes\nignored");
        let content = sections_to_content(&sections);
        assert_eq!(content.len(), 1);
        assert_eq!(
            content.get(SectionKey::RisksConstraints),
            Some(&SectionValue::Text("Budget".into()))
        );
    }
}
