//! Appending dictated text to a field.

use tracing::debug;

use formscribe_page::{ElementId, Page, read_text, write_text};

/// Append `transcript` to the field, separated from existing text by a blank
/// line. A blank transcript leaves the field untouched and returns `false`.
pub fn append_transcript(page: &mut Page, el: ElementId, transcript: &str) -> bool {
    let transcript = transcript.trim();
    if transcript.is_empty() {
        debug!("blank transcript ignored");
        return false;
    }

    let current = read_text(page, el);
    let updated = if current.is_empty() {
        transcript.to_string()
    } else {
        format!("{current}\n\n{transcript}")
    };
    write_text(page, el, &updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
<textarea id="filled">First thought</textarea>
<div id="empty" contenteditable="true"></div>
</body></html>"#;

    #[test]
    fn appends_after_blank_line() {
        let mut page = Page::parse(PAGE);
        let el = page.element_by_id("filled").unwrap();
        assert!(append_transcript(&mut page, el, " second thought "));
        assert_eq!(read_text(&page, el), "First thought\n\nsecond thought");
    }

    #[test]
    fn empty_field_takes_transcript_alone() {
        let mut page = Page::parse(PAGE);
        let el = page.element_by_id("empty").unwrap();
        assert!(append_transcript(&mut page, el, "hello"));
        assert_eq!(read_text(&page, el), "hello");
    }

    #[test]
    fn blank_transcript_is_ignored() {
        let mut page = Page::parse(PAGE);
        let el = page.element_by_id("filled").unwrap();
        assert!(!append_transcript(&mut page, el, "  \n "));
        assert!(page.events().is_empty());
    }
}
