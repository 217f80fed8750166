//! Reading and writing field text across element kinds.
//!
//! Fields come in three shapes: value-bearing controls (`input`, `textarea`,
//! `select`), rich-text regions (contenteditable or `role="textbox"`), and
//! wrappers whose editable part is a descendant. Reads and writes of a wrapper
//! both go to that descendant. Writes emit the same notification events a
//! browser would so host frameworks pick up the change.

use tracing::{debug, warn};

use formscribe_shared::Result;

use crate::document::{ElementId, FieldEventKind, Page, markup_to_text};

/// Selector for an editable region nested inside a wrapper.
const NESTED_RICH_TEXT: &str = r#"[contenteditable="true"], [contenteditable=""], [role="textbox"]"#;

/// Selector for a plain control nested inside a wrapper.
const NESTED_CONTROL: &str = "input, textarea, select";

/// Read the field's text, trimmed.
pub fn read_text(page: &Page, el: ElementId) -> String {
    if let Some(value) = page.value(el) {
        return value.trim().to_string();
    }

    if !page.is_rich_text(el) {
        if let Some(nested) = nested_editable(page, el) {
            return read_text(page, nested);
        }
    }

    let text = page.text_content(el);
    if !text.trim().is_empty() {
        return text.trim().to_string();
    }

    let markup = page.inner_html(el);
    if markup.is_empty() {
        return String::new();
    }
    markup_to_text(&markup).trim().to_string()
}

/// Write `content` into the field. Returns `false` when no write path applies
/// or the mutation fails; never propagates the failure.
pub fn write_text(page: &mut Page, el: ElementId, content: &str) -> bool {
    match try_write(page, el, content) {
        Ok(written) => written,
        Err(e) => {
            warn!(element = %page.describe(el), error = %e, "field write failed");
            false
        }
    }
}

fn try_write(page: &mut Page, el: ElementId, content: &str) -> Result<bool> {
    if page.has_value(el) {
        page.set_value(el, content)?;
        page.dispatch(el, FieldEventKind::Input);
        page.dispatch(el, FieldEventKind::Change);
        return Ok(true);
    }

    if page.is_rich_text(el) {
        page.set_inner_html(el, &to_markup(content))?;
        page.dispatch(el, FieldEventKind::Input);
        return Ok(true);
    }

    // A wrapper around an editor must not have its children replaced.
    if let Some(nested) = nested_editable(page, el) {
        debug!(wrapper = %page.describe(el), target = %page.describe(nested), "writing into nested editable");
        return try_write(page, nested, content);
    }

    if page.accepts_markup(el) {
        page.set_inner_html(el, &to_markup(content))?;
        return Ok(true);
    }

    Ok(false)
}

fn nested_editable(page: &Page, el: ElementId) -> Option<ElementId> {
    page.select_within(el, NESTED_RICH_TEXT)
        .or_else(|| page.select_within(el, NESTED_CONTROL))
}

/// Newlines become `<br>`; markup-significant characters are escaped.
fn to_markup(content: &str) -> String {
    content
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\n', "<br>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::FieldEvent;

    const FIELDS: &str = r#"<html><body>
  <textarea id="plain">  keep me  </textarea>
  <input id="single" value=" v ">
  <div id="rich" role="textbox"><p>rich <i>text</i></p></div>
  <div id="wrapper" data-test-id="issue.views.field.rich-text.description">
    <div class="toolbar">B I U</div>
    <div class="ProseMirror" contenteditable="true"><p>inner</p></div>
  </div>
  <div id="wrapped-input"><span>Label</span><input id="deep"></div>
  <div id="bare"></div>
  <img id="picture" src="x.png">
</body></html>"#;

    #[test]
    fn read_prefers_value_then_text() {
        let page = Page::parse(FIELDS);
        let plain = page.element_by_id("plain").unwrap();
        let single = page.element_by_id("single").unwrap();
        let rich = page.element_by_id("rich").unwrap();
        let bare = page.element_by_id("bare").unwrap();
        assert_eq!(read_text(&page, plain), "keep me");
        assert_eq!(read_text(&page, single), "v");
        assert_eq!(read_text(&page, rich), "rich text");
        assert_eq!(read_text(&page, bare), "");
    }

    #[test]
    fn write_value_emits_input_and_change() {
        let mut page = Page::parse(FIELDS);
        let plain = page.element_by_id("plain").unwrap();
        assert!(write_text(&mut page, plain, "line 1\nline 2"));
        assert_eq!(page.value(plain).as_deref(), Some("line 1\nline 2"));
        assert_eq!(
            page.events(),
            &[
                FieldEvent { target: plain, kind: FieldEventKind::Input },
                FieldEvent { target: plain, kind: FieldEventKind::Change },
            ]
        );
    }

    #[test]
    fn write_rich_text_converts_newlines() {
        let mut page = Page::parse(FIELDS);
        let rich = page.element_by_id("rich").unwrap();
        assert!(write_text(&mut page, rich, "a < b\nc"));
        assert_eq!(page.inner_html(rich), "a &lt; b<br>c");
        assert_eq!(read_text(&page, rich), "a < b\nc");
        assert_eq!(page.events().len(), 1);
        assert_eq!(page.events()[0].kind, FieldEventKind::Input);
    }

    #[test]
    fn wrapper_writes_into_nested_editor() {
        let mut page = Page::parse(FIELDS);
        let wrapper = page.element_by_id("wrapper").unwrap();
        assert!(write_text(&mut page, wrapper, "new body"));

        let editor = page.select_first(".ProseMirror").unwrap();
        assert_eq!(page.inner_html(editor), "new body");
        assert!(page.select_first(".toolbar").is_some());
        assert_eq!(page.events()[0].target, editor);
        assert_eq!(read_text(&page, wrapper), "new body");
    }

    #[test]
    fn wrapper_reads_skip_chrome() {
        let page = Page::parse(FIELDS);
        let wrapper = page.element_by_id("wrapper").unwrap();
        assert_eq!(read_text(&page, wrapper), "inner");
    }

    #[test]
    fn appending_through_wrapper_keeps_only_editor_text() {
        let mut page = Page::parse(FIELDS);
        let wrapper = page.element_by_id("wrapper").unwrap();
        let appended = format!("{}\n\nmore", read_text(&page, wrapper));
        assert!(write_text(&mut page, wrapper, &appended));
        assert_eq!(read_text(&page, wrapper), "inner\n\nmore");
        assert_eq!(page.text_content(wrapper).matches("B I U").count(), 1);
    }

    #[test]
    fn select_takes_matching_option() {
        let mut page = Page::parse(
            r#"<html><body><select id="priority">
              <option value="a">Low</option>
              <option value="b" selected>Medium</option>
              <option>High</option>
            </select></body></html>"#,
        );
        let select = page.element_by_id("priority").unwrap();
        assert_eq!(read_text(&page, select), "b");

        assert!(write_text(&mut page, select, "High"));
        assert_eq!(read_text(&page, select), "High");
        assert_eq!(page.select_all("#priority option").len(), 3);
        let kinds: Vec<_> = page.events().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![FieldEventKind::Input, FieldEventKind::Change]);

        assert!(!write_text(&mut page, select, "Urgent"));
        assert_eq!(read_text(&page, select), "High");
        assert_eq!(page.events().len(), 2);
    }

    #[test]
    fn wrapper_writes_into_nested_input() {
        let mut page = Page::parse(FIELDS);
        let wrapper = page.element_by_id("wrapped-input").unwrap();
        assert!(write_text(&mut page, wrapper, "deep value"));
        let deep = page.element_by_id("deep").unwrap();
        assert_eq!(page.value(deep).as_deref(), Some("deep value"));
    }

    #[test]
    fn plain_container_takes_markup_without_events() {
        let mut page = Page::parse(FIELDS);
        let bare = page.element_by_id("bare").unwrap();
        assert!(write_text(&mut page, bare, "x\ny"));
        assert_eq!(page.inner_html(bare), "x<br>y");
        assert!(page.events().is_empty());
    }

    #[test]
    fn unwritable_targets_return_false() {
        let mut page = Page::parse(FIELDS);
        let picture = page.element_by_id("picture").unwrap();
        assert!(!write_text(&mut page, picture, "nope"));

        let plain = page.element_by_id("plain").unwrap();
        page.remove(plain);
        assert!(!write_text(&mut page, plain, "gone"));
    }
}
