//! Live page model built from HTML.
//!
//! The markup is parsed once with `scraper`. Element structure is flattened
//! into an arena indexed in document order, so an [`ElementId`] stays valid
//! for the life of the page. Mutable state sits on top of the parsed tree:
//! form-control values, replaced inner markup, detached subtrees, and a log
//! of the notification events emitted by writes.

use std::collections::{HashMap, HashSet};

use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use formscribe_shared::{FormscribeError, Result};

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose text children are serialized verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Handle to an element, stable for the life of its [`Page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(usize);

impl ElementId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Kind of notification emitted after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEventKind {
    /// Content changed (`input`).
    Input,
    /// Value committed (`change`).
    Change,
}

/// A notification observed by the host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldEvent {
    pub target: ElementId,
    pub kind: FieldEventKind,
}

#[derive(Debug, Clone)]
enum Child {
    Text(String),
    Element(ElementId),
}

#[derive(Debug, Clone)]
struct ElementNode {
    tag: String,
    attrs: Vec<(String, String)>,
    parent: Option<ElementId>,
    children: Vec<Child>,
    /// One past the index of the last descendant.
    subtree_end: usize,
}

#[derive(Debug, Clone)]
enum Overlay {
    Value(String),
    Markup(String),
}

/// A parsed page plus its live state.
pub struct Page {
    html: Html,
    nodes: Vec<ElementNode>,
    overlays: HashMap<ElementId, Overlay>,
    removed: HashSet<ElementId>,
    events: Vec<FieldEvent>,
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("elements", &self.nodes.len())
            .field("overlays", &self.overlays.len())
            .field("removed", &self.removed.len())
            .field("events", &self.events.len())
            .finish()
    }
}

impl Page {
    /// Parse a full HTML document.
    pub fn parse(html: &str) -> Self {
        let html = Html::parse_document(html);
        let mut nodes = Vec::new();
        build_arena(html.root_element(), None, &mut nodes);
        debug!(elements = nodes.len(), "page parsed");
        Self {
            html,
            nodes,
            overlays: HashMap::new(),
            removed: HashSet::new(),
            events: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// All connected elements matching `selector`, in document order.
    /// An unparsable selector matches nothing.
    pub fn select_all(&self, selector: &str) -> Vec<ElementId> {
        let Some(selector) = parse_selector(selector) else {
            return Vec::new();
        };
        self.html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .enumerate()
            .filter(|(_, el)| selector.matches(el))
            .map(|(index, _)| ElementId(index))
            .filter(|id| self.is_connected(*id))
            .collect()
    }

    /// First connected element matching `selector`.
    pub fn select_first(&self, selector: &str) -> Option<ElementId> {
        self.select_all(selector).into_iter().next()
    }

    /// First connected descendant of `scope` (excluding `scope`) matching `selector`.
    pub fn select_within(&self, scope: ElementId, selector: &str) -> Option<ElementId> {
        let node = self.node(scope)?;
        let range = (scope.0 + 1)..node.subtree_end;
        self.select_all(selector)
            .into_iter()
            .find(|id| range.contains(&id.0))
    }

    /// Element whose `id` attribute equals `id`.
    pub fn element_by_id(&self, id: &str) -> Option<ElementId> {
        (0..self.nodes.len())
            .map(ElementId)
            .filter(|el| self.is_connected(*el))
            .find(|el| self.attr(*el, "id") == Some(id))
    }

    /// Whether `el` matches `selector`.
    pub fn matches(&self, el: ElementId, selector: &str) -> bool {
        self.select_all(selector).contains(&el)
    }

    /// `el` itself or its nearest ancestor matching `selector`.
    pub fn closest(&self, el: ElementId, selector: &str) -> Option<ElementId> {
        let hits: HashSet<ElementId> = self.select_all(selector).into_iter().collect();
        let mut current = Some(el);
        while let Some(id) = current {
            if hits.contains(&id) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    /// Connected element siblings following `el`, in order.
    pub fn next_element_siblings(&self, el: ElementId) -> Vec<ElementId> {
        let Some(parent) = self.parent(el) else {
            return Vec::new();
        };
        self.nodes[parent.0]
            .children
            .iter()
            .filter_map(|child| match child {
                Child::Element(id) => Some(*id),
                Child::Text(_) => None,
            })
            .skip_while(|id| *id != el)
            .skip(1)
            .filter(|id| self.is_connected(*id))
            .collect()
    }

    pub fn parent(&self, el: ElementId) -> Option<ElementId> {
        self.node(el)?.parent
    }

    /// Connected and not hidden under replaced markup.
    pub fn is_connected(&self, el: ElementId) -> bool {
        if self.node(el).is_none() || self.removed.contains(&el) {
            return false;
        }
        let mut current = self.nodes[el.0].parent;
        while let Some(id) = current {
            if self.removed.contains(&id) || matches!(self.overlays.get(&id), Some(Overlay::Markup(_)))
            {
                return false;
            }
            current = self.nodes[id.0].parent;
        }
        true
    }

    // -----------------------------------------------------------------------
    // Element properties
    // -----------------------------------------------------------------------

    /// Lower-case tag name.
    pub fn tag(&self, el: ElementId) -> Option<&str> {
        self.node(el).map(|n| n.tag.as_str())
    }

    pub fn attr(&self, el: ElementId, name: &str) -> Option<&str> {
        self.node(el)?
            .attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the element carries a form-control value (`input`, `textarea`, `select`).
    pub fn has_value(&self, el: ElementId) -> bool {
        matches!(self.tag(el), Some("input" | "textarea" | "select"))
    }

    /// Whether the element is a rich-text region (`role="textbox"` or contenteditable).
    pub fn is_rich_text(&self, el: ElementId) -> bool {
        if self
            .attr(el, "role")
            .is_some_and(|r| r.eq_ignore_ascii_case("textbox"))
        {
            return true;
        }
        self.attr(el, "contenteditable")
            .is_some_and(|v| v.is_empty() || v.eq_ignore_ascii_case("true"))
    }

    /// Whether the element can hold child markup.
    pub fn accepts_markup(&self, el: ElementId) -> bool {
        self.tag(el).is_some_and(|tag| !VOID_ELEMENTS.contains(&tag))
    }

    /// Current form-control value, or `None` for elements without one.
    pub fn value(&self, el: ElementId) -> Option<String> {
        if !self.has_value(el) {
            return None;
        }
        if let Some(Overlay::Value(value)) = self.overlays.get(&el) {
            return Some(value.clone());
        }
        match self.tag(el) {
            Some("textarea") => Some(self.original_text(el)),
            Some("select") => Some(
                self.selected_option(el)
                    .map(|option| self.option_value(option))
                    .unwrap_or_default(),
            ),
            _ => Some(self.attr(el, "value").unwrap_or_default().to_string()),
        }
    }

    /// Connected `option` descendants of a `select`, in order.
    pub fn options(&self, select: ElementId) -> Vec<ElementId> {
        let Some(node) = self.node(select) else {
            return Vec::new();
        };
        ((select.0 + 1)..node.subtree_end)
            .map(ElementId)
            .filter(|id| self.nodes[id.0].tag == "option" && self.is_connected(*id))
            .collect()
    }

    /// The option a `select` currently shows: the one matching an assigned
    /// value, else the first marked `selected`, else the first option.
    pub fn selected_option(&self, select: ElementId) -> Option<ElementId> {
        let options = self.options(select);
        if let Some(Overlay::Value(value)) = self.overlays.get(&select) {
            return options
                .into_iter()
                .find(|option| self.option_value(*option) == *value);
        }
        options
            .iter()
            .copied()
            .find(|option| self.attr(*option, "selected").is_some())
            .or_else(|| options.first().copied())
    }

    /// An option's `value` attribute, falling back to its trimmed text.
    fn option_value(&self, option: ElementId) -> String {
        match self.attr(option, "value") {
            Some(value) => value.to_string(),
            None => self.text_content(option).trim().to_string(),
        }
    }

    /// Text of the element and its connected descendants; `<br>` reads as a newline.
    pub fn text_content(&self, el: ElementId) -> String {
        let mut out = String::new();
        if self.node(el).is_some() {
            self.collect_text(el, &mut out);
        }
        out
    }

    /// Serialized children of the element.
    pub fn inner_html(&self, el: ElementId) -> String {
        let mut out = String::new();
        if self.node(el).is_some() {
            self.write_children(el, &mut out);
        }
        out
    }

    /// Short opening-tag summary, e.g. `<textarea id="description">`.
    pub fn describe(&self, el: ElementId) -> String {
        let Some(node) = self.node(el) else {
            return String::from("<?>");
        };
        let mut out = format!("<{}", node.tag);
        for (name, value) in &node.attrs {
            out.push_str(&format!(" {name}=\"{}\"", escape_attr(value)));
        }
        out.push('>');
        out
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Assign a form-control value.
    pub fn set_value(&mut self, el: ElementId, value: &str) -> Result<()> {
        self.ensure_connected(el)?;
        if !self.has_value(el) {
            return Err(FormscribeError::validation(format!(
                "{} has no settable value",
                self.describe(el)
            )));
        }
        if self
            .attr(el, "type")
            .is_some_and(|t| t.eq_ignore_ascii_case("file"))
        {
            return Err(FormscribeError::validation(
                "file inputs only accept an empty value",
            ));
        }
        if self.tag(el) == Some("select")
            && !self
                .options(el)
                .into_iter()
                .any(|option| self.option_value(option) == value)
        {
            return Err(FormscribeError::validation(format!(
                "{} has no option {value:?}",
                self.describe(el)
            )));
        }
        self.overlays.insert(el, Overlay::Value(value.to_string()));
        Ok(())
    }

    /// Replace the element's children with `markup`.
    pub fn set_inner_html(&mut self, el: ElementId, markup: &str) -> Result<()> {
        self.ensure_connected(el)?;
        if !self.accepts_markup(el) {
            return Err(FormscribeError::validation(format!(
                "{} cannot hold markup",
                self.describe(el)
            )));
        }
        self.overlays.insert(el, Overlay::Markup(markup.to_string()));
        Ok(())
    }

    /// Record a notification event on `el`.
    pub fn dispatch(&mut self, el: ElementId, kind: FieldEventKind) {
        self.events.push(FieldEvent { target: el, kind });
    }

    /// Detach `el` and its subtree. Returns `false` if it was already detached.
    pub fn remove(&mut self, el: ElementId) -> bool {
        if !self.is_connected(el) {
            return false;
        }
        self.removed.insert(el)
    }

    /// Events emitted so far, oldest first.
    pub fn events(&self) -> &[FieldEvent] {
        &self.events
    }

    /// Drain the event log.
    pub fn take_events(&mut self) -> Vec<FieldEvent> {
        std::mem::take(&mut self.events)
    }

    /// Serialize the page with all live state applied.
    pub fn to_html(&self) -> String {
        let mut out = String::from("<!DOCTYPE html>\n");
        if !self.nodes.is_empty() {
            self.write_element(ElementId(0), &mut out);
        }
        out.push('\n');
        out
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn node(&self, el: ElementId) -> Option<&ElementNode> {
        self.nodes.get(el.0)
    }

    fn ensure_connected(&self, el: ElementId) -> Result<()> {
        if self.is_connected(el) {
            Ok(())
        } else {
            Err(FormscribeError::validation(format!(
                "element #{} is not attached to the page",
                el.0
            )))
        }
    }

    fn original_text(&self, el: ElementId) -> String {
        self.nodes[el.0]
            .children
            .iter()
            .filter_map(|child| match child {
                Child::Text(text) => Some(text.as_str()),
                Child::Element(_) => None,
            })
            .collect()
    }

    fn collect_text(&self, el: ElementId, out: &mut String) {
        if let Some(Overlay::Markup(markup)) = self.overlays.get(&el) {
            out.push_str(&markup_to_text(markup));
            return;
        }
        for child in &self.nodes[el.0].children {
            match child {
                Child::Text(text) => out.push_str(text),
                Child::Element(id) if self.removed.contains(id) => {}
                Child::Element(id) if self.nodes[id.0].tag == "br" => out.push('\n'),
                Child::Element(id) => self.collect_text(*id, out),
            }
        }
    }

    fn write_element(&self, el: ElementId, out: &mut String) {
        if self.removed.contains(&el) {
            return;
        }
        let node = &self.nodes[el.0];
        let value = match self.overlays.get(&el) {
            Some(Overlay::Value(value)) if node.tag == "input" => Some(value),
            _ => None,
        };
        let selected = self.assigned_selection(el);

        out.push('<');
        out.push_str(&node.tag);
        for (name, attr_value) in &node.attrs {
            if value.is_some() && name == "value" {
                continue;
            }
            if selected.is_some() && name == "selected" {
                continue;
            }
            out.push_str(&format!(" {name}=\"{}\"", escape_attr(attr_value)));
        }
        if let Some(value) = value {
            out.push_str(&format!(" value=\"{}\"", escape_attr(value)));
        }
        if selected == Some(true) {
            out.push_str(" selected");
        }
        out.push('>');

        if VOID_ELEMENTS.contains(&node.tag.as_str()) {
            return;
        }
        self.write_children(el, out);
        out.push_str(&format!("</{}>", node.tag));
    }

    /// For an option inside a `select` with an assigned value: whether it is
    /// the selected one. `None` leaves the original attributes alone.
    fn assigned_selection(&self, el: ElementId) -> Option<bool> {
        if self.nodes[el.0].tag != "option" {
            return None;
        }
        let mut current = self.nodes[el.0].parent;
        while let Some(id) = current {
            if self.nodes[id.0].tag == "select" {
                return match self.overlays.get(&id) {
                    Some(Overlay::Value(_)) => Some(self.selected_option(id) == Some(el)),
                    _ => None,
                };
            }
            current = self.nodes[id.0].parent;
        }
        None
    }

    fn write_children(&self, el: ElementId, out: &mut String) {
        let node = &self.nodes[el.0];
        match self.overlays.get(&el) {
            Some(Overlay::Markup(markup)) => out.push_str(markup),
            Some(Overlay::Value(value)) if node.tag == "textarea" => {
                out.push_str(&escape_text(value));
            }
            _ => {
                let raw = RAW_TEXT_ELEMENTS.contains(&node.tag.as_str());
                for child in &node.children {
                    match child {
                        Child::Text(text) if raw => out.push_str(text),
                        Child::Text(text) => out.push_str(&escape_text(text)),
                        Child::Element(id) => self.write_element(*id, out),
                    }
                }
            }
        }
    }
}

/// Flatten `el` and its descendants into `nodes` in document order.
fn build_arena(
    el: ElementRef<'_>,
    parent: Option<ElementId>,
    nodes: &mut Vec<ElementNode>,
) -> ElementId {
    let id = ElementId(nodes.len());
    nodes.push(ElementNode {
        tag: el.value().name().to_ascii_lowercase(),
        attrs: el
            .value()
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
        parent,
        children: Vec::new(),
        subtree_end: 0,
    });

    let mut children = Vec::new();
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            children.push(Child::Element(build_arena(child_el, Some(id), nodes)));
        } else if let Some(text) = child.value().as_text() {
            children.push(Child::Text(text.to_string()));
        }
    }

    let end = nodes.len();
    let node = &mut nodes[id.0];
    node.children = children;
    node.subtree_end = end;
    id
}

fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!(%selector, error = %e, "unparsable selector skipped");
            None
        }
    }
}

/// Plain text of an HTML fragment, parsed detached from any page.
pub fn markup_to_text(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    let mut out = String::new();
    for node in fragment.root_element().descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    out
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORM: &str = r#"<!DOCTYPE html>
<html><body>
  <form class="form-group">
    <label for="title">Title</label>
    <input id="title" name="title" value="Old title">
    <textarea id="notes">first line</textarea>
    <div id="editor" contenteditable="true"><p>Hello <b>world</b></p></div>
    <span id="after">tail</span>
  </form>
  <input id="upload" type="file">
</body></html>"#;

    #[test]
    fn queries_follow_document_order() {
        let page = Page::parse(FORM);
        let inputs = page.select_all("input");
        assert_eq!(inputs.len(), 2);
        assert_eq!(page.attr(inputs[0], "id"), Some("title"));
        assert_eq!(page.select_first("#nothing"), None);
        assert_eq!(page.select_first("[[broken"), None);
    }

    #[test]
    fn structural_navigation() {
        let page = Page::parse(FORM);
        let label = page.select_first("label").unwrap();
        let siblings = page.next_element_siblings(label);
        let tags: Vec<_> = siblings.iter().map(|s| page.tag(*s).unwrap()).collect();
        assert_eq!(tags, vec!["input", "textarea", "div", "span"]);

        let form = page.closest(label, ".form-group").unwrap();
        assert_eq!(page.tag(form), Some("form"));
        assert_eq!(page.select_within(form, "textarea"), page.element_by_id("notes"));
        assert_eq!(page.select_within(form, "#upload"), None);
    }

    #[test]
    fn values_and_text() {
        let page = Page::parse(FORM);
        let title = page.element_by_id("title").unwrap();
        let notes = page.element_by_id("notes").unwrap();
        let editor = page.element_by_id("editor").unwrap();
        assert_eq!(page.value(title).as_deref(), Some("Old title"));
        assert_eq!(page.value(notes).as_deref(), Some("first line"));
        assert_eq!(page.value(editor), None);
        assert_eq!(page.text_content(editor), "Hello world");
        assert!(page.is_rich_text(editor));
        assert!(!page.accepts_markup(title));
    }

    #[test]
    fn markup_overlay_hides_original_children() {
        let mut page = Page::parse(FORM);
        let editor = page.element_by_id("editor").unwrap();
        assert!(page.select_first("#editor b").is_some());

        page.set_inner_html(editor, "one<br>two").unwrap();
        assert_eq!(page.text_content(editor), "one\ntwo");
        assert_eq!(page.inner_html(editor), "one<br>two");
        assert!(page.select_first("#editor b").is_none());
    }

    #[test]
    fn removed_elements_reject_writes() {
        let mut page = Page::parse(FORM);
        let notes = page.element_by_id("notes").unwrap();
        assert!(page.remove(notes));
        assert!(!page.remove(notes));
        assert_eq!(page.select_first("#notes"), None);
        assert!(page.set_value(notes, "x").is_err());
    }

    #[test]
    fn file_inputs_reject_values() {
        let mut page = Page::parse(FORM);
        let upload = page.element_by_id("upload").unwrap();
        assert!(page.set_value(upload, "secret.txt").is_err());
    }

    #[test]
    fn serialization_applies_live_state() {
        let mut page = Page::parse(FORM);
        let title = page.element_by_id("title").unwrap();
        let notes = page.element_by_id("notes").unwrap();
        page.set_value(title, "New \"title\"").unwrap();
        page.set_value(notes, "a < b").unwrap();

        let html = page.to_html();
        assert!(html.contains(r#"value="New &quot;title&quot;""#));
        assert!(!html.contains("Old title"));
        assert!(html.contains("<textarea id=\"notes\">a &lt; b</textarea>"));

        let reparsed = Page::parse(&html);
        let title = reparsed.element_by_id("title").unwrap();
        assert_eq!(reparsed.value(title).as_deref(), Some("New \"title\""));
    }

    #[test]
    fn select_value_follows_options() {
        let mut page = Page::parse(
            r#"<html><body><select id="size">
              <option value="s">Small</option>
              <option value="m" selected>Medium</option>
              <option>Large</option>
            </select></body></html>"#,
        );
        let size = page.element_by_id("size").unwrap();
        assert!(page.has_value(size));
        assert_eq!(page.value(size).as_deref(), Some("m"));
        assert!(page.set_value(size, "Huge").is_err());

        page.set_value(size, "Large").unwrap();
        assert_eq!(page.value(size).as_deref(), Some("Large"));

        let html = page.to_html();
        assert!(html.contains(r#"<option value="m">Medium</option>"#));
        assert!(html.contains("<option selected>Large</option>"));
        let reparsed = Page::parse(&html);
        let size = reparsed.element_by_id("size").unwrap();
        assert_eq!(reparsed.value(size).as_deref(), Some("Large"));
    }

    #[test]
    fn detached_markup_to_text() {
        assert_eq!(markup_to_text("<p>a<br>b</p><ul><li>c</li></ul>"), "a\nbc");
    }
}
