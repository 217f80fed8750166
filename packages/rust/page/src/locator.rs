//! Field lookup as an ordered strategy chain.
//!
//! Strategies are tried in priority order against the page as it is right
//! now; the first one to return an element wins. The default chain is:
//! configured selectors, selectors synthesized from the field name, then a
//! scan of visible labels. A miss is `None`, never an error.

use std::sync::Arc;

use tracing::{debug, instrument};

use formscribe_shared::{FieldDefinition, FieldName, PlatformConfig, PlatformId};

use crate::document::{ElementId, Page};

/// Elements that act as field labels.
const LABEL_SELECTOR: &str = "label, .field-label, .label";

/// Ancestors that group a label with its control.
const FORM_GROUP_SELECTOR: &str = ".field-container, .form-group";

/// Editable descendants of a form group.
const EDITABLE_SELECTOR: &str = r#"input, textarea, [role="textbox"], [contenteditable="true"]"#;

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// What a strategy is looking for: the raw requested name plus the
/// platform definition it resolved to, if any.
#[derive(Debug, Clone, Copy)]
pub struct FieldTarget<'a> {
    pub name: &'a str,
    pub definition: Option<&'a FieldDefinition>,
}

impl<'a> FieldTarget<'a> {
    /// Label text to search for: the definition's label, else the raw name.
    pub fn label(&self) -> &'a str {
        self.definition
            .map(|def| def.label.as_str())
            .unwrap_or(self.name)
    }
}

// ---------------------------------------------------------------------------
// Strategy trait
// ---------------------------------------------------------------------------

/// One step of the lookup chain.
pub trait LocateStrategy: Send + Sync {
    /// Try to resolve `target` on `page`.
    fn locate(&self, page: &Page, target: &FieldTarget<'_>) -> Option<ElementId>;

    /// Strategy name for tracing.
    fn name(&self) -> &str;
}

/// The platform's declared selectors, in declared order.
pub struct ConfiguredSelectors;

impl LocateStrategy for ConfiguredSelectors {
    fn locate(&self, page: &Page, target: &FieldTarget<'_>) -> Option<ElementId> {
        let def = target.definition?;
        def.selectors
            .iter()
            .find_map(|selector| page.select_first(selector))
    }

    fn name(&self) -> &str {
        "configured-selectors"
    }
}

/// Selectors synthesized from the literal field name.
pub struct GenericSelectors;

impl GenericSelectors {
    fn selectors(target: &FieldTarget<'_>) -> Vec<String> {
        let name = css_string(target.name);
        vec![
            format!(r#"[id="{name}"]"#),
            format!(r#"[name="{name}"]"#),
            format!(r#"[data-test-id="issue.views.field.rich-text.{name}"]"#),
            format!(r#"[data-field-id="{name}"]"#),
            format!(r#"[aria-label="{}"]"#, css_string(target.label())),
        ]
    }
}

impl LocateStrategy for GenericSelectors {
    fn locate(&self, page: &Page, target: &FieldTarget<'_>) -> Option<ElementId> {
        Self::selectors(target)
            .iter()
            .find_map(|selector| page.select_first(selector))
    }

    fn name(&self) -> &str {
        "generic-selectors"
    }
}

/// Finds a label whose text contains the field label, then its control.
pub struct LabelScan;

impl LabelScan {
    fn control_for(page: &Page, label: ElementId) -> Option<ElementId> {
        if let Some(for_id) = page.attr(label, "for") {
            if let Some(el) = page.element_by_id(for_id) {
                return Some(el);
            }
        }

        if let Some(sibling) = page
            .next_element_siblings(label)
            .into_iter()
            .find(|el| is_editable_control(page, *el))
        {
            return Some(sibling);
        }

        let group = page.closest(label, FORM_GROUP_SELECTOR)?;
        page.select_within(group, EDITABLE_SELECTOR)
    }
}

impl LocateStrategy for LabelScan {
    fn locate(&self, page: &Page, target: &FieldTarget<'_>) -> Option<ElementId> {
        let wanted = target.label().trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        page.select_all(LABEL_SELECTOR)
            .into_iter()
            .filter(|label| page.text_content(*label).to_lowercase().contains(&wanted))
            .find_map(|label| Self::control_for(page, label))
    }

    fn name(&self) -> &str {
        "label-scan"
    }
}

fn is_editable_control(page: &Page, el: ElementId) -> bool {
    matches!(page.tag(el), Some("input" | "textarea"))
        || page
            .attr(el, "role")
            .is_some_and(|role| role.eq_ignore_ascii_case("textbox"))
        || page
            .attr(el, "contenteditable")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Escape a value for use inside a double-quoted CSS attribute selector.
fn css_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

// ---------------------------------------------------------------------------
// Locator
// ---------------------------------------------------------------------------

/// Resolves logical field names to elements for one platform.
pub struct FieldLocator {
    config: Arc<PlatformConfig>,
    strategies: Vec<Box<dyn LocateStrategy>>,
}

impl FieldLocator {
    /// Locator with the default strategy chain.
    pub fn new(config: Arc<PlatformConfig>) -> Self {
        Self::with_strategies(
            config,
            vec![
                Box::new(ConfiguredSelectors),
                Box::new(GenericSelectors),
                Box::new(LabelScan),
            ],
        )
    }

    /// Locator with a caller-supplied chain, tried in the given order.
    pub fn with_strategies(
        config: Arc<PlatformConfig>,
        strategies: Vec<Box<dyn LocateStrategy>>,
    ) -> Self {
        Self { config, strategies }
    }

    /// Append a strategy to the end of the chain.
    pub fn push_strategy(&mut self, strategy: Box<dyn LocateStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn platform(&self) -> PlatformId {
        self.config.platform()
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// Resolve `name` (registry key or field id, any case) to an element.
    #[instrument(skip(self, page), fields(platform = %self.platform()))]
    pub fn locate(&self, page: &Page, name: &str) -> Option<ElementId> {
        let target = FieldTarget {
            name,
            definition: self.config.resolve(name).map(|(_, def)| def),
        };

        for strategy in &self.strategies {
            if let Some(el) = strategy.locate(page, &target) {
                debug!(strategy = strategy.name(), element = %page.describe(el), "field located");
                return Some(el);
            }
        }
        debug!("field not found");
        None
    }

    /// Resolve a known logical field.
    pub fn locate_field(&self, page: &Page, field: FieldName) -> Option<ElementId> {
        self.locate(page, field.as_str())
    }
}
