//! Presence tracking for fields that come and go as the host page re-renders.

use std::collections::BTreeMap;

use tracing::debug;

use formscribe_shared::FieldName;

use crate::document::{ElementId, Page};
use crate::locator::FieldLocator;

/// A change in a watched field's presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTransition {
    Appeared(FieldName, ElementId),
    Disappeared(FieldName),
}

type TransitionCallback = Box<dyn FnMut(FieldTransition) + Send>;

/// Re-resolves a set of fields on every observation and reports only
/// found/not-found transitions. Every field starts as not found.
pub struct FieldWatcher {
    present: BTreeMap<FieldName, bool>,
    on_transition: TransitionCallback,
}

impl FieldWatcher {
    pub fn new(
        fields: impl IntoIterator<Item = FieldName>,
        on_transition: impl FnMut(FieldTransition) + Send + 'static,
    ) -> Self {
        Self {
            present: fields.into_iter().map(|f| (f, false)).collect(),
            on_transition: Box::new(on_transition),
        }
    }

    /// Re-check every watched field against the page.
    pub fn observe(&mut self, page: &Page, locator: &FieldLocator) {
        for (field, was_present) in self.present.iter_mut() {
            let found = locator.locate_field(page, *field);
            if found.is_some() == *was_present {
                continue;
            }
            *was_present = found.is_some();
            let transition = match found {
                Some(el) => FieldTransition::Appeared(*field, el),
                None => FieldTransition::Disappeared(*field),
            };
            debug!(?transition, "field presence changed");
            (self.on_transition)(transition);
        }
    }

    pub fn is_present(&self, field: FieldName) -> bool {
        self.present.get(&field).copied().unwrap_or(false)
    }
}
