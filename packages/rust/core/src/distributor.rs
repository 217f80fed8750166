//! Writing generated content into form fields.
//!
//! Sections are written in canonical order into the field each one targets.
//! A section whose field cannot be found or written is not lost: it is
//! appended to the description field under a `## heading` instead.

use tracing::{debug, info, instrument, warn};

use formscribe_page::{FieldLocator, Page, read_text, write_text};
use formscribe_shared::{DistributionOutcome, FieldName, GenerationResult, StructuredContent};

use crate::sections::{sections_to_content, split_sections};

/// Content that could not reach its own field.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Unhandled {
    heading: String,
    content: String,
}

/// Applies generation results to a page through a [`FieldLocator`].
pub struct Distributor {
    locator: FieldLocator,
}

impl Distributor {
    pub fn new(locator: FieldLocator) -> Self {
        Self { locator }
    }

    pub fn locator(&self) -> &FieldLocator {
        &self.locator
    }

    /// Apply either kind of result.
    #[instrument(skip_all, fields(platform = %self.locator.platform(), structured = content.is_structured()))]
    pub fn distribute(&self, page: &mut Page, content: &GenerationResult) -> DistributionOutcome {
        let outcome = match content {
            GenerationResult::Structured(sections) => self.distribute_structured(page, sections),
            GenerationResult::Text(text) => self.distribute_text(page, text),
        };
        info!(fields = ?outcome.fields(), success = outcome.success(), "distribution finished");
        outcome
    }

    /// Write each non-empty section into its field, then fold whatever could
    /// not be written into the description.
    pub fn distribute_structured(
        &self,
        page: &mut Page,
        content: &StructuredContent,
    ) -> DistributionOutcome {
        let mut outcome = DistributionOutcome::default();
        let mut unhandled = Vec::new();

        for (key, value) in content.iter() {
            if value.is_empty() {
                continue;
            }
            let field = key.field();
            let text = value.to_field_text();

            match self.locator.locate_field(page, field) {
                Some(el) if write_text(page, el, &text) => outcome.record(field),
                found => {
                    debug!(%field, located = found.is_some(), "section falls back to description");
                    unhandled.push(Unhandled {
                        heading: field.humanized(),
                        content: text,
                    });
                }
            }
        }

        if !unhandled.is_empty() {
            let blocks: Vec<String> = unhandled
                .iter()
                .map(|u| format!("## {}\n{}", u.heading, u.content))
                .collect();
            self.append_to_description(page, &blocks, &mut outcome);
        }
        outcome
    }

    /// Split plain text at its headings and apply the recognized sections.
    /// Text without any recognized section is appended to the description.
    pub fn distribute_text(&self, page: &mut Page, text: &str) -> DistributionOutcome {
        let content = sections_to_content(&split_sections(text));
        if !content.is_empty() {
            return self.distribute_structured(page, &content);
        }

        let mut outcome = DistributionOutcome::default();
        let text = text.trim();
        if text.is_empty() {
            return outcome;
        }
        debug!("no recognized sections, appending text to description");
        self.append_to_description(page, &[text.to_string()], &mut outcome);
        outcome
    }

    fn append_to_description(
        &self,
        page: &mut Page,
        blocks: &[String],
        outcome: &mut DistributionOutcome,
    ) {
        let Some(el) = self.locator.locate_field(page, FieldName::Description) else {
            warn!(sections = blocks.len(), "no description field; content dropped");
            return;
        };

        let mut text = read_text(page, el);
        for block in blocks {
            if !text.is_empty() {
                text.push_str("\n\n");
            }
            text.push_str(block);
        }

        if write_text(page, el, &text) {
            outcome.record(FieldName::Description);
        } else {
            warn!(sections = blocks.len(), "description write failed; content dropped");
        }
    }
}
