//! The generate-and-distribute cycle: source field → endpoint → fields.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use tracing::{info, instrument};

use formscribe_generation::ContentRequester;
use formscribe_page::{Page, read_text};
use formscribe_shared::{
    DistributionOutcome, FieldName, FormscribeError, GenerationRequest, GenerationResult,
    RequestId, ResponseFormat, Result, SectionKey, StyleOption,
};

use crate::distributor::Distributor;

/// Options for one [`assist`] run.
#[derive(Debug, Clone)]
pub struct AssistOptions {
    /// Field whose text is sent as the prompt source.
    pub source: FieldName,
    pub style: StyleOption,
    pub format: ResponseFormat,
    /// Only these sections are applied; `None` applies everything.
    pub sections: Option<BTreeSet<SectionKey>>,
}

impl Default for AssistOptions {
    fn default() -> Self {
        Self {
            source: FieldName::Description,
            style: StyleOption::default(),
            format: ResponseFormat::default(),
            sections: None,
        }
    }
}

/// Result of an [`assist`] run.
#[derive(Debug)]
pub struct AssistReport {
    pub request_id: RequestId,
    pub result: GenerationResult,
    pub outcome: DistributionOutcome,
    pub elapsed: Duration,
}

/// Progress callback for reporting cycle status.
pub trait AssistProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the endpoint has answered.
    fn generated(&self, result: &GenerationResult);
    /// Called when the cycle completes.
    fn done(&self, report: &AssistReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl AssistProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn generated(&self, _result: &GenerationResult) {}
    fn done(&self, _report: &AssistReport) {}
}

/// Run one cycle.
///
/// 1. Read the source field (missing or blank is [`FormscribeError::EmptySource`])
/// 2. Request content in the chosen style
/// 3. Distribute the result over the page
#[instrument(skip_all, fields(platform = %distributor.locator().platform(), source = %options.source, style = %options.style))]
pub async fn assist(
    page: &mut Page,
    distributor: &Distributor,
    requester: &ContentRequester,
    options: &AssistOptions,
    progress: &dyn AssistProgress,
) -> Result<AssistReport> {
    let start = Instant::now();

    progress.phase("Reading source field");
    let source_text = match distributor.locator().locate_field(page, options.source) {
        Some(el) => read_text(page, el),
        None => String::new(),
    };
    if source_text.is_empty() {
        return Err(FormscribeError::EmptySource {
            field: options.source.humanized(),
        });
    }

    progress.phase("Generating content");
    let mut request = GenerationRequest::new(source_text)
        .with_style(options.style)
        .with_format(options.format);
    if let Some(sections) = &options.sections {
        request = request.with_sections(sections.iter().copied());
    }
    let result = requester.request(&request).await?;
    progress.generated(&result);

    progress.phase("Applying content");
    let outcome = distributor.distribute(page, &result);

    let report = AssistReport {
        request_id: request.id,
        result,
        outcome,
        elapsed: start.elapsed(),
    };
    info!(
        id = %report.request_id,
        fields = report.outcome.fields().len(),
        elapsed_ms = elapsed_ms(report.elapsed),
        "assist complete"
    );
    progress.done(&report);
    Ok(report)
}

/// Milliseconds for log fields, saturating at `u64::MAX`.
fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
