//! Core domain types: platforms, logical fields, content sections, styles,
//! and the request/result/outcome values that flow between components.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::FormscribeError;

/// Marker placed in front of every list item written into a field.
pub const BULLET: &str = "•";

// ---------------------------------------------------------------------------
// PlatformId
// ---------------------------------------------------------------------------

/// A supported issue-tracking platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlatformId {
    Jira,
    Clarity,
}

impl PlatformId {
    pub const ALL: [PlatformId; 2] = [PlatformId::Jira, PlatformId::Clarity];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jira => "JIRA",
            Self::Clarity => "CLARITY",
        }
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformId {
    type Err = FormscribeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FormscribeError::validation(format!("unknown platform: {s}")))
    }
}

// ---------------------------------------------------------------------------
// FieldName
// ---------------------------------------------------------------------------

/// Platform-independent identifier of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldName {
    AcceptanceCriteria,
    TestCases,
    TechnicalDetails,
    Dependencies,
    SecurityRecommendations,
    Estimation,
    ExpectedBenefits,
    BusinessOutcomes,
    RisksConstraints,
    Description,
}

impl FieldName {
    pub const ALL: [FieldName; 10] = [
        FieldName::AcceptanceCriteria,
        FieldName::TestCases,
        FieldName::TechnicalDetails,
        FieldName::Dependencies,
        FieldName::SecurityRecommendations,
        FieldName::Estimation,
        FieldName::ExpectedBenefits,
        FieldName::BusinessOutcomes,
        FieldName::RisksConstraints,
        FieldName::Description,
    ];

    /// The registry key, e.g. `ACCEPTANCE_CRITERIA`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AcceptanceCriteria => "ACCEPTANCE_CRITERIA",
            Self::TestCases => "TEST_CASES",
            Self::TechnicalDetails => "TECHNICAL_DETAILS",
            Self::Dependencies => "DEPENDENCIES",
            Self::SecurityRecommendations => "SECURITY_RECOMMENDATIONS",
            Self::Estimation => "ESTIMATION",
            Self::ExpectedBenefits => "EXPECTED_BENEFITS",
            Self::BusinessOutcomes => "BUSINESS_OUTCOMES",
            Self::RisksConstraints => "RISKS_CONSTRAINTS",
            Self::Description => "DESCRIPTION",
        }
    }

    /// Lower-case heading used when content is folded into the description.
    pub fn humanized(&self) -> String {
        self.as_str().replace('_', " ").to_lowercase()
    }

    /// The content section that targets this field, if any.
    pub fn section(&self) -> Option<SectionKey> {
        SectionKey::ALL.into_iter().find(|k| k.field() == *self)
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldName {
    type Err = FormscribeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FormscribeError::validation(format!("unknown field: {s}")))
    }
}

// ---------------------------------------------------------------------------
// SectionKey and the canonical section table
// ---------------------------------------------------------------------------

/// A generated content section. Declaration order is the distribution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionKey {
    AcceptanceCriteria,
    TestCases,
    TechnicalDetails,
    Dependencies,
    SecurityRecommendations,
    Estimation,
    ExpectedBenefits,
    BusinessOutcomes,
    RisksConstraints,
}

impl SectionKey {
    pub const ALL: [SectionKey; 9] = [
        SectionKey::AcceptanceCriteria,
        SectionKey::TestCases,
        SectionKey::TechnicalDetails,
        SectionKey::Dependencies,
        SectionKey::SecurityRecommendations,
        SectionKey::Estimation,
        SectionKey::ExpectedBenefits,
        SectionKey::BusinessOutcomes,
        SectionKey::RisksConstraints,
    ];

    /// JSON key as produced by the generation endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AcceptanceCriteria => "acceptanceCriteria",
            Self::TestCases => "testCases",
            Self::TechnicalDetails => "technicalDetails",
            Self::Dependencies => "dependencies",
            Self::SecurityRecommendations => "securityRecommendations",
            Self::Estimation => "estimation",
            Self::ExpectedBenefits => "expectedBenefits",
            Self::BusinessOutcomes => "businessOutcomes",
            Self::RisksConstraints => "risksConstraints",
        }
    }

    /// The logical field this section is written into.
    pub fn field(&self) -> FieldName {
        match self {
            Self::AcceptanceCriteria => FieldName::AcceptanceCriteria,
            Self::TestCases => FieldName::TestCases,
            Self::TechnicalDetails => FieldName::TechnicalDetails,
            Self::Dependencies => FieldName::Dependencies,
            Self::SecurityRecommendations => FieldName::SecurityRecommendations,
            Self::Estimation => FieldName::Estimation,
            Self::ExpectedBenefits => FieldName::ExpectedBenefits,
            Self::BusinessOutcomes => FieldName::BusinessOutcomes,
            Self::RisksConstraints => FieldName::RisksConstraints,
        }
    }

    /// Section title as it appears in `## Title` headings.
    pub fn title(&self) -> &'static str {
        match self {
            Self::AcceptanceCriteria => "Acceptance Criteria",
            Self::TestCases => "Test Cases",
            Self::TechnicalDetails => "Technical Details",
            Self::Dependencies => "Dependencies",
            Self::SecurityRecommendations => "Security Recommendations",
            Self::Estimation => "Estimation",
            Self::ExpectedBenefits => "Expected Benefits",
            Self::BusinessOutcomes => "Business Outcomes",
            Self::RisksConstraints => "Risks/Constraints",
        }
    }

    /// Case-insensitive exact match against section titles.
    pub fn from_title(title: &str) -> Option<Self> {
        let title = title.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.title().eq_ignore_ascii_case(title))
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKey {
    type Err = FormscribeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FormscribeError::validation(format!("unknown section: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Structured content
// ---------------------------------------------------------------------------

/// Value of a single generated section: free text or an ordered list of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionValue {
    Text(String),
    Items(Vec<String>),
}

impl SectionValue {
    /// Interpret a JSON value leniently. `null` and empty objects yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Array(items) => Some(Self::Items(
                items
                    .iter()
                    .filter(|item| !item.is_null())
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            )),
            Value::Bool(_) | Value::Number(_) => Some(Self::Text(value.to_string())),
            Value::Object(map) if map.is_empty() => None,
            Value::Object(_) => Some(Self::Text(value.to_string())),
        }
    }

    /// Whether there is nothing worth writing.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Items(items) => items.iter().all(|i| i.trim().is_empty()),
        }
    }

    /// Field-ready text: list items become bullet lines separated by a blank line.
    pub fn to_field_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Items(items) => items
                .iter()
                .map(|item| format!("{BULLET} {item}"))
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

/// Mapping from known section keys to generated values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StructuredContent {
    sections: BTreeMap<SectionKey, SectionValue>,
}

impl StructuredContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object. Unknown keys and `null` values are dropped.
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        let mut content = Self::new();
        for (key, value) in object {
            let Ok(section) = key.parse::<SectionKey>() else {
                tracing::debug!(%key, "ignoring unknown content section");
                continue;
            };
            if let Some(value) = SectionValue::from_json(value) {
                content.sections.insert(section, value);
            }
        }
        content
    }

    pub fn insert(&mut self, key: SectionKey, value: SectionValue) {
        self.sections.insert(key, value);
    }

    pub fn get(&self, key: SectionKey) -> Option<&SectionValue> {
        self.sections.get(&key)
    }

    /// Sections in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (SectionKey, &SectionValue)> {
        self.sections.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Keep only the given sections.
    pub fn retain_sections(&mut self, keys: &BTreeSet<SectionKey>) {
        self.sections.retain(|k, _| keys.contains(k));
    }

    /// Render as `## Title` blocks for display.
    pub fn preview(&self) -> String {
        self.iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| {
                let body = match value {
                    SectionValue::Text(text) => text.trim().to_string(),
                    SectionValue::Items(items) => items
                        .iter()
                        .map(|item| format!("{BULLET} {item}"))
                        .collect::<Vec<_>>()
                        .join("\n"),
                };
                format!("## {}\n{body}", key.title())
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

// ---------------------------------------------------------------------------
// Styles and formats
// ---------------------------------------------------------------------------

/// Writing style requested for generated content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleOption {
    #[default]
    Standard,
    Concise,
    Detailed,
    Creative,
}

impl StyleOption {
    pub const ALL: [StyleOption; 4] = [
        StyleOption::Standard,
        StyleOption::Concise,
        StyleOption::Detailed,
        StyleOption::Creative,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Concise => "concise",
            Self::Detailed => "detailed",
            Self::Creative => "creative",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Concise => "Concise",
            Self::Detailed => "Detailed",
            Self::Creative => "Creative",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Standard => "Balanced detail and brevity",
            Self::Concise => "Brief and to the point",
            Self::Detailed => "Comprehensive with examples",
            Self::Creative => "Innovative approach",
        }
    }

    /// Instruction block appended to every prompt in this style.
    pub fn instruction(&self) -> &'static str {
        match self {
            Self::Concise => {
                "Write in a concise, efficient style. Be brief and to the point. Use short sentences and minimal examples. Focus on the most essential information."
            }
            Self::Detailed => {
                "Write in a detailed, thorough style. Include comprehensive examples and context. Explain reasoning where helpful. Don't sacrifice clarity for brevity."
            }
            Self::Creative => {
                "Write in a creative, innovative style. Think outside the box and suggest unique approaches. Use engaging language and provide fresh perspectives on solving the problem."
            }
            Self::Standard => {
                "Write in a clear, professional style that balances detail and brevity."
            }
        }
    }

    /// Parse a style id, falling back to [`StyleOption::Standard`] for anything unknown.
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|s| s.id().eq_ignore_ascii_case(name.trim()))
            .unwrap_or_default()
    }
}

impl fmt::Display for StyleOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Shape the generation endpoint is asked to answer in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Json,
    Text,
}

impl ResponseFormat {
    pub fn expects_json(&self) -> bool {
        matches!(self, Self::Json)
    }
}

impl FromStr for ResponseFormat {
    type Err = FormscribeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => Err(FormscribeError::validation(format!(
                "unknown response format: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// GenerationRequest / GenerationResult
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one generation request in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One user-triggered generation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub id: RequestId,
    pub source_text: String,
    pub style: StyleOption,
    /// Sections the caller wants back; `None` keeps everything.
    pub sections: Option<BTreeSet<SectionKey>>,
    pub format: ResponseFormat,
}

impl GenerationRequest {
    pub fn new(source_text: impl Into<String>) -> Self {
        Self {
            id: RequestId::new(),
            source_text: source_text.into(),
            style: StyleOption::default(),
            sections: None,
            format: ResponseFormat::default(),
        }
    }

    pub fn with_style(mut self, style: StyleOption) -> Self {
        self.style = style;
        self
    }

    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_sections(mut self, sections: impl IntoIterator<Item = SectionKey>) -> Self {
        self.sections = Some(sections.into_iter().collect());
        self
    }
}

/// Content produced by one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResult {
    Structured(StructuredContent),
    Text(String),
}

impl GenerationResult {
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    /// Re-read user-edited content: a JSON object becomes structured, anything else is text.
    pub fn from_edited(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.starts_with('{') && trimmed.ends_with('}') {
            if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(trimmed) {
                return Self::Structured(StructuredContent::from_json_object(&object));
            }
        }
        Self::Text(text.to_string())
    }

    /// Raw form offered for editing.
    pub fn to_editable(&self) -> String {
        match self {
            Self::Structured(content) => {
                serde_json::to_string_pretty(content).unwrap_or_default()
            }
            Self::Text(text) => text.clone(),
        }
    }

    /// Human-readable rendering.
    pub fn preview(&self) -> String {
        match self {
            Self::Structured(content) => content.preview(),
            Self::Text(text) => text.clone(),
        }
    }

    /// Drop structured sections not in `sections`. Text results are untouched.
    pub fn restrict_to(&mut self, sections: &BTreeSet<SectionKey>) {
        if let Self::Structured(content) = self {
            content.retain_sections(sections);
        }
    }
}

// ---------------------------------------------------------------------------
// DistributionOutcome
// ---------------------------------------------------------------------------

/// Which fields a distribution call updated. Success means at least one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DistributionOutcome {
    fields: Vec<FieldName>,
}

impl DistributionOutcome {
    pub fn record(&mut self, field: FieldName) {
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
    }

    /// Updated fields, in the order they were written.
    pub fn fields(&self) -> &[FieldName] {
        &self.fields
    }

    pub fn success(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn contains(&self, field: FieldName) -> bool {
        self.fields.contains(&field)
    }

    /// Notification text shown after applying content.
    pub fn summary(&self) -> String {
        if self.success() {
            format!("Content applied to {} field(s)", self.fields.len())
        } else {
            "No fields were updated".to_string()
        }
    }
}
