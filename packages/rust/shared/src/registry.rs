//! Per-platform field definitions.
//!
//! Each platform maps logical field names to a [`FieldDefinition`] holding an
//! ordered list of candidate selectors. Order is priority: the first selector
//! that matches wins. Tables are built once and shared read-only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{FormscribeError, Result};
use crate::types::{FieldName, PlatformId};

/// Identity and candidate selectors for one logical field on one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Platform-side field id (e.g. `acceptance-criteria`).
    pub id: String,
    /// Visible label used for aria-label and label-text lookups.
    pub label: String,
    /// CSS selectors in priority order.
    pub selectors: Vec<String>,
}

impl FieldDefinition {
    pub fn new(id: &str, label: &str, selectors: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Field table for a single platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(skip)]
    platform: Option<PlatformId>,
    /// Logical field name → definition.
    pub fields: BTreeMap<FieldName, FieldDefinition>,
}

impl PlatformConfig {
    pub fn new(platform: PlatformId, fields: BTreeMap<FieldName, FieldDefinition>) -> Self {
        Self {
            platform: Some(platform),
            fields,
        }
    }

    /// Built-in table for `platform`.
    pub fn builtin(platform: PlatformId) -> Self {
        let fields = match platform {
            PlatformId::Jira => jira_fields(),
            PlatformId::Clarity => clarity_fields(),
        };
        Self::new(platform, fields)
    }

    /// The platform this table belongs to.
    pub fn platform(&self) -> PlatformId {
        self.platform.unwrap_or(PlatformId::Jira)
    }

    pub fn field(&self, name: FieldName) -> Option<&FieldDefinition> {
        self.fields.get(&name)
    }

    /// Resolve a free-form name: first by registry key (case-insensitive),
    /// then by the definition's `id`.
    pub fn resolve(&self, name: &str) -> Option<(FieldName, &FieldDefinition)> {
        if let Ok(field) = name.parse::<FieldName>() {
            if let Some(def) = self.fields.get(&field) {
                return Some((field, def));
            }
        }
        self.fields
            .iter()
            .find(|(_, def)| def.id.eq_ignore_ascii_case(name.trim()))
            .map(|(field, def)| (*field, def))
    }

    /// Every definition needs a label and at least one selector.
    pub fn validate(&self) -> Result<()> {
        for (name, def) in &self.fields {
            if def.selectors.iter().all(|s| s.trim().is_empty()) {
                return Err(FormscribeError::validation(format!(
                    "{}: field {name} has no selectors",
                    self.platform()
                )));
            }
            if def.label.trim().is_empty() {
                return Err(FormscribeError::validation(format!(
                    "{}: field {name} has an empty label",
                    self.platform()
                )));
            }
        }
        Ok(())
    }

    fn with_platform(mut self, platform: PlatformId) -> Self {
        self.platform = Some(platform);
        self
    }
}

/// All platform tables, built-ins merged with any overrides from the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformRegistry {
    platforms: BTreeMap<PlatformId, PlatformConfig>,
}

impl PlatformRegistry {
    /// Registry holding only the built-in tables.
    pub fn builtin() -> Self {
        Self {
            platforms: PlatformId::ALL
                .into_iter()
                .map(|p| (p, PlatformConfig::builtin(p)))
                .collect(),
        }
    }

    /// Built-ins with whole-platform overrides applied.
    pub fn with_overrides(overrides: &BTreeMap<PlatformId, PlatformConfig>) -> Result<Self> {
        let mut registry = Self::builtin();
        for (platform, config) in overrides {
            let config = config.clone().with_platform(*platform);
            config.validate()?;
            registry.platforms.insert(*platform, config);
        }
        Ok(registry)
    }

    pub fn get(&self, platform: PlatformId) -> Option<&PlatformConfig> {
        self.platforms.get(&platform)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlatformId, &PlatformConfig)> {
        self.platforms.iter().map(|(p, c)| (*p, c))
    }
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// ---------------------------------------------------------------------------
// Built-in tables
// ---------------------------------------------------------------------------

/// Jira custom fields follow a shared rich-text test-id convention.
fn jira_field(id: &str, label: &str, custom_field: &str) -> FieldDefinition {
    FieldDefinition {
        id: id.to_string(),
        label: label.to_string(),
        selectors: vec![
            format!(r#"[data-test-id="issue.views.field.rich-text.{id}"]"#),
            format!("#{id}"),
            format!("#{custom_field}"),
            format!(r#"[data-field-id="{custom_field}"]"#),
            format!(r#"[aria-label="{label}"]"#),
        ],
    }
}

fn jira_fields() -> BTreeMap<FieldName, FieldDefinition> {
    BTreeMap::from([
        (
            FieldName::AcceptanceCriteria,
            jira_field("acceptance-criteria", "Acceptance Criteria", "customfield_10000"),
        ),
        (
            FieldName::TestCases,
            jira_field("test-cases", "Test Cases", "customfield_10001"),
        ),
        (
            FieldName::TechnicalDetails,
            jira_field("technical-details", "Technical Details", "customfield_10002"),
        ),
        (
            FieldName::Dependencies,
            jira_field("dependencies", "Dependencies", "customfield_10003"),
        ),
        (
            FieldName::SecurityRecommendations,
            jira_field(
                "security-recommendations",
                "Security Recommendations",
                "customfield_10004",
            ),
        ),
        (
            FieldName::Estimation,
            jira_field("estimation", "Estimation", "customfield_10005"),
        ),
        (
            FieldName::Description,
            FieldDefinition::new(
                "description",
                "Description",
                &[
                    r#"[data-test-id="issue.views.field.rich-text.description"]"#,
                    "#description",
                    r#"[role="textbox"][aria-label="Description"]"#,
                ],
            ),
        ),
    ])
}

/// Clarity fields are addressed by id, data attribute, name, then aria-label.
fn clarity_field(id: &str, label: &str) -> FieldDefinition {
    FieldDefinition {
        id: id.to_string(),
        label: label.to_string(),
        selectors: vec![
            format!("#{id}"),
            format!(r#"[data-field-id="{id}"]"#),
            format!(r#"[name="{id}"]"#),
            format!(r#"[aria-label="{label}"]"#),
            format!("#customfield_{}", id.replace('-', "_")),
        ],
    }
}

fn clarity_fields() -> BTreeMap<FieldName, FieldDefinition> {
    BTreeMap::from([
        (
            FieldName::AcceptanceCriteria,
            clarity_field("acceptance-criteria", "Acceptance Criteria"),
        ),
        (
            FieldName::ExpectedBenefits,
            clarity_field("expected-benefits", "Expected Benefits"),
        ),
        (
            FieldName::BusinessOutcomes,
            clarity_field("business-outcomes", "Business Outcomes"),
        ),
        (
            FieldName::RisksConstraints,
            clarity_field("risks-constraints", "Risks/Constraints"),
        ),
        (
            FieldName::Description,
            FieldDefinition::new(
                "description",
                "Description",
                &[
                    r#"textarea[name="description"]"#,
                    "#description",
                    r#"[aria-label="Description"]"#,
                    "div.description",
                    ".clarity-description",
                ],
            ),
        ),
    ])
}
