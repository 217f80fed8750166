//! Outbound prompt assembly.

use formscribe_shared::StyleOption;

/// Schema block appended when a JSON envelope is requested.
pub const JSON_INSTRUCTION: &str = r#"Your response MUST be in valid JSON format with this specific structure:
{
  "acceptanceCriteria": [
    "Criterion 1...",
    "Criterion 2...",
    "..."
  ],
  "testCases": [
    "Test case 1...",
    "Test case 2...",
    "..."
  ],
  "technicalDetails": "Technical implementation details here...",
  "dependencies": "Dependencies information here...",
  "securityRecommendations": "Security recommendations here...",
  "estimation": "Estimation details here..."
}

Be extremely careful to escape any quotes properly and ensure the JSON is valid. Do not include any markdown formatting or text outside of the JSON structure."#;

/// Source text, then the schema block when JSON is expected, then the style
/// block. The prompt always ends with the style instruction.
pub fn build_prompt(source: &str, style: StyleOption, expect_json: bool) -> String {
    let mut prompt = String::with_capacity(
        source.len() + JSON_INSTRUCTION.len() + style.instruction().len() + 4,
    );
    prompt.push_str(source);
    if expect_json {
        prompt.push_str("\n\n");
        prompt.push_str(JSON_INSTRUCTION);
    }
    prompt.push_str("\n\n");
    prompt.push_str(style.instruction());
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_style_ends_the_prompt() {
        for style in StyleOption::ALL {
            for expect_json in [true, false] {
                let prompt = build_prompt("Add SSO login", style, expect_json);
                assert!(prompt.starts_with("Add SSO login\n\n"));
                assert!(prompt.ends_with(style.instruction()), "{style} json={expect_json}");
            }
        }
    }

    #[test]
    fn schema_block_present_only_when_json_expected() {
        let with = build_prompt("x", StyleOption::Concise, true);
        let without = build_prompt("x", StyleOption::Concise, false);
        assert!(with.contains(JSON_INSTRUCTION));
        assert!(with.contains("\"securityRecommendations\""));
        assert!(!without.contains("valid JSON format"));
    }

    #[test]
    fn unknown_style_uses_standard_block() {
        let prompt = build_prompt("x", StyleOption::from_name("poetic"), false);
        assert_eq!(
            prompt,
            "x\n\nWrite in a clear, professional style that balances detail and brevity."
        );
    }
}
