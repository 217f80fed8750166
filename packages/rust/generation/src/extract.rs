//! Normalizing heterogeneous response bodies.
//!
//! Content is found by following the configured dot path. When any segment is
//! missing the body is scanned for well-known response shapes, and when none
//! of those match the whole body is used. Structured content is then
//! recovered from that value in three stages: direct parse, fenced code block,
//! outermost braces. Anything that does not yield a JSON object is text.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use formscribe_shared::{GenerationResult, ResponseFormat, StructuredContent};

use crate::cleanup::clean_markdown;

/// Top-level keys checked, in order, when the configured path misses.
const FALLBACK_KEYS: &[&str] = &["output", "text", "content", "result", "answer", "generated_text"];

/// Turn a response body into a generation result.
pub fn normalize_response(body: &Value, response_path: &str, format: ResponseFormat) -> GenerationResult {
    let content = content_at_path(body, response_path);

    if format.expects_json() {
        if let Some(object) = extract_json(&content) {
            return GenerationResult::Structured(StructuredContent::from_json_object(&object));
        }
        debug!("no JSON object in response content, treating it as text");
    }

    GenerationResult::Text(clean_markdown(&value_to_text(&content)))
}

/// Value at `path`, or the first known response shape, or the whole body.
pub fn content_at_path(body: &Value, path: &str) -> Value {
    let mut current = body;
    for segment in path.split('.') {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(value) if !value.is_null() => current = value,
            _ => {
                debug!(path, segment, "response path missing, scanning known shapes");
                return find_known_shape(body);
            }
        }
    }
    current.clone()
}

fn find_known_shape(body: &Value) -> Value {
    for key in FALLBACK_KEYS {
        if let Some(value) = body.get(key).filter(|v| is_truthy(v)) {
            debug!(key, "content found under fallback key");
            return value.clone();
        }
    }

    if let Some(choice) = body.get("choices").and_then(|c| c.get(0)) {
        let candidates = [choice.pointer("/message/content"), choice.get("text")];
        if let Some(value) = candidates.into_iter().flatten().find(|v| is_truthy(v)) {
            debug!("content found in chat-completion choice");
            return value.clone();
        }
    }

    debug!("no known response shape, using entire body");
    Value::String(body.to_string())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A JSON object carried by `content`, if any.
pub fn extract_json(content: &Value) -> Option<Map<String, Value>> {
    match content {
        Value::Object(object) => Some(object.clone()),
        Value::String(text) => extract_json_from_text(text),
        _ => None,
    }
}

fn extract_json_from_text(text: &str) -> Option<Map<String, Value>> {
    static FENCED_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)```(?:json)?(.*?)```").expect("valid regex")
    });

    if let Some(object) = parse_object(text) {
        return Some(object);
    }

    if let Some(inner) = FENCED_RE.captures(text).and_then(|c| c.get(1)) {
        if let Some(object) = parse_object(inner.as_str().trim()) {
            debug!("JSON recovered from fenced block");
            return Some(object);
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    let object = parse_object(&text[start..=end])?;
    debug!("JSON recovered from surrounding text");
    Some(object)
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use formscribe_shared::{SectionKey, SectionValue};

    use super::*;

    #[test]
    fn configured_path_wins() {
        let body = json!({"response": {"answer": "from path"}, "output": "from fallback"});
        assert_eq!(content_at_path(&body, "response.answer"), json!("from path"));
    }

    #[test]
    fn path_indexes_into_arrays() {
        let body = json!({"data": [{"text": "first"}]});
        assert_eq!(content_at_path(&body, "data.0.text"), json!("first"));
    }

    #[test]
    fn missing_segment_scans_known_keys_in_order() {
        let body = json!({"text": "", "content": "c", "answer": "a"});
        assert_eq!(content_at_path(&body, "response.answer"), json!("c"));
    }

    #[test]
    fn chat_completion_shapes() {
        let body = json!({"choices": [{"message": {"content": "Hello"}}]});
        assert_eq!(content_at_path(&body, "response.answer"), json!("Hello"));

        let body = json!({"choices": [{"text": "legacy"}]});
        assert_eq!(content_at_path(&body, "response.answer"), json!("legacy"));
    }

    #[test]
    fn unknown_shape_is_stringified() {
        let body = json!({"weird": 1});
        assert_eq!(content_at_path(&body, "response.answer"), json!(r#"{"weird":1}"#));
    }

    #[test]
    fn fenced_json_is_recovered() {
        let text = "Here you go:\n```json\n{\"testCases\": [\"a\"]}\n```\nThanks";
        let object = extract_json(&json!(text)).unwrap();
        assert_eq!(object["testCases"], json!(["a"]));
    }

    #[test]
    fn outer_braces_are_recovered() {
        let text = "Sure! {\"estimation\": \"3 days\"} Let me know.";
        let object = extract_json(&json!(text)).unwrap();
        assert_eq!(object["estimation"], json!("3 days"));
    }

    #[test]
    fn non_objects_are_not_structured() {
        assert!(extract_json(&json!("[1, 2]")).is_none());
        assert!(extract_json(&json!("no braces here")).is_none());
        assert!(extract_json(&json!("} backwards {")).is_none());
        assert!(extract_json(&json!(42)).is_none());
    }

    #[test]
    fn chat_shape_with_fenced_json_becomes_structured() {
        let body = json!({"choices": [{"message": {"content": "```json\n{\"testCases\":[\"a\"]}\n```"}}]});
        let result = normalize_response(&body, "response.answer", ResponseFormat::Json);
        let GenerationResult::Structured(content) = result else {
            panic!("expected structured result");
        };
        assert_eq!(
            content.get(SectionKey::TestCases),
            Some(&SectionValue::Items(vec!["a".into()]))
        );
    }

    #[test]
    fn unparsable_json_degrades_to_cleaned_text() {
        let body = json!({"response": {"answer": "### Notes\n- {broken"}});
        let result = normalize_response(&body, "response.answer", ResponseFormat::Json);
        assert_eq!(result, GenerationResult::Text("## Notes\n• {broken".into()));
    }

    #[test]
    fn text_format_skips_json_extraction() {
        let body = json!({"response": {"answer": "{\"estimation\": \"1d\"}"}});
        let result = normalize_response(&body, "response.answer", ResponseFormat::Text);
        assert!(!result.is_structured());
    }
}
