//! Markdown normalization for plain-text generation results.
//!
//! Each pass is a function `&str -> String` applied in sequence.

use std::sync::LazyLock;

use regex::Regex;

use formscribe_shared::BULLET;

/// Run every normalization pass on generated text.
pub fn clean_markdown(text: &str) -> String {
    let mut result = text.to_string();

    result = normalize_headings(&result);
    result = strip_rules(&result);
    result = normalize_bullets(&result);

    result
}

/// Any `##`..`######` heading becomes a level-2 heading.
fn normalize_headings(text: &str) -> String {
    static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^#{2,6}[ \t]+(.+?)[ \t]*$").expect("valid regex")
    });
    HEADING_RE.replace_all(text, "## $1").into_owned()
}

/// Horizontal rules become blank lines.
fn strip_rules(text: &str) -> String {
    static RULE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^[ \t]*(?:---|\*\*\*)[ \t]*$").expect("valid regex")
    });
    RULE_RE.replace_all(text, "").into_owned()
}

/// `-` and `*` list markers become bullets.
fn normalize_bullets(text: &str) -> String {
    static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^[ \t]*[-*][ \t]+(.+?)$").expect("valid regex")
    });
    BULLET_RE
        .replace_all(text, format!("{BULLET} $1").as_str())
        .into_owned()
}
