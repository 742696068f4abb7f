//! 响应文本提取 — 按固定优先级尝试已知的响应结构
//!
//! Text extraction from generateContent responses.
//!
//! The remote API answers in a few shapes depending on the call path:
//! - `{ response: { candidates: [{ content: { parts: [{ text }] } }] } }` (wrapped)
//! - `{ candidates: [{ content: { parts: [{ text }] } }] }` (raw REST)
//! - `{ response: { text } }` (legacy wrapper)
//! - `{ text }` (first-class text field)
//!
//! [`extract_text`] runs the strategies in that order and never fails: when nothing matches,
//! the caller gets a diagnostic string that embeds the whole response.

use serde_json::Value;

/// Leading text of every diagnostic returned by [`extract_text`].
pub const EXTRACTION_FAILURE_PREFIX: &str =
    "Error: could not extract text from the model response. Full response below:\n";

/// A single extraction strategy: pure, returns a non-empty string or nothing.
pub type Extractor = fn(&Value) -> Option<String>;

/// Strategies in priority order.
pub const EXTRACTORS: &[(&str, Extractor)] = &[
    ("wrapped_candidates", wrapped_candidate_text),
    ("candidates", candidate_text),
    ("wrapped_text", wrapped_text),
    ("text", top_level_text),
];

/// First non-empty text found by [`EXTRACTORS`], or a diagnostic embedding `response`.
pub fn extract_text(response: &Value) -> String {
    try_extract_text(response).unwrap_or_else(|| diagnostic(response))
}

/// Like [`extract_text`] but without the diagnostic fallback.
pub fn try_extract_text(response: &Value) -> Option<String> {
    EXTRACTORS.iter().find_map(|(name, extractor)| {
        let text = extractor(response)?;
        tracing::trace!(strategy = *name, "extracted model text");
        Some(text)
    })
}

/// True when `text` came from the diagnostic fallback.
pub fn is_diagnostic(text: &str) -> bool {
    text.starts_with(EXTRACTION_FAILURE_PREFIX)
}

fn diagnostic(response: &Value) -> String {
    let dump = serde_json::to_string_pretty(response).unwrap_or_else(|_| response.to_string());
    format!("{EXTRACTION_FAILURE_PREFIX}{dump}")
}

fn first_part_text(candidate_root: &Value) -> Option<String> {
    candidate_root
        .pointer("/candidates/0/content/parts")?
        .as_array()?
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .find(|t| !t.is_empty())
        .map(String::from)
}

fn non_empty_str(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn wrapped_candidate_text(v: &Value) -> Option<String> {
    first_part_text(v.get("response")?)
}

fn candidate_text(v: &Value) -> Option<String> {
    first_part_text(v)
}

fn wrapped_text(v: &Value) -> Option<String> {
    non_empty_str(v.pointer("/response/text"))
}

fn top_level_text(v: &Value) -> Option<String> {
    non_empty_str(v.get("text"))
}
