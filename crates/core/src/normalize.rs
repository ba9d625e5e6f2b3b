use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::NormalizeError;

static OPENING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```(?:json)?\n?").expect("opening fence pattern is valid"));
static CLOSING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n?```$").expect("closing fence pattern is valid"));
static BRACE_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("brace span pattern is valid"));

/// Recovers the JSON object a model wrapped in prose or markdown fences.
///
/// Tiers, in order: strip a leading code fence (optionally tagged `json`)
/// and its closing fence, parse the greedy first-`{` to last-`}` span, and
/// only when no span exists parse the whole cleaned text.
pub fn extract_json_object(raw: &str) -> Result<Map<String, Value>, NormalizeError> {
    let mut cleaned = raw.trim().to_string();
    if cleaned.is_empty() {
        return Err(NormalizeError::Empty);
    }

    if cleaned.starts_with("```") {
        cleaned = OPENING_FENCE.replace(&cleaned, "").into_owned();
        cleaned = CLOSING_FENCE.replace(&cleaned, "").into_owned();
    }

    let candidate = BRACE_SPAN
        .find(&cleaned)
        .map(|span| span.as_str())
        .unwrap_or(cleaned.as_str());

    match serde_json::from_str::<Value>(candidate)? {
        Value::Object(object) => Ok(object),
        other => Err(NormalizeError::NotAnObject(json_kind(&other))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
