use mongodb::bson::{Bson, Document};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::mongo::relaxed_json;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterParseError {
    #[error("JSON parse error: {0}")]
    Json(String),

    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("extended JSON error: {0}")]
    ExtendedJson(String),
}

/// Parses the search-bar text into a `find` filter.
///
/// Accepts strict or shell-style JSON, optionally wrapped as
/// `db.<collection>.find(<filter>)`. Blank input is the empty filter.
pub fn parse_filter(text: &str) -> Result<Document, FilterParseError> {
    let trimmed = text.trim();
    let candidate = if trimmed.starts_with("db.") {
        extract_find_argument(trimmed).unwrap_or(trimmed)
    } else {
        trimmed
    };
    let cleaned = candidate.trim().trim_end_matches(';').trim();
    if cleaned.is_empty() {
        return Ok(Document::new());
    }

    parse_object(&relaxed_json::normalize(cleaned))
}

/// Parses a document body returned by the external editor.
pub fn parse_document(text: &str) -> Result<Document, FilterParseError> {
    parse_object(text.trim())
}

/// Pretty, relaxed extended JSON for a document.
pub fn marshal_document(document: &Document) -> String {
    let value = Bson::Document(document.clone()).into_relaxed_extjson();
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

/// Body handed to the external editor. Relaxed extended JSON, except that
/// `Int64` values keep their `$numberLong` wrapper so a save does not narrow
/// them to `Int32`.
pub fn editor_body(document: &Document) -> String {
    let value = editor_value(Bson::Document(document.clone()));
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

fn editor_value(bson: Bson) -> Value {
    match bson {
        Bson::Int64(n) => json!({ "$numberLong": n.to_string() }),
        Bson::Document(document) => Value::Object(
            document.into_iter().map(|(key, value)| (key, editor_value(value))).collect::<Map<_, _>>(),
        ),
        Bson::Array(items) => Value::Array(items.into_iter().map(editor_value).collect()),
        other => other.into_relaxed_extjson(),
    }
}

fn parse_object(text: &str) -> Result<Document, FilterParseError> {
    let value: Value =
        serde_json::from_str(text).map_err(|error| FilterParseError::Json(error.to_string()))?;
    if !value.is_object() {
        return Err(FilterParseError::NotAnObject(json_kind(&value)));
    }

    match Bson::try_from(value) {
        Ok(Bson::Document(document)) => Ok(document),
        Ok(other) => Err(FilterParseError::ExtendedJson(format!(
            "object decoded to {:?}, not a document",
            other.element_type()
        ))),
        Err(error) => Err(FilterParseError::ExtendedJson(error.to_string())),
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

fn extract_find_argument(text: &str) -> Option<&str> {
    const MARKER: &str = ".find(";
    let start = text.find(MARKER)? + MARKER.len();
    let mut depth = 0u32;

    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return Some(&text[start..start + offset]);
                }
                depth -= 1;
            }
            _ => {}
        }
    }

    None
}
