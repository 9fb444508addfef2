//! Turns raw model output into loosely typed [`ParsedFields`].
//!
//! Providers wrap structured output in all sorts of noise: code fences,
//! a sentence of preamble, trailing commentary or raw newlines inside string
//! literals. The parser looks for the first `{` that starts a complete JSON
//! object and ignores everything around it.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::{Error, Result};

/// A single untyped value produced by the model.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Null,
    /// Arrays and objects. No shape accepts these as primitives.
    Nested(Value),
}

impl FieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "string",
            FieldValue::Number(_) => "number",
            FieldValue::Bool(_) => "boolean",
            FieldValue::Null => "null",
            FieldValue::Nested(Value::Array(_)) => "array",
            FieldValue::Nested(_) => "object",
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => FieldValue::Text(s),
            Value::Number(n) => n.as_f64().map(FieldValue::Number).unwrap_or(FieldValue::Null),
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Null => FieldValue::Null,
            other => FieldValue::Nested(other),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{:?}", s),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Null => f.write_str("null"),
            FieldValue::Nested(v) => write!(f, "{}", v),
        }
    }
}

/// Field name to untyped value, as decoded from a model response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFields(BTreeMap<String, FieldValue>);

impl ParsedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.0.remove(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for ParsedFields {
    fn from(map: Map<String, Value>) -> Self {
        Self(map.into_iter().map(|(k, v)| (k, FieldValue::from(v))).collect())
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for ParsedFields {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Extract the first well-formed JSON object embedded in `raw`.
pub fn parse(raw: &str) -> Result<ParsedFields> {
    if let Some(map) = first_object(raw) {
        return Ok(map.into());
    }

    let repaired = escape_control_chars(raw);
    if repaired != raw {
        if let Some(map) = first_object(&repaired) {
            tracing::debug!("Recovered JSON object after escaping control characters");
            return Ok(map.into());
        }
    }

    Err(Error::MalformedResponse(format!(
        "no JSON object found in response: {}",
        preview(raw)
    )))
}

fn first_object(text: &str) -> Option<Map<String, Value>> {
    text.match_indices('{')
        .find_map(|(start, _)| leading_object(&text[start..]))
}

/// Decode the JSON object at the very start of `text`, ignoring anything after it.
fn leading_object(text: &str) -> Option<Map<String, Value>> {
    let mut stream = serde_json::Deserializer::from_str(text).into_iter::<Value>();
    match stream.next() {
        Some(Ok(Value::Object(map))) => Some(map),
        _ => None,
    }
}

/// Escape raw control characters that appear inside string literals.
///
/// Quotes only open a string inside braces, so prose around the object
/// cannot flip the string state.
fn escape_control_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if !in_string {
            match c {
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                '"' if depth > 0 => in_string = true,
                _ => {}
            }
            out.push(c);
            continue;
        }

        if escaped {
            escaped = false;
            out.push(c);
            continue;
        }

        match c {
            '\\' => {
                escaped = true;
                out.push(c);
            }
            '"' => {
                in_string = false;
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }

    out
}

fn preview(raw: &str) -> String {
    const MAX: usize = 120;
    let trimmed = raw.trim();
    if trimmed.chars().count() <= MAX {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(MAX).collect();
    format!("{}...", cut)
}
