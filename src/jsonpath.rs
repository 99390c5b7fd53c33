//! Dotted-path navigation of a parsed JSON response body.
//!
//! This is intentionally not a full JSONPath implementation: the scenario
//! format only ever needs "walk into an object by key, optionally through
//! one array index", which is what `{%PATH[i]:a.b.2.c:ENDPATH%}` expresses.

use serde_json::Value;

/// Parse response bytes as a JSON object, falling back to a JSON array of
/// objects. Either shape is walkable by [`get_by_path`]; anything else is
/// rejected immediately since the extractor has nothing to navigate.
pub fn parse_body(body: &[u8]) -> Option<Value> {
    if let Ok(v) = serde_json::from_slice::<serde_json::Map<String, Value>>(body) {
        return Some(Value::Object(v));
    }
    if let Ok(v) = serde_json::from_slice::<Vec<serde_json::Map<String, Value>>>(body) {
        return Some(Value::Array(v.into_iter().map(Value::Object).collect()));
    }
    None
}

/// Walk `value` by the dot-separated `path`, returning the canonical string
/// rendering of whatever scalar is found at the end.
///
/// Rules (mirrors the specification's extractor contract):
/// - an object consumes one path segment as a key and descends;
/// - an array requires at least two remaining segments: the first is parsed
///   as a base-10 index, bounds-checked, and the object found there
///   continues navigation with the remaining segments;
/// - anything else is a dead end.
pub fn get_by_path(value: &Value, path: &[&str]) -> Result<String, String> {
    if path.is_empty() {
        return Err("the path was not found".to_string());
    }

    match value {
        Value::Object(map) => {
            let key = path[0];
            match map.get(key) {
                Some(found) => {
                    if path.len() == 1 {
                        Ok(render_scalar(found))
                    } else {
                        get_by_path(found, &path[1..])
                    }
                }
                None => Err("the path was not found".to_string()),
            }
        }
        Value::Array(items) => {
            if path.len() < 2 {
                return Err("the path was not found".to_string());
            }
            let index: usize = path[0]
                .parse()
                .map_err(|_| format!("invalid array index: {}", path[0]))?;
            let item = items
                .get(index)
                .ok_or_else(|| format!("the index [{}] provided does not exist", index))?;
            match item {
                Value::Object(map) => {
                    let key = path[1];
                    match map.get(key) {
                        Some(found) => {
                            if path.len() == 2 {
                                Ok(render_scalar(found))
                            } else {
                                get_by_path(found, &path[2..])
                            }
                        }
                        None => Err("the path was not found".to_string()),
                    }
                }
                _ => Err("the path was not found".to_string()),
            }
        }
        _ => Err("the path was not found".to_string()),
    }
}

/// Canonical "value printed as a string" rendering: no surrounding quotes
/// on strings, numbers as the parser produced them, and JSON text for
/// anything structured.
fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
