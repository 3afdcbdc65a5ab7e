//! Flattening of hierarchical token documents into `(path, Token)` pairs.

use crate::token::Token;
use serde_json::{Map, Value};
use tracing::debug;

/// Flatten a document. Group `$type` is inherited by descendants; other `$` keys are ignored.
pub(crate) fn flatten(contents: &Value) -> Vec<(String, Token)> {
    let mut out = Vec::new();
    if let Value::Object(map) = contents {
        let root_type = map.get("$type").and_then(Value::as_str);
        walk("", map, root_type, &mut out);
    }
    out
}

fn walk(
    prefix: &str,
    node: &Map<String, Value>,
    inherited: Option<&str>,
    out: &mut Vec<(String, Token)>,
) {
    for (key, child) in node {
        if key.starts_with('$') {
            continue;
        }
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        match child {
            Value::Object(map) if map.contains_key("$value") => {
                let Some(value) = map.get("$value").and_then(scalar_text) else {
                    debug!(path = %path, "skipping token with null $value");
                    continue;
                };
                let token_type = map
                    .get("$type")
                    .and_then(Value::as_str)
                    .or(inherited)
                    .map(str::to_string);
                let description = map
                    .get("$description")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                out.push((
                    path,
                    Token {
                        value,
                        token_type,
                        description,
                    },
                ));
            }
            Value::Object(map) => {
                let group_type = map.get("$type").and_then(Value::as_str).or(inherited);
                walk(&path, map, group_type, out);
            }
            other => match scalar_text(other) {
                Some(value) => out.push((
                    path,
                    Token {
                        value,
                        token_type: inherited.map(str::to_string),
                        description: None,
                    },
                )),
                None => debug!(path = %path, "skipping null token"),
            },
        }
    }
}

/// Strings as-is; numbers and booleans as their JSON text; arrays/objects as compact JSON.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            Some(value.to_string())
        }
    }
}
