//! Patch sanitization
//!
//! Section patches arrive from untrusted UI input. Keys that could reach
//! an object prototype chain in a JavaScript client reading the same blob
//! are stripped at every depth before a patch is merged.

use serde_json::{Map, Value};

const RESERVED_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

/// Check if a key is never accepted from a patch
#[inline]
#[must_use]
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key) || key.starts_with("__")
}

/// Strip reserved keys at every depth
#[must_use]
pub fn sanitize(value: Value) -> Value {
    sanitize_with_report(value).0
}

/// Strip reserved keys, returning the dotted paths that were removed
#[must_use]
pub fn sanitize_with_report(value: Value) -> (Value, Vec<String>) {
    let mut stripped = Vec::new();
    let clean = walk(value, "", &mut stripped);
    (clean, stripped)
}

/// Sanitize the members of one object
pub(crate) fn sanitize_object(object: Map<String, Value>) -> (Map<String, Value>, Vec<String>) {
    let mut stripped = Vec::new();
    let clean = walk_object(object, "", &mut stripped);
    (clean, stripped)
}

fn walk(value: Value, path: &str, stripped: &mut Vec<String>) -> Value {
    match value {
        Value::Object(object) => Value::Object(walk_object(object, path, stripped)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| walk(item, &join(path, &i.to_string()), stripped))
                .collect(),
        ),
        other => other,
    }
}

fn walk_object(
    object: Map<String, Value>,
    path: &str,
    stripped: &mut Vec<String>,
) -> Map<String, Value> {
    let mut clean = Map::with_capacity(object.len());
    for (key, value) in object {
        let child = join(path, &key);
        if is_reserved_key(&key) {
            stripped.push(child);
            continue;
        }
        clean.insert(key, walk(value, &child, stripped));
    }
    clean
}

fn join(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{path}.{segment}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn strips_top_level_prototype_keys() {
        let (clean, stripped) = sanitize_with_report(json!({
            "firstName": "Jo",
            "__proto__": { "isAdmin": true },
            "constructor": 1,
        }));
        assert_eq!(clean, json!({ "firstName": "Jo" }));
        assert_eq!(stripped, vec!["__proto__".to_string(), "constructor".to_string()]);
    }

    #[test]
    fn strips_nested_keys_inside_arrays() {
        let clean = sanitize(json!({
            "piles": { "important": ["family"], "prototype": {} },
            "tradeoffResponses": [{ "valueA": "a", "__meta": 1 }],
        }));
        assert_eq!(
            clean,
            json!({
                "piles": { "important": ["family"] },
                "tradeoffResponses": [{ "valueA": "a" }],
            })
        );
    }

    #[test]
    fn plain_values_pass_through() {
        assert_eq!(sanitize(json!(42)), json!(42));
        assert!(!is_reserved_key("_private"));
        assert!(is_reserved_key("__anything"));
    }
}
