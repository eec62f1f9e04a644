//! Stable array-item keys.
//!
//! Array elements carry a `_key` attribute so edits can address them by
//! identity instead of position. Keys are short random hex strings; the
//! store only requires uniqueness within one array.

use rand::Rng;
use serde_json::Value;

const KEY_LENGTH: usize = 12;

/// Generate a fresh random item key.
pub fn generate_key() -> String {
    let mut rng = rand::thread_rng();
    let mut key = String::with_capacity(KEY_LENGTH);
    for _ in 0..KEY_LENGTH {
        let nibble: u8 = rng.gen_range(0..16);
        key.push(char::from_digit(nibble as u32, 16).unwrap_or('0'));
    }
    key
}

/// Add a `_key` to an object that lacks one. Non-objects are left alone.
pub fn ensure_key(value: &mut Value) {
    if let Value::Object(map) = value {
        if !map.contains_key("_key") {
            map.insert("_key".to_string(), Value::String(generate_key()));
        }
    }
}

/// Walk a value and key every object element of every array.
///
/// Returns the rewritten value; untouched subtrees are copied as-is.
pub fn ensure_array_keys_deep(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| {
                    let mut item = ensure_array_keys_deep(item);
                    ensure_key(&mut item);
                    item
                })
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, ensure_array_keys_deep(v)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generate_key_shape() {
        let key = generate_key();
        assert_eq!(key.len(), KEY_LENGTH);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_key_unique() {
        // Not a strict guarantee, but collisions at this length would be a bug
        let a = generate_key();
        let b = generate_key();
        assert_ne!(a, b);
    }

    #[test]
    fn test_ensure_key_adds_when_missing() {
        let mut value = json!({"text": "hi"});
        ensure_key(&mut value);
        assert!(value.get("_key").is_some());
    }

    #[test]
    fn test_ensure_key_keeps_existing() {
        let mut value = json!({"_key": "abc", "text": "hi"});
        ensure_key(&mut value);
        assert_eq!(value["_key"], json!("abc"));
    }

    #[test]
    fn test_ensure_key_ignores_non_objects() {
        let mut value = json!("scalar");
        ensure_key(&mut value);
        assert_eq!(value, json!("scalar"));
    }

    #[test]
    fn test_ensure_array_keys_deep() {
        let value = json!({
            "rows": [
                {"cells": [{"v": 1}, {"_key": "keep", "v": 2}]},
                "plain string",
            ]
        });
        let keyed = ensure_array_keys_deep(value);

        let rows = keyed["rows"].as_array().unwrap();
        assert!(rows[0].get("_key").is_some());
        assert_eq!(rows[1], json!("plain string"));

        let cells = rows[0]["cells"].as_array().unwrap();
        assert!(cells[0].get("_key").is_some());
        assert_eq!(cells[1]["_key"], json!("keep"));
    }
}
