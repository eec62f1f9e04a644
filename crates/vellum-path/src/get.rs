//! Resolving paths against JSON documents.

use crate::Segment;
use serde_json::Value;

/// Resolve a possibly-negative index against an array length.
///
/// Negative indexes count from the end, so `-1` is the last element.
/// Returns `None` when the index falls outside the array.
///
/// # Example
///
/// ```
/// use vellum_path::resolve_index;
///
/// assert_eq!(resolve_index(0, 3), Some(0));
/// assert_eq!(resolve_index(-1, 3), Some(2));
/// assert_eq!(resolve_index(-3, 3), Some(0));
/// assert_eq!(resolve_index(3, 3), None);
/// assert_eq!(resolve_index(-4, 3), None);
/// ```
pub fn resolve_index(index: i64, len: usize) -> Option<usize> {
    if index >= 0 {
        let i = index as usize;
        if i < len {
            Some(i)
        } else {
            None
        }
    } else {
        len.checked_sub(index.unsigned_abs() as usize)
    }
}

/// Position of the element a segment addresses within `items`.
///
/// A matcher segment addresses the first element whose attribute equals the
/// match value. Field segments never address array elements.
pub fn index_of(items: &[Value], segment: &Segment) -> Option<usize> {
    match segment {
        Segment::Index(index) => resolve_index(*index, items.len()),
        Segment::Key { attribute, value } => items
            .iter()
            .position(|item| item.get(attribute.as_str()) == Some(value)),
        Segment::Field(_) => None,
    }
}

/// Get a value from a JSON document by path.
///
/// Returns `None` if the path does not resolve.
///
/// # Example
///
/// ```
/// use vellum_path::{get, parse_match_path};
/// use serde_json::json;
///
/// let doc = json!({"rows": [{"_key": "a", "n": 1}, {"_key": "b", "n": 2}]});
/// let path = parse_match_path("rows[_key==\"b\"].n").unwrap();
/// assert_eq!(get(&doc, &path), Some(&json!(2)));
///
/// let missing = parse_match_path("rows[_key==\"c\"]").unwrap();
/// assert_eq!(get(&doc, &missing), None);
/// ```
pub fn get<'a>(doc: &'a Value, path: &[Segment]) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path {
        current = match current {
            Value::Object(map) => match segment {
                Segment::Field(name) => map.get(name)?,
                _ => return None,
            },
            Value::Array(items) => {
                let index = index_of(items, segment)?;
                &items[index]
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Get a mutable reference to a value in a JSON document by path.
pub fn get_mut<'a>(doc: &'a mut Value, path: &[Segment]) -> Option<&'a mut Value> {
    let mut current = doc;
    for segment in path {
        current = match current {
            Value::Object(map) => match segment {
                Segment::Field(name) => map.get_mut(name)?,
                _ => return None,
            },
            Value::Array(items) => {
                let index = index_of(items, segment)?;
                items.get_mut(index)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Check if a path resolves to a value in the document.
pub fn exists(doc: &Value, path: &[Segment]) -> bool {
    get(doc, path).is_some()
}
