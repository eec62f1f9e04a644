//! Patch application.
//!
//! [`apply`] is a pure function from a current value to the next one. The
//! current value is an `Option` because a node can be absent from its parent,
//! which is a different thing than holding JSON `null`. Dispatch happens on
//! the runtime shape of the value, not on any schema, so this engine works on
//! bare `serde_json::Value` trees.

use serde_json::{Map, Number, Value};
use vellum_path::{index_of, resolve_index, Segment};

use super::types::{InsertPosition, Patch, PatchError, PatchOp};
use crate::dmp;

/// Applies a single patch, returning the new value. `None` means the value
/// was removed (or never existed).
pub fn apply(value: Option<Value>, patch: &Patch) -> Result<Option<Value>, PatchError> {
    match value {
        Some(Value::Array(items)) => apply_array(items, patch),
        Some(Value::String(text)) => apply_string(text, patch),
        Some(Value::Object(map)) => apply_object(map, patch),
        other => apply_primitive(other, patch),
    }
}

/// Applies patches left to right, stopping at the first error.
pub fn apply_all(value: Option<Value>, patches: &[Patch]) -> Result<Option<Value>, PatchError> {
    patches
        .iter()
        .try_fold(value, |current, patch| apply(current, patch))
}

/// The same patch aimed one level deeper.
fn descend(patch: &Patch) -> Patch {
    Patch {
        path: patch.path[1..].to_vec(),
        origin: patch.origin,
        op: patch.op.clone(),
    }
}

fn kind_name(value: &Option<Value>) -> &'static str {
    match value {
        None => "a missing value",
        Some(v) => value_kind(v),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Arrays ──────────────────────────────────────────────────────────────────

fn apply_array(items: Vec<Value>, patch: &Patch) -> Result<Option<Value>, PatchError> {
    let Some(head) = patch.path.first() else {
        return apply_array_here(items, patch);
    };
    let tail_empty = patch.path.len() == 1;

    match &patch.op {
        PatchOp::Insert {
            position,
            items: new_items,
        } if tail_empty => {
            let at = splice_position(&items, head, *position)?;
            let mut next = items;
            next.splice(at..at, new_items.iter().cloned());
            Ok(Some(Value::Array(next)))
        }
        PatchOp::Unset if tail_empty => {
            let index = element_index(&items, head)?;
            let mut next = items;
            next.remove(index);
            Ok(Some(Value::Array(next)))
        }
        _ => {
            let index = element_index(&items, head)?;
            let mut next = items;
            let current = std::mem::take(&mut next[index]);
            next[index] = apply(Some(current), &descend(patch))?.unwrap_or(Value::Null);
            Ok(Some(Value::Array(next)))
        }
    }
}

fn apply_array_here(items: Vec<Value>, patch: &Patch) -> Result<Option<Value>, PatchError> {
    match &patch.op {
        PatchOp::Set { value } => {
            if value.is_array() {
                Ok(Some(value.clone()))
            } else {
                Err(PatchError::TypeMismatch {
                    op: "set",
                    expected: "an array",
                    found: value_kind(value),
                })
            }
        }
        PatchOp::SetIfMissing { .. } => Ok(Some(Value::Array(items))),
        PatchOp::Unset => Ok(None),
        PatchOp::Move { from, to } => apply_move(items, *from, *to),
        other => Err(PatchError::UnsupportedOp {
            op: other.name(),
            kind: "an array",
        }),
    }
}

/// Removes the element at `from` and reinserts it at `to`, with `to`
/// interpreted against the array after removal. Negative positions count
/// from the end.
fn apply_move(items: Vec<Value>, from: i64, to: i64) -> Result<Option<Value>, PatchError> {
    let from_index = resolve_index(from, items.len()).ok_or(PatchError::OutOfBounds {
        index: from,
        len: items.len(),
    })?;
    let mut next = items;
    let moved = next.remove(from_index);
    let to_index = if to < 0 { next.len() as i64 + to } else { to };
    if to_index < 0 || to_index > next.len() as i64 {
        return Err(PatchError::OutOfBounds {
            index: to,
            len: next.len(),
        });
    }
    next.insert(to_index as usize, moved);
    Ok(Some(Value::Array(next)))
}

/// Index of the element `segment` addresses, or an error describing why it
/// does not resolve.
fn element_index(items: &[Value], segment: &Segment) -> Result<usize, PatchError> {
    match segment {
        Segment::Index(index) => resolve_index(*index, items.len()).ok_or(PatchError::OutOfBounds {
            index: *index,
            len: items.len(),
        }),
        Segment::Key { .. } => index_of(items, segment).ok_or_else(|| PatchError::NoMatch {
            matcher: segment.to_string(),
        }),
        Segment::Field(_) => Err(PatchError::ExpectedElement {
            segment: segment.to_string(),
        }),
    }
}

/// Splice offset for an insert relative to `segment`. Unlike
/// [`element_index`] the raw index is not required to address a live element:
/// `[-1]` plus `After` appends even to an empty array, and `[0]` plus
/// `Before` prepends. The offset is clamped at zero on the low end but a
/// past-the-end target is an error.
fn splice_position(
    items: &[Value],
    segment: &Segment,
    position: InsertPosition,
) -> Result<usize, PatchError> {
    let len = items.len() as i64;
    let raw = match segment {
        Segment::Index(index) => {
            if *index < 0 {
                len + *index
            } else {
                *index
            }
        }
        Segment::Key { .. } => index_of(items, segment).ok_or_else(|| PatchError::NoMatch {
            matcher: segment.to_string(),
        })? as i64,
        Segment::Field(_) => {
            return Err(PatchError::ExpectedElement {
                segment: segment.to_string(),
            })
        }
    };
    let at = match position {
        InsertPosition::Before => raw,
        InsertPosition::After => raw + 1,
    };
    let at = at.max(0);
    if at > len {
        return Err(PatchError::BadInsertPosition {
            pos: at as usize,
            len: items.len(),
        });
    }
    Ok(at as usize)
}

// ── Strings ─────────────────────────────────────────────────────────────────

fn apply_string(text: String, patch: &Patch) -> Result<Option<Value>, PatchError> {
    if !patch.path.is_empty() {
        return Err(PatchError::DeepPath { kind: "a string" });
    }
    match &patch.op {
        PatchOp::Set { value } | PatchOp::Replace { value } => Ok(Some(value.clone())),
        PatchOp::SetIfMissing { .. } => Ok(Some(Value::String(text))),
        PatchOp::Unset => Ok(None),
        PatchOp::DiffMatchPatch { value } => {
            let patches = dmp::parse(value)?;
            let next = dmp::apply(&patches, &text)?;
            Ok(Some(Value::String(next)))
        }
        other => Err(PatchError::UnsupportedOp {
            op: other.name(),
            kind: "a string",
        }),
    }
}

// ── Objects ─────────────────────────────────────────────────────────────────

fn apply_object(map: Map<String, Value>, patch: &Patch) -> Result<Option<Value>, PatchError> {
    let Some(head) = patch.path.first() else {
        return apply_object_here(map, patch);
    };
    let Some(field) = head.as_field() else {
        return Err(PatchError::ExpectedField {
            segment: head.to_string(),
        });
    };
    let field = field.to_string();
    let mut next = map;
    let current = next.get(&field).cloned();
    match apply(current, &descend(patch))? {
        Some(value) => {
            next.insert(field, value);
        }
        None => {
            next.shift_remove(&field);
        }
    }
    Ok(Some(Value::Object(next)))
}

fn apply_object_here(map: Map<String, Value>, patch: &Patch) -> Result<Option<Value>, PatchError> {
    match &patch.op {
        PatchOp::Set { value } => {
            if value.is_object() {
                Ok(Some(value.clone()))
            } else {
                Err(PatchError::TypeMismatch {
                    op: "set",
                    expected: "an object",
                    found: value_kind(value),
                })
            }
        }
        PatchOp::SetIfMissing { .. } => Ok(Some(Value::Object(map))),
        PatchOp::Unset => Ok(None),
        PatchOp::Merge { value } => match value {
            Value::Object(extra) => {
                let mut next = map;
                for (key, value) in extra {
                    next.insert(key.clone(), value.clone());
                }
                Ok(Some(Value::Object(next)))
            }
            other => Err(PatchError::TypeMismatch {
                op: "merge",
                expected: "an object",
                found: value_kind(other),
            }),
        },
        other => Err(PatchError::UnsupportedOp {
            op: other.name(),
            kind: "an object",
        }),
    }
}

// ── Primitives and missing values ───────────────────────────────────────────

fn apply_primitive(value: Option<Value>, patch: &Patch) -> Result<Option<Value>, PatchError> {
    if !patch.path.is_empty() {
        return Err(PatchError::DeepPath {
            kind: kind_name(&value),
        });
    }
    match &patch.op {
        PatchOp::Set { value: new } | PatchOp::Replace { value: new } => Ok(Some(new.clone())),
        PatchOp::SetIfMissing { value: new } => {
            if matches!(value, None | Some(Value::Null)) {
                Ok(Some(new.clone()))
            } else {
                Ok(value)
            }
        }
        PatchOp::Unset => Ok(None),
        PatchOp::Inc { amount } => apply_delta(value, amount, false),
        PatchOp::Dec { amount } => apply_delta(value, amount, true),
        PatchOp::Merge { .. } => Err(PatchError::TypeMismatch {
            op: "merge",
            expected: "an object",
            found: kind_name(&value),
        }),
        other => Err(PatchError::UnsupportedOp {
            op: other.name(),
            kind: kind_name(&value),
        }),
    }
}

fn apply_delta(
    value: Option<Value>,
    amount: &Number,
    negate: bool,
) -> Result<Option<Value>, PatchError> {
    let op = if negate { "dec" } else { "inc" };
    let current = match &value {
        Some(Value::Number(n)) => n,
        _ => {
            return Err(PatchError::TypeMismatch {
                op,
                expected: "a number",
                found: kind_name(&value),
            })
        }
    };
    let next = add_numbers(current, amount, negate).ok_or(PatchError::InvalidNumber { op })?;
    Ok(Some(Value::Number(next)))
}

/// Adds (or subtracts) two JSON numbers, staying in integer arithmetic when
/// both sides are integers.
fn add_numbers(current: &Number, amount: &Number, negate: bool) -> Option<Number> {
    if let (Some(a), Some(b)) = (current.as_i64(), amount.as_i64()) {
        let b = if negate { b.checked_neg()? } else { b };
        return a.checked_add(b).map(Number::from);
    }
    let a = current.as_f64()?;
    let b = amount.as_f64()?;
    let result = if negate { a - b } else { a + b };
    Number::from_f64(result)
}
