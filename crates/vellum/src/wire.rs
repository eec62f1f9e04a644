//! Wire-format patches.
//!
//! The store's mutation protocol batches operations by kind: one wire patch
//! carries maps from match-path strings to payloads, plus at most one
//! insert. [`to_wire`] folds a patch list into such batches, grouping
//! consecutive runs of the same operation so apply order is preserved;
//! [`from_wire`] expands batches back into engine patches, tagging each with
//! the origin the caller got them from.
//!
//! Within one batch, expansion follows a fixed operation order (the struct's
//! field order). Batches produced by [`to_wire`] carry a single operation
//! kind, so this only matters for foreign payloads.

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::warn;
use vellum_path::{format_match_path, parse_match_path, Path, PathError};

use crate::patch::{InsertPosition, Origin, Patch, PatchOp};

/// An insert entry: items spliced next to the element `reference` addresses.
#[derive(Debug, Clone, PartialEq)]
pub struct WireInsert {
    pub position: InsertPosition,
    pub reference: String,
    pub items: Vec<Value>,
}

/// One wire-format patch: operations keyed by match-path strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WirePatch {
    pub set: IndexMap<String, Value>,
    pub set_if_missing: IndexMap<String, Value>,
    pub unset: Vec<String>,
    pub insert: Option<WireInsert>,
    pub merge: IndexMap<String, Value>,
    pub inc: IndexMap<String, Number>,
    pub dec: IndexMap<String, Number>,
    pub diff_match_patch: IndexMap<String, String>,
}

#[derive(Debug, Error)]
pub enum WireError {
    /// The operation exists only locally; callers lower it before encoding.
    #[error("{op} patches have no wire representation")]
    Unrepresentable { op: &'static str },

    #[error("invalid wire path {path:?}")]
    Path {
        path: String,
        #[source]
        source: PathError,
    },

    /// A recognized key carried a payload of the wrong shape.
    #[error("malformed {key:?} entry: {reason}")]
    Malformed { key: &'static str, reason: String },
}

impl WirePatch {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
            && self.set_if_missing.is_empty()
            && self.unset.is_empty()
            && self.insert.is_none()
            && self.merge.is_empty()
            && self.dec.is_empty()
            && self.inc.is_empty()
            && self.diff_match_patch.is_empty()
    }

    /// Encodes the patch as its JSON wire form. Empty groups are omitted.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        if !self.set.is_empty() {
            out.insert("set".to_string(), value_map(&self.set));
        }
        if !self.set_if_missing.is_empty() {
            out.insert("setIfMissing".to_string(), value_map(&self.set_if_missing));
        }
        if !self.unset.is_empty() {
            let paths = self.unset.iter().cloned().map(Value::String).collect();
            out.insert("unset".to_string(), Value::Array(paths));
        }
        if let Some(insert) = &self.insert {
            let mut entry = Map::new();
            entry.insert(
                insert.position.as_str().to_string(),
                Value::String(insert.reference.clone()),
            );
            entry.insert("items".to_string(), Value::Array(insert.items.clone()));
            out.insert("insert".to_string(), Value::Object(entry));
        }
        if !self.merge.is_empty() {
            out.insert("merge".to_string(), value_map(&self.merge));
        }
        if !self.inc.is_empty() {
            out.insert("inc".to_string(), number_map(&self.inc));
        }
        if !self.dec.is_empty() {
            out.insert("dec".to_string(), number_map(&self.dec));
        }
        if !self.diff_match_patch.is_empty() {
            let entries = self
                .diff_match_patch
                .iter()
                .map(|(path, text)| (path.clone(), Value::String(text.clone())))
                .collect();
            out.insert("diffMatchPatch".to_string(), Value::Object(entries));
        }
        Value::Object(out)
    }

    /// Decodes a JSON wire patch. Unsupported operation keys are logged and
    /// skipped; recognized keys with malformed payloads are errors.
    pub fn from_value(value: &Value) -> Result<WirePatch, WireError> {
        let Some(map) = value.as_object() else {
            return Err(WireError::Malformed {
                key: "patch",
                reason: "expected an object".to_string(),
            });
        };
        let mut patch = WirePatch::default();
        for (key, entry) in map {
            match key.as_str() {
                "set" => patch.set = decode_value_map("set", entry)?,
                "setIfMissing" => {
                    patch.set_if_missing = decode_value_map("setIfMissing", entry)?
                }
                "unset" => patch.unset = decode_path_list(entry)?,
                "insert" => patch.insert = decode_insert(entry)?,
                "merge" => patch.merge = decode_value_map("merge", entry)?,
                "inc" => patch.inc = decode_number_map("inc", entry)?,
                "dec" => patch.dec = decode_number_map("dec", entry)?,
                "diffMatchPatch" => patch.diff_match_patch = decode_string_map(entry)?,
                other => {
                    warn!(key = other, "skipping unsupported wire patch key");
                }
            }
        }
        Ok(patch)
    }
}

/// Encodes patches as wire batches.
///
/// Consecutive patches of the same operation share a batch as long as their
/// paths stay distinct; a repeated path starts a new batch so the second
/// write still lands after the first. Inserts always stand alone. `Move` and
/// `Replace` are local-only operations and fail the conversion.
pub fn to_wire(patches: &[Patch]) -> Result<Vec<WirePatch>, WireError> {
    let mut batches: Vec<WirePatch> = Vec::new();
    let mut current = WirePatch::default();
    let mut run: Option<&'static str> = None;

    for patch in patches {
        let name = patch.op_name();
        let path = format_match_path(&patch.path);
        let fits = run == Some(name) && !occupies(&current, name, &path);
        if !fits {
            if !current.is_empty() {
                batches.push(std::mem::take(&mut current));
            }
            run = Some(name);
        }
        match &patch.op {
            PatchOp::Set { value } => {
                current.set.insert(path, value.clone());
            }
            PatchOp::SetIfMissing { value } => {
                current.set_if_missing.insert(path, value.clone());
            }
            PatchOp::Unset => current.unset.push(path),
            PatchOp::Insert { position, items } => {
                current.insert = Some(WireInsert {
                    position: *position,
                    reference: path,
                    items: items.clone(),
                });
                batches.push(std::mem::take(&mut current));
                run = None;
            }
            PatchOp::Merge { value } => {
                current.merge.insert(path, value.clone());
            }
            PatchOp::Inc { amount } => {
                current.inc.insert(path, amount.clone());
            }
            PatchOp::Dec { amount } => {
                current.dec.insert(path, amount.clone());
            }
            PatchOp::DiffMatchPatch { value } => {
                current.diff_match_patch.insert(path, value.clone());
            }
            PatchOp::Move { .. } | PatchOp::Replace { .. } => {
                return Err(WireError::Unrepresentable {
                    op: patch.op_name(),
                });
            }
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    Ok(batches)
}

/// Expands wire batches into engine patches, each tagged with `origin`.
pub fn from_wire(origin: Origin, batches: &[WirePatch]) -> Result<Vec<Patch>, WireError> {
    let mut patches = Vec::new();
    for batch in batches {
        for (path, value) in &batch.set {
            patches.push(Patch::set(wire_path(path)?, value.clone()).with_origin(origin));
        }
        for (path, value) in &batch.set_if_missing {
            patches.push(Patch::set_if_missing(wire_path(path)?, value.clone()).with_origin(origin));
        }
        for path in &batch.unset {
            patches.push(Patch::unset(wire_path(path)?).with_origin(origin));
        }
        if let Some(insert) = &batch.insert {
            patches.push(
                Patch::insert(
                    wire_path(&insert.reference)?,
                    insert.position,
                    insert.items.clone(),
                )
                .with_origin(origin),
            );
        }
        for (path, value) in &batch.merge {
            patches.push(Patch::merge(wire_path(path)?, value.clone()).with_origin(origin));
        }
        for (path, amount) in &batch.inc {
            patches.push(Patch::inc(wire_path(path)?, amount.clone()).with_origin(origin));
        }
        for (path, amount) in &batch.dec {
            patches.push(Patch::dec(wire_path(path)?, amount.clone()).with_origin(origin));
        }
        for (path, text) in &batch.diff_match_patch {
            patches.push(Patch::diff_match_patch(wire_path(path)?, text.clone()).with_origin(origin));
        }
    }
    Ok(patches)
}

/// Whether a batch already carries an entry for `path` under operation `op`.
/// Unsets may repeat freely.
fn occupies(batch: &WirePatch, op: &str, path: &str) -> bool {
    match op {
        "set" => batch.set.contains_key(path),
        "setIfMissing" => batch.set_if_missing.contains_key(path),
        "merge" => batch.merge.contains_key(path),
        "inc" => batch.inc.contains_key(path),
        "dec" => batch.dec.contains_key(path),
        "diffMatchPatch" => batch.diff_match_patch.contains_key(path),
        _ => false,
    }
}

fn wire_path(path: &str) -> Result<Path, WireError> {
    parse_match_path(path).map_err(|source| WireError::Path {
        path: path.to_string(),
        source,
    })
}

fn value_map(entries: &IndexMap<String, Value>) -> Value {
    Value::Object(
        entries
            .iter()
            .map(|(path, value)| (path.clone(), value.clone()))
            .collect(),
    )
}

fn number_map(entries: &IndexMap<String, Number>) -> Value {
    Value::Object(
        entries
            .iter()
            .map(|(path, amount)| (path.clone(), Value::Number(amount.clone())))
            .collect(),
    )
}

fn decode_value_map(
    key: &'static str,
    entry: &Value,
) -> Result<IndexMap<String, Value>, WireError> {
    let Some(map) = entry.as_object() else {
        return Err(WireError::Malformed {
            key,
            reason: "expected an object of paths".to_string(),
        });
    };
    Ok(map
        .iter()
        .map(|(path, value)| (path.clone(), value.clone()))
        .collect())
}

fn decode_number_map(
    key: &'static str,
    entry: &Value,
) -> Result<IndexMap<String, Number>, WireError> {
    let Some(map) = entry.as_object() else {
        return Err(WireError::Malformed {
            key,
            reason: "expected an object of paths".to_string(),
        });
    };
    let mut out = IndexMap::new();
    for (path, value) in map {
        let Value::Number(amount) = value else {
            return Err(WireError::Malformed {
                key,
                reason: format!("amount at {path:?} must be a number"),
            });
        };
        out.insert(path.clone(), amount.clone());
    }
    Ok(out)
}

fn decode_string_map(entry: &Value) -> Result<IndexMap<String, String>, WireError> {
    let Some(map) = entry.as_object() else {
        return Err(WireError::Malformed {
            key: "diffMatchPatch",
            reason: "expected an object of paths".to_string(),
        });
    };
    let mut out = IndexMap::new();
    for (path, value) in map {
        let Some(text) = value.as_str() else {
            return Err(WireError::Malformed {
                key: "diffMatchPatch",
                reason: format!("patch at {path:?} must be a string"),
            });
        };
        out.insert(path.clone(), text.to_string());
    }
    Ok(out)
}

fn decode_path_list(entry: &Value) -> Result<Vec<String>, WireError> {
    let Some(list) = entry.as_array() else {
        return Err(WireError::Malformed {
            key: "unset",
            reason: "expected an array of paths".to_string(),
        });
    };
    list.iter()
        .map(|value| {
            value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| WireError::Malformed {
                    key: "unset",
                    reason: "paths must be strings".to_string(),
                })
        })
        .collect()
}

fn decode_insert(entry: &Value) -> Result<Option<WireInsert>, WireError> {
    let Some(map) = entry.as_object() else {
        return Err(WireError::Malformed {
            key: "insert",
            reason: "expected an object".to_string(),
        });
    };
    let mut position = None;
    let mut reference = None;
    let mut items = None;
    for (key, value) in map {
        match key.as_str() {
            "before" | "after" => {
                if position.is_some() {
                    return Err(WireError::Malformed {
                        key: "insert",
                        reason: "carries more than one position".to_string(),
                    });
                }
                let Some(path) = value.as_str() else {
                    return Err(WireError::Malformed {
                        key: "insert",
                        reason: "position reference must be a path string".to_string(),
                    });
                };
                position = Some(if key == "before" {
                    InsertPosition::Before
                } else {
                    InsertPosition::After
                });
                reference = Some(path.to_string());
            }
            "replace" => {
                warn!("skipping insert with unsupported position \"replace\"");
                return Ok(None);
            }
            "items" => {
                let Some(list) = value.as_array() else {
                    return Err(WireError::Malformed {
                        key: "insert",
                        reason: "items must be an array".to_string(),
                    });
                };
                items = Some(list.clone());
            }
            other => {
                warn!(key = other, "skipping unsupported insert key");
            }
        }
    }
    match (position, reference, items) {
        (Some(position), Some(reference), Some(items)) => Ok(Some(WireInsert {
            position,
            reference,
            items,
        })),
        _ => Err(WireError::Malformed {
            key: "insert",
            reason: "needs a position reference and items".to_string(),
        }),
    }
}
