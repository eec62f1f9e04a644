//! Array containers.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use vellum_path::{resolve_index, Segment};

use super::{primitive::PrimitiveContainer, ValueNode};
use crate::key::ensure_key;
use crate::patch::{apply as apply_patch, InsertPosition, Patch, PatchError, PatchOp};
use crate::schema::{ArrayType, SchemaType};
use crate::validation::ValidationResult;

/// A raw array bound to its [`ArrayType`].
///
/// Each element is wrapped under the member type it matches. Elements no
/// declared member accounts for are kept as untyped leaves so they survive
/// round trips and show up in validation.
#[derive(Debug, Clone)]
pub struct ArrayContainer {
    ty: Arc<ArrayType>,
    items: Vec<Arc<ValueNode>>,
}

impl ArrayContainer {
    pub fn deserialize(raw: Option<&Vec<Value>>, ty: Arc<ArrayType>) -> ArrayContainer {
        let items = raw
            .map(|list| {
                list.iter()
                    .map(|item| Arc::new(wrap_item(item, &ty)))
                    .collect()
            })
            .unwrap_or_default();
        ArrayContainer { ty, items }
    }

    pub fn ty(&self) -> &Arc<ArrayType> {
        &self.ty
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get_index(&self, index: usize) -> Option<&ValueNode> {
        self.items.get(index).map(Arc::as_ref)
    }

    /// Position of the element with the given `_key`.
    pub fn key_index(&self, key: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.item_key() == Some(key))
    }

    pub fn by_key(&self, key: &str) -> Option<&ValueNode> {
        self.key_index(key).and_then(|index| self.get_index(index))
    }

    /// Replaces one element from a raw value.
    pub fn set_index(&self, index: usize, raw: Value) -> Result<ArrayContainer, PatchError> {
        if index >= self.items.len() {
            return Err(PatchError::OutOfBounds {
                index: index as i64,
                len: self.items.len(),
            });
        }
        let mut next = self.clone();
        next.items[index] = Arc::new(wrap_item(&raw, &self.ty));
        Ok(next)
    }

    /// Splices raw items in at `pos`, which must lie in `[0, len]`. Object
    /// items lacking a `_key` get a fresh one before wrapping.
    pub fn insert_items_at(
        &self,
        pos: usize,
        items: Vec<Value>,
    ) -> Result<ArrayContainer, PatchError> {
        if pos > self.items.len() {
            return Err(PatchError::BadInsertPosition {
                pos,
                len: self.items.len(),
            });
        }
        let wrapped: Vec<Arc<ValueNode>> = items
            .into_iter()
            .map(|mut raw| {
                ensure_key(&mut raw);
                Arc::new(wrap_item(&raw, &self.ty))
            })
            .collect();
        let mut next = self.clone();
        next.items.splice(pos..pos, wrapped);
        Ok(next)
    }

    /// Removes the elements at the given positions. Positions outside the
    /// array are ignored.
    pub fn unset_indices(&self, indices: &[usize]) -> ArrayContainer {
        let drop: HashSet<usize> = indices.iter().copied().collect();
        let items = self
            .items
            .iter()
            .enumerate()
            .filter(|(index, _)| !drop.contains(index))
            .map(|(_, item)| item.clone())
            .collect();
        ArrayContainer {
            ty: self.ty.clone(),
            items,
        }
    }

    pub fn get(&self) -> Option<Value> {
        self.assemble(true)
    }

    pub fn serialize(&self) -> Option<Value> {
        self.assemble(false)
    }

    fn assemble(&self, raw_view: bool) -> Option<Value> {
        if self.items.is_empty() {
            return None;
        }
        let items = self
            .items
            .iter()
            .map(|item| {
                let value = if raw_view { item.get() } else { item.serialize() };
                value.unwrap_or(Value::Null)
            })
            .collect();
        Some(Value::Array(items))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        if self.ty.required && self.is_empty() {
            result.add_error("required", "This field is required");
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut duplicates: Vec<&str> = Vec::new();
        for (index, item) in self.items.iter().enumerate() {
            let mut child = item.validate();
            let keyable = matches!(
                item.as_ref(),
                ValueNode::Object(_) | ValueNode::Reference(_)
            );
            match item.item_key() {
                Some(key) => {
                    if !seen.insert(key) && !duplicates.contains(&key) {
                        duplicates.push(key);
                    }
                }
                None => {
                    if keyable && !item.is_empty() {
                        child.add_warning("missing-key", "Item is missing its _key attribute");
                    }
                }
            }
            result.add_item(index, child);
        }
        for key in duplicates {
            result.add_warning("duplicate-keys", format!("Duplicate item key {key:?}"));
        }
        result
    }

    pub fn apply(&self, patch: &Patch) -> Result<ValueNode, PatchError> {
        let Some(head) = patch.path.first() else {
            return self.apply_raw(patch);
        };
        let tail_empty = patch.path.len() == 1;

        match &patch.op {
            PatchOp::Insert { position, items } if tail_empty => {
                let at = self.splice_target(head, *position)?;
                Ok(ValueNode::Array(self.insert_items_at(at, items.clone())?))
            }
            PatchOp::Unset if tail_empty => {
                let index = self.element_index(head)?;
                Ok(ValueNode::Array(self.unset_indices(&[index])))
            }
            _ => {
                let index = self.element_index(head)?;
                let child_patch = Patch {
                    path: patch.path[1..].to_vec(),
                    origin: patch.origin,
                    op: patch.op.clone(),
                };
                let next_child = self.items[index].apply(&child_patch)?;
                let mut next = self.clone();
                next.items[index] = Arc::new(next_child);
                Ok(ValueNode::Array(next))
            }
        }
    }

    fn apply_raw(&self, patch: &Patch) -> Result<ValueNode, PatchError> {
        let next = apply_patch(self.get(), patch)?;
        Ok(ValueNode::deserialize(
            next.as_ref(),
            &SchemaType::Array(self.ty.clone()),
        ))
    }

    /// Index of the element `segment` addresses.
    fn element_index(&self, segment: &Segment) -> Result<usize, PatchError> {
        match segment {
            Segment::Index(index) => {
                resolve_index(*index, self.items.len()).ok_or(PatchError::OutOfBounds {
                    index: *index,
                    len: self.items.len(),
                })
            }
            Segment::Key { attribute, value } => self
                .items
                .iter()
                .position(|item| item.attribute_equals(attribute, value))
                .ok_or_else(|| PatchError::NoMatch {
                    matcher: segment.to_string(),
                }),
            Segment::Field(_) => Err(PatchError::ExpectedElement {
                segment: segment.to_string(),
            }),
        }
    }

    /// Splice offset for an insert relative to `segment`, clamped at zero on
    /// the low end so prepending to an empty array works.
    fn splice_target(
        &self,
        segment: &Segment,
        position: InsertPosition,
    ) -> Result<usize, PatchError> {
        let len = self.items.len() as i64;
        let raw = match segment {
            Segment::Index(index) => {
                if *index < 0 {
                    len + *index
                } else {
                    *index
                }
            }
            Segment::Key { attribute, value } => self
                .items
                .iter()
                .position(|item| item.attribute_equals(attribute, value))
                .ok_or_else(|| PatchError::NoMatch {
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
                len: self.items.len(),
            });
        }
        Ok(at as usize)
    }
}

/// Wraps one raw element under the member type it matches, or as an untyped
/// leaf when nothing matches.
fn wrap_item(raw: &Value, ty: &Arc<ArrayType>) -> ValueNode {
    match ty.member_for(raw) {
        Some(member) => ValueNode::deserialize(Some(raw), member),
        None => ValueNode::Primitive(PrimitiveContainer::untyped(Some(raw.clone()))),
    }
}
