//! Leaf containers.

use serde_json::Value;

use super::ValueNode;
use crate::patch::{apply as apply_patch, Patch, PatchError};
use crate::schema::SchemaType;
use crate::validation::ValidationResult;

/// A leaf value, typed or not.
///
/// Primitive schema types produce typed leaves. The container also does two
/// fallback jobs: it holds raw values whose shape contradicts their declared
/// type, and (untyped) array elements no member type accounts for. In both
/// cases the raw value is preserved exactly and validation reports the
/// problem instead of anything being dropped.
#[derive(Debug, Clone)]
pub struct PrimitiveContainer {
    ty: Option<SchemaType>,
    value: Option<Value>,
}

impl PrimitiveContainer {
    pub fn new(value: Option<Value>, ty: Option<SchemaType>) -> PrimitiveContainer {
        let value = value.filter(|v| !v.is_null());
        PrimitiveContainer { ty, value }
    }

    /// A leaf with no governing type.
    pub fn untyped(value: Option<Value>) -> PrimitiveContainer {
        PrimitiveContainer::new(value, None)
    }

    pub fn ty(&self) -> Option<&SchemaType> {
        self.ty.as_ref()
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Absent values and empty strings both count as empty.
    pub fn is_empty(&self) -> bool {
        match &self.value {
            None => true,
            Some(Value::String(text)) => text.is_empty(),
            Some(_) => false,
        }
    }

    pub fn get(&self) -> Option<Value> {
        self.value.clone()
    }

    pub fn serialize(&self) -> Option<Value> {
        if self.is_empty() {
            None
        } else {
            self.value.clone()
        }
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        if let (Some(ty), Some(value)) = (&self.ty, &self.value) {
            if !ty.matches_shape(value) {
                result.add_error(
                    "invalid-type",
                    format!("Value does not have the shape of type {:?}", ty.name()),
                );
            }
        }
        if let Some(ty) = &self.ty {
            if ty.is_required() && self.is_empty() {
                result.add_error("required", "This field is required");
            }
        }
        result
    }

    pub fn apply(&self, patch: &Patch) -> Result<ValueNode, PatchError> {
        let next = apply_patch(self.value.clone(), patch)?;
        Ok(match &self.ty {
            Some(ty) => ValueNode::deserialize(next.as_ref(), ty),
            None => ValueNode::Primitive(PrimitiveContainer::untyped(next)),
        })
    }
}
