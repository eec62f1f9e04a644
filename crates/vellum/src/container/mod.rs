//! Schema-aware value containers.
//!
//! A [`ValueNode`] wraps a raw JSON subtree together with the schema type
//! that governs it. Containers exist for every declared field whether or not
//! the underlying data is present, so an editing surface can always address
//! `doc.author.name` even on an empty document. Mutation never happens in
//! place: applying a patch returns a new node, and untouched children are
//! shared between the old and new trees through `Arc`.
//!
//! Two read methods with different jobs: [`ValueNode::get`] is the current
//! raw view of the node, [`ValueNode::serialize`] is the persisted form, in
//! which empty nodes become `None` so they vanish from their parent.

mod array;
mod object;
mod primitive;
mod reference;

pub use array::ArrayContainer;
pub use object::ObjectContainer;
pub use primitive::PrimitiveContainer;
pub use reference::ReferenceContainer;

use serde_json::Value;

use crate::patch::{Patch, PatchError};
use crate::schema::SchemaType;
use crate::validation::ValidationResult;

/// Attributes the engine manages itself. They live outside the declared
/// field list and always serialize ahead of it.
pub const RESERVED_ATTRIBUTES: &[&str] = &["_key", "_id", "_type"];

/// The four container shapes a schema type can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Object,
    Array,
    Primitive,
    Reference,
}

impl ContainerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::Object => "object",
            ContainerKind::Array => "array",
            ContainerKind::Primitive => "primitive",
            ContainerKind::Reference => "reference",
        }
    }
}

/// One node of a document tree: a raw value bound to its schema type.
#[derive(Debug, Clone)]
pub enum ValueNode {
    Object(ObjectContainer),
    Array(ArrayContainer),
    Primitive(PrimitiveContainer),
    Reference(ReferenceContainer),
}

impl ValueNode {
    /// Wraps a raw value under `ty`.
    ///
    /// `None` and explicit `null` both mean the value is absent; the
    /// resulting container is empty but still addressable. A raw value whose
    /// shape contradicts the declared type is kept whole as an opaque leaf,
    /// so nothing is lost on a round trip and [`ValueNode::validate`] can
    /// report it.
    pub fn deserialize(raw: Option<&Value>, ty: &SchemaType) -> ValueNode {
        let raw = raw.filter(|value| !value.is_null());
        match ty {
            SchemaType::Object(t) => match raw {
                Some(Value::Object(map)) => {
                    ValueNode::Object(ObjectContainer::deserialize(Some(map), t.clone()))
                }
                Some(other) => ValueNode::mismatched(other, ty),
                None => ValueNode::Object(ObjectContainer::deserialize(None, t.clone())),
            },
            SchemaType::Array(t) => match raw {
                Some(Value::Array(items)) => {
                    ValueNode::Array(ArrayContainer::deserialize(Some(items), t.clone()))
                }
                Some(other) => ValueNode::mismatched(other, ty),
                None => ValueNode::Array(ArrayContainer::deserialize(None, t.clone())),
            },
            SchemaType::Reference(t) => match raw {
                Some(Value::Object(_)) => {
                    ValueNode::Reference(ReferenceContainer::new(raw.cloned(), t.clone()))
                }
                Some(other) => ValueNode::mismatched(other, ty),
                None => ValueNode::Reference(ReferenceContainer::new(None, t.clone())),
            },
            SchemaType::Primitive(_) => {
                ValueNode::Primitive(PrimitiveContainer::new(raw.cloned(), Some(ty.clone())))
            }
        }
    }

    fn mismatched(raw: &Value, ty: &SchemaType) -> ValueNode {
        ValueNode::Primitive(PrimitiveContainer::new(Some(raw.clone()), Some(ty.clone())))
    }

    pub fn kind(&self) -> ContainerKind {
        match self {
            ValueNode::Object(_) => ContainerKind::Object,
            ValueNode::Array(_) => ContainerKind::Array,
            ValueNode::Primitive(_) => ContainerKind::Primitive,
            ValueNode::Reference(_) => ContainerKind::Reference,
        }
    }

    /// The current raw view of this node.
    pub fn get(&self) -> Option<Value> {
        match self {
            ValueNode::Object(c) => c.get(),
            ValueNode::Array(c) => c.get(),
            ValueNode::Primitive(c) => c.get(),
            ValueNode::Reference(c) => c.get(),
        }
    }

    /// The persisted form. Empty nodes serialize to `None` and are dropped
    /// from their parent, so documents never carry empty husks.
    pub fn serialize(&self) -> Option<Value> {
        match self {
            ValueNode::Object(c) => c.serialize(),
            ValueNode::Array(c) => c.serialize(),
            ValueNode::Primitive(c) => c.serialize(),
            ValueNode::Reference(c) => c.serialize(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ValueNode::Object(c) => c.is_empty(),
            ValueNode::Array(c) => c.is_empty(),
            ValueNode::Primitive(c) => c.is_empty(),
            ValueNode::Reference(c) => c.is_empty(),
        }
    }

    /// Validates this node and every child, without short-circuiting.
    pub fn validate(&self) -> ValidationResult {
        match self {
            ValueNode::Object(c) => c.validate(),
            ValueNode::Array(c) => c.validate(),
            ValueNode::Primitive(c) => c.validate(),
            ValueNode::Reference(c) => c.validate(),
        }
    }

    /// Applies one patch, returning the new node.
    ///
    /// Navigation along declared fields and array elements happens in
    /// container space, so untouched siblings are shared with the result.
    /// At the target the patch runs through the plain-value engine and the
    /// outcome is deserialized fresh under the node's type.
    pub fn apply(&self, patch: &Patch) -> Result<ValueNode, PatchError> {
        match self {
            ValueNode::Object(c) => c.apply(patch),
            ValueNode::Array(c) => c.apply(patch),
            ValueNode::Primitive(c) => c.apply(patch),
            ValueNode::Reference(c) => c.apply(patch),
        }
    }

    /// The node's `_key`, when it carries one.
    pub fn item_key(&self) -> Option<&str> {
        match self {
            ValueNode::Object(c) => c.reserved_attribute("_key").and_then(Value::as_str),
            ValueNode::Reference(c) => c.value().and_then(|v| v.get("_key")).and_then(Value::as_str),
            ValueNode::Primitive(c) => c.value().and_then(|v| v.get("_key")).and_then(Value::as_str),
            ValueNode::Array(_) => None,
        }
    }

    /// Whether the node's raw attribute `attribute` equals `value`. Used to
    /// resolve keyed matchers against array elements.
    pub(crate) fn attribute_equals(&self, attribute: &str, value: &Value) -> bool {
        match self {
            ValueNode::Object(c) => c.attribute_matches(attribute, value),
            ValueNode::Reference(c) => c.value().and_then(|v| v.get(attribute)) == Some(value),
            ValueNode::Primitive(c) => c.value().and_then(|v| v.get(attribute)) == Some(value),
            ValueNode::Array(_) => false,
        }
    }
}
