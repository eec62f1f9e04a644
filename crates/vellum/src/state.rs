//! Document state.
//!
//! A [`DocumentState`] is an immutable snapshot: the root container plus the
//! schema type it was built under. Applying patches yields a new state and
//! leaves the old one untouched, which is what lets the session layer throw
//! a state away and rebuild when the store rebases.

use serde_json::Value;

use crate::container::{ContainerKind, ValueNode};
use crate::patch::{Patch, PatchError};
use crate::schema::SchemaType;
use crate::validation::ValidationResult;

/// The container shape a schema type deserializes into.
pub fn container_kind(ty: &SchemaType) -> ContainerKind {
    match ty {
        SchemaType::Object(_) => ContainerKind::Object,
        SchemaType::Array(_) => ContainerKind::Array,
        SchemaType::Primitive(_) => ContainerKind::Primitive,
        SchemaType::Reference(_) => ContainerKind::Reference,
    }
}

/// One version of a document, bound to its schema type.
#[derive(Debug, Clone)]
pub struct DocumentState {
    ty: SchemaType,
    root: ValueNode,
}

impl DocumentState {
    pub fn new(raw: Option<&Value>, ty: SchemaType) -> DocumentState {
        let root = ValueNode::deserialize(raw, &ty);
        DocumentState { ty, root }
    }

    pub fn ty(&self) -> &SchemaType {
        &self.ty
    }

    pub fn root(&self) -> &ValueNode {
        &self.root
    }

    /// The persisted form of the document.
    pub fn value(&self) -> Option<Value> {
        self.root.serialize()
    }

    pub fn validate(&self) -> ValidationResult {
        self.root.validate()
    }

    pub fn apply(&self, patch: &Patch) -> Result<DocumentState, PatchError> {
        let root = self.root.apply(patch)?;
        Ok(DocumentState {
            ty: self.ty.clone(),
            root,
        })
    }

    /// Applies patches in order. The first failure aborts and the original
    /// state stays as it was.
    pub fn apply_all(&self, patches: &[Patch]) -> Result<DocumentState, PatchError> {
        let mut state = self.clone();
        for patch in patches {
            state = state.apply(patch)?;
        }
        Ok(state)
    }
}
