//! Reference containers.

use std::sync::Arc;

use serde_json::Value;

use super::ValueNode;
use crate::patch::{apply as apply_patch, Patch, PatchError};
use crate::schema::{ReferenceType, SchemaType};
use crate::validation::ValidationResult;

/// A pointer at another document: `{_type, _ref, _weak?}` at runtime.
///
/// The raw value is treated as one opaque unit. There is no child container
/// for `_ref`; editing surfaces swap the whole value when the user picks a
/// different target.
#[derive(Debug, Clone)]
pub struct ReferenceContainer {
    ty: Arc<ReferenceType>,
    value: Option<Value>,
}

impl ReferenceContainer {
    pub fn new(value: Option<Value>, ty: Arc<ReferenceType>) -> ReferenceContainer {
        let value = value.filter(|v| !v.is_null());
        ReferenceContainer { ty, value }
    }

    pub fn ty(&self) -> &Arc<ReferenceType> {
        &self.ty
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// The id of the referenced document.
    pub fn ref_id(&self) -> Option<&str> {
        self.value
            .as_ref()
            .and_then(|v| v.get("_ref"))
            .and_then(Value::as_str)
    }

    /// Weak references do not block deletion of their target. The raw value
    /// may override the declared default.
    pub fn is_weak(&self) -> bool {
        self.value
            .as_ref()
            .and_then(|v| v.get("_weak"))
            .and_then(Value::as_bool)
            .unwrap_or(self.ty.weak)
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    pub fn get(&self) -> Option<Value> {
        self.value.clone()
    }

    pub fn serialize(&self) -> Option<Value> {
        self.value.clone()
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        if self.is_empty() {
            if self.ty.required {
                result.add_error("required", "This field is required");
            }
            return result;
        }
        if self.ref_id().is_none() {
            result.add_error("invalid-reference", "Reference is missing its _ref");
        }
        result
    }

    pub fn apply(&self, patch: &Patch) -> Result<ValueNode, PatchError> {
        let next = apply_patch(self.value.clone(), patch)?;
        Ok(ValueNode::deserialize(
            next.as_ref(),
            &SchemaType::Reference(self.ty.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn author_ref() -> Arc<ReferenceType> {
        Arc::new(ReferenceType::new("authorRef", vec!["author".to_string()]))
    }

    #[test]
    fn test_ref_id() {
        let value = json!({"_type": "authorRef", "_ref": "person-1"});
        let container = ReferenceContainer::new(Some(value), author_ref());
        assert_eq!(container.ref_id(), Some("person-1"));
        assert!(!container.is_weak());
        assert!(container.validate().is_blank());
    }

    #[test]
    fn test_weak_override() {
        let ty = Arc::new(ReferenceType::new("authorRef", vec!["author".to_string()]).weak());
        let container = ReferenceContainer::new(None, ty);
        assert!(container.is_weak());

        let value = json!({"_ref": "person-1", "_weak": false});
        let container = ReferenceContainer::new(Some(value), author_ref());
        assert!(!container.is_weak());
    }

    #[test]
    fn test_missing_ref_is_invalid() {
        let container = ReferenceContainer::new(Some(json!({"_type": "authorRef"})), author_ref());
        let result = container.validate();
        assert_eq!(result.messages[0].id, "invalid-reference");
    }

    #[test]
    fn test_required_when_empty() {
        let ty = Arc::new(
            ReferenceType::new("authorRef", vec!["author".to_string()]).required(),
        );
        let container = ReferenceContainer::new(None, ty);
        assert_eq!(container.validate().messages[0].id, "required");
    }

    #[test]
    fn test_set_and_unset_round_trip() {
        let container = ReferenceContainer::new(None, author_ref());
        let node = container
            .apply(&Patch::set(vec![], json!({"_ref": "person-2"})))
            .unwrap();
        assert_eq!(node.serialize(), Some(json!({"_ref": "person-2"})));

        let node = node.apply(&Patch::unset(vec![])).unwrap();
        assert_eq!(node.serialize(), None);
    }
}
