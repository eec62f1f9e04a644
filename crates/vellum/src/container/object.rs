//! Object containers.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::{ValueNode, RESERVED_ATTRIBUTES};
use crate::patch::{apply as apply_patch, Patch, PatchError};
use crate::schema::{ObjectType, SchemaType};
use crate::validation::ValidationResult;

/// A raw object bound to its [`ObjectType`].
///
/// Every declared field owns a child container, present in the data or not.
/// Attributes the schema does not declare are retained verbatim so foreign
/// data survives a round trip, and reserved attributes (`_key`, `_id`,
/// `_type`) are kept apart from both.
#[derive(Debug, Clone)]
pub struct ObjectContainer {
    ty: Arc<ObjectType>,
    reserved: IndexMap<String, Value>,
    fields: IndexMap<String, Arc<ValueNode>>,
    undeclared: IndexMap<String, Value>,
}

impl ObjectContainer {
    pub fn deserialize(raw: Option<&Map<String, Value>>, ty: Arc<ObjectType>) -> ObjectContainer {
        let mut reserved = IndexMap::new();
        let mut undeclared = IndexMap::new();
        if let Some(map) = raw {
            for (name, value) in map {
                if RESERVED_ATTRIBUTES.contains(&name.as_str()) {
                    reserved.insert(name.clone(), value.clone());
                } else if ty.field(name).is_none() {
                    undeclared.insert(name.clone(), value.clone());
                }
            }
        }
        let fields = ty
            .fields
            .iter()
            .map(|field| {
                let raw = raw.and_then(|map| map.get(&field.name));
                let node = ValueNode::deserialize(raw, &field.ty);
                (field.name.clone(), Arc::new(node))
            })
            .collect();
        ObjectContainer {
            ty,
            reserved,
            fields,
            undeclared,
        }
    }

    pub fn ty(&self) -> &Arc<ObjectType> {
        &self.ty
    }

    /// The child container of a declared field.
    pub fn get_attribute(&self, name: &str) -> Option<&ValueNode> {
        self.fields.get(name).map(Arc::as_ref)
    }

    /// The shared handle of a declared field's container.
    pub fn field_node(&self, name: &str) -> Option<&Arc<ValueNode>> {
        self.fields.get(name)
    }

    /// Whether the attribute is present in the data. A declared field counts
    /// as present only when its container is non-empty.
    pub fn has_attribute(&self, name: &str) -> bool {
        if self.reserved.contains_key(name) || self.undeclared.contains_key(name) {
            return true;
        }
        self.fields
            .get(name)
            .map(|node| !node.is_empty())
            .unwrap_or(false)
    }

    /// Declared field names, in schema order.
    pub fn attribute_keys(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn reserved_attribute(&self, name: &str) -> Option<&Value> {
        self.reserved.get(name)
    }

    /// Whether the raw attribute equals `value`. Matchers usually target
    /// reserved attributes like `_key`, but declared and retained ones
    /// participate too.
    pub fn attribute_matches(&self, attribute: &str, value: &Value) -> bool {
        if let Some(found) = self.reserved.get(attribute) {
            return found == value;
        }
        if let Some(found) = self.undeclared.get(attribute) {
            return found == value;
        }
        self.fields
            .get(attribute)
            .and_then(|node| node.get())
            .map(|found| &found == value)
            .unwrap_or(false)
    }

    /// Sets an attribute from a raw value. Declared fields re-wrap the value
    /// under their type; reserved and undeclared attributes are stored as-is.
    pub fn set_attribute(&self, name: &str, raw: Value) -> ObjectContainer {
        let mut next = self.clone();
        if RESERVED_ATTRIBUTES.contains(&name) {
            next.reserved.insert(name.to_string(), raw);
        } else if let Some(field) = self.ty.field(name) {
            let node = ValueNode::deserialize(Some(&raw), &field.ty);
            next.fields.insert(name.to_string(), Arc::new(node));
        } else {
            next.undeclared.insert(name.to_string(), raw);
        }
        next
    }

    /// Replaces a declared field's container wholesale.
    pub fn set_attribute_node(
        &self,
        name: &str,
        node: ValueNode,
    ) -> Result<ObjectContainer, PatchError> {
        if self.ty.field(name).is_none() {
            return Err(PatchError::UnknownField {
                name: name.to_string(),
                type_name: self.ty.name.clone(),
            });
        }
        let mut next = self.clone();
        next.fields.insert(name.to_string(), Arc::new(node));
        Ok(next)
    }

    /// Removes an attribute. A declared field keeps its slot but becomes
    /// empty; other attributes disappear.
    pub fn unset_attribute(&self, name: &str) -> ObjectContainer {
        let mut next = self.clone();
        if let Some(field) = self.ty.field(name) {
            let node = ValueNode::deserialize(None, &field.ty);
            next.fields.insert(name.to_string(), Arc::new(node));
        } else {
            next.reserved.shift_remove(name);
            next.undeclared.shift_remove(name);
        }
        next
    }

    pub fn is_empty(&self) -> bool {
        self.undeclared.is_empty() && self.fields.values().all(|node| node.is_empty())
    }

    pub fn get(&self) -> Option<Value> {
        self.assemble(true)
    }

    pub fn serialize(&self) -> Option<Value> {
        self.assemble(false)
    }

    /// Builds the raw object: reserved attributes first, declared fields in
    /// schema order, then retained undeclared attributes. Returns `None`
    /// when no field or undeclared attribute contributes anything. Reserved
    /// attributes alone are observable in the raw view but do not make an
    /// object worth persisting.
    fn assemble(&self, raw_view: bool) -> Option<Value> {
        let mut out = Map::new();
        for (name, value) in &self.reserved {
            out.insert(name.clone(), value.clone());
        }
        let mut has_content = false;
        for (name, node) in &self.fields {
            let value = if raw_view { node.get() } else { node.serialize() };
            if let Some(value) = value {
                out.insert(name.clone(), value);
                has_content = true;
            }
        }
        for (name, value) in &self.undeclared {
            out.insert(name.clone(), value.clone());
            has_content = true;
        }
        if has_content || (raw_view && !self.reserved.is_empty()) {
            Some(Value::Object(out))
        } else {
            None
        }
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        if self.ty.required && self.is_empty() {
            result.add_error("required", "This field is required");
        }
        for (name, node) in &self.fields {
            result.add_field(name.clone(), node.validate());
        }
        for name in self.undeclared.keys() {
            let mut child = ValidationResult::new();
            child.add_warning(
                "unknown-field",
                format!(
                    "Field {:?} is not declared in type {:?}",
                    name, self.ty.name
                ),
            );
            result.add_field(name.clone(), child);
        }
        result
    }

    pub fn apply(&self, patch: &Patch) -> Result<ValueNode, PatchError> {
        let declared = patch
            .path
            .first()
            .and_then(|head| head.as_field())
            .filter(|name| self.ty.field(name).is_some())
            .map(str::to_string);
        let Some(name) = declared else {
            return self.apply_raw(patch);
        };
        let Some(child) = self.fields.get(&name) else {
            return self.apply_raw(patch);
        };
        let child_patch = Patch {
            path: patch.path[1..].to_vec(),
            origin: patch.origin,
            op: patch.op.clone(),
        };
        let next_child = child.apply(&child_patch)?;
        let mut next = self.clone();
        next.fields.insert(name, Arc::new(next_child));
        Ok(ValueNode::Object(next))
    }

    /// Runs the patch against the raw view and rebuilds the container. Used
    /// for root-level operations and for paths the declared fields cannot
    /// route, such as reserved or undeclared attributes.
    fn apply_raw(&self, patch: &Patch) -> Result<ValueNode, PatchError> {
        let next = apply_patch(self.get(), patch)?;
        Ok(ValueNode::deserialize(
            next.as_ref(),
            &SchemaType::Object(self.ty.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, PrimitiveKind, PrimitiveType};
    use serde_json::json;
    use vellum_path::Segment;

    fn person() -> Arc<ObjectType> {
        Arc::new(ObjectType::new("person").with_fields(vec![
            Field::new(
                "name",
                SchemaType::primitive(PrimitiveType::new("name", PrimitiveKind::String).required()),
            ),
            Field::new("age", SchemaType::number()),
        ]))
    }

    fn wrap(raw: Value) -> ObjectContainer {
        let Value::Object(map) = raw else {
            panic!("fixture must be an object");
        };
        ObjectContainer::deserialize(Some(&map), person())
    }

    #[test]
    fn test_deserialize_splits_attributes() {
        let container = wrap(json!({
            "_type": "person",
            "_key": "p1",
            "name": "Ada",
            "nickname": "countess",
        }));
        assert_eq!(container.reserved_attribute("_type"), Some(&json!("person")));
        assert_eq!(container.reserved_attribute("_key"), Some(&json!("p1")));
        assert!(container.get_attribute("name").is_some());
        assert!(container.has_attribute("nickname"));
        assert_eq!(container.attribute_keys(), vec!["name", "age"]);
    }

    #[test]
    fn test_attribute_matches() {
        let container = wrap(json!({"_key": "p1", "name": "Ada", "legacy": 7}));
        assert!(container.attribute_matches("_key", &json!("p1")));
        assert!(container.attribute_matches("name", &json!("Ada")));
        assert!(container.attribute_matches("legacy", &json!(7)));
        assert!(!container.attribute_matches("_key", &json!("p2")));
        assert!(!container.attribute_matches("age", &json!(0)));
    }

    #[test]
    fn test_absent_fields_still_have_containers() {
        let container = ObjectContainer::deserialize(None, person());
        let name = container.get_attribute("name").unwrap();
        assert!(name.is_empty());
        assert!(!container.has_attribute("name"));
    }

    #[test]
    fn test_set_and_unset_attribute() {
        let container = ObjectContainer::deserialize(None, person());
        let container = container.set_attribute("name", json!("Ada"));
        assert!(container.has_attribute("name"));
        assert_eq!(container.serialize(), Some(json!({"name": "Ada"})));

        let container = container.unset_attribute("name");
        assert!(!container.has_attribute("name"));
        assert_eq!(container.serialize(), None);
        // The slot survives the unset.
        assert!(container.get_attribute("name").is_some());
    }

    #[test]
    fn test_set_attribute_node_requires_declared_field() {
        let container = ObjectContainer::deserialize(None, person());
        let node = ValueNode::deserialize(Some(&json!("Ada")), &SchemaType::string());
        assert!(container.set_attribute_node("name", node.clone()).is_ok());
        let err = container.set_attribute_node("nope", node).unwrap_err();
        assert!(matches!(err, PatchError::UnknownField { .. }));
    }

    #[test]
    fn test_serialize_order() {
        let container = wrap(json!({
            "extra": 1,
            "age": 36,
            "_type": "person",
            "name": "Ada",
        }));
        let text = serde_json::to_string(&container.serialize().unwrap()).unwrap();
        // Reserved, declared in schema order, then undeclared.
        assert_eq!(
            text,
            r#"{"_type":"person","name":"Ada","age":36,"extra":1}"#
        );
    }

    #[test]
    fn test_empty_fields_are_dropped() {
        let container = wrap(json!({"_type": "person", "name": ""}));
        assert!(container.is_empty());
        assert_eq!(container.serialize(), None);
        // The raw view still shows what is there.
        assert_eq!(
            container.get(),
            Some(json!({"_type": "person", "name": ""}))
        );
    }

    #[test]
    fn test_validate_reports_all_fields() {
        let ty = Arc::new(ObjectType::new("pair").with_fields(vec![
            Field::new(
                "first",
                SchemaType::primitive(PrimitiveType::new("first", PrimitiveKind::String).required()),
            ),
            Field::new(
                "second",
                SchemaType::primitive(PrimitiveType::new("second", PrimitiveKind::String).required()),
            ),
        ]));
        let container = ObjectContainer::deserialize(None, ty);
        let result = container.validate();
        assert!(result.fields.contains_key("first"));
        assert!(result.fields.contains_key("second"));
        assert_eq!(result.error_count(), 2);
    }

    #[test]
    fn test_validate_warns_on_undeclared() {
        let container = wrap(json!({"name": "Ada", "nickname": "countess"}));
        let result = container.validate();
        assert!(result.is_valid());
        assert_eq!(
            result.fields.get("nickname").map(|r| r.messages[0].id),
            Some("unknown-field")
        );
    }

    #[test]
    fn test_apply_undeclared_field_goes_through_raw() {
        let container = wrap(json!({"name": "Ada"}));
        let patch = Patch::set(vec![Segment::field("nickname")], json!("countess"));
        let node = container.apply(&patch).unwrap();
        assert_eq!(
            node.serialize(),
            Some(json!({"name": "Ada", "nickname": "countess"}))
        );
    }

    #[test]
    fn test_apply_root_unset_empties_container() {
        let container = wrap(json!({"name": "Ada"}));
        let node = container.apply(&Patch::unset(vec![])).unwrap();
        assert!(node.is_empty());
        assert_eq!(node.serialize(), None);
    }
}
