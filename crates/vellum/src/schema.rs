//! The compiled schema type tree.
//!
//! Schemas are authored and compiled elsewhere; this module is the data
//! model the engine consumes. Every variant is held behind an `Arc`, so
//! cloning a `SchemaType` is cheap and containers can share their type
//! nodes with the tree.

use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum SchemaType {
    Object(Arc<ObjectType>),
    Array(Arc<ArrayType>),
    Primitive(Arc<PrimitiveType>),
    Reference(Arc<ReferenceType>),
}

/// An object type: a named set of declared fields.
#[derive(Debug)]
pub struct ObjectType {
    pub name: String,
    pub title: Option<String>,
    pub fields: Vec<Field>,
    pub required: bool,
}

/// One declared field of an object type.
#[derive(Debug)]
pub struct Field {
    pub name: String,
    pub ty: SchemaType,
}

/// An array type. `of` lists the member types; arrays may be polymorphic.
#[derive(Debug)]
pub struct ArrayType {
    pub name: String,
    pub title: Option<String>,
    pub of: Vec<SchemaType>,
    pub required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    String,
    Text,
    Number,
    Boolean,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Text => "text",
            PrimitiveKind::Number => "number",
            PrimitiveKind::Boolean => "boolean",
        }
    }
}

#[derive(Debug)]
pub struct PrimitiveType {
    pub name: String,
    pub title: Option<String>,
    pub kind: PrimitiveKind,
    pub required: bool,
}

/// A reference to another document: `{_type, _ref, _weak?}` at runtime.
#[derive(Debug)]
pub struct ReferenceType {
    pub name: String,
    pub title: Option<String>,
    /// Names of the types this reference may point at.
    pub to: Vec<String>,
    pub weak: bool,
    pub required: bool,
}

impl SchemaType {
    pub fn object(ty: ObjectType) -> SchemaType {
        SchemaType::Object(Arc::new(ty))
    }

    pub fn array(ty: ArrayType) -> SchemaType {
        SchemaType::Array(Arc::new(ty))
    }

    pub fn primitive(ty: PrimitiveType) -> SchemaType {
        SchemaType::Primitive(Arc::new(ty))
    }

    pub fn reference(ty: ReferenceType) -> SchemaType {
        SchemaType::Reference(Arc::new(ty))
    }

    /// Shorthand for an anonymous string type.
    pub fn string() -> SchemaType {
        SchemaType::primitive(PrimitiveType::new("string", PrimitiveKind::String))
    }

    /// Shorthand for an anonymous number type.
    pub fn number() -> SchemaType {
        SchemaType::primitive(PrimitiveType::new("number", PrimitiveKind::Number))
    }

    /// Shorthand for an anonymous boolean type.
    pub fn boolean() -> SchemaType {
        SchemaType::primitive(PrimitiveType::new("boolean", PrimitiveKind::Boolean))
    }

    pub fn name(&self) -> &str {
        match self {
            SchemaType::Object(t) => &t.name,
            SchemaType::Array(t) => &t.name,
            SchemaType::Primitive(t) => &t.name,
            SchemaType::Reference(t) => &t.name,
        }
    }

    pub fn is_required(&self) -> bool {
        match self {
            SchemaType::Object(t) => t.required,
            SchemaType::Array(t) => t.required,
            SchemaType::Primitive(t) => t.required,
            SchemaType::Reference(t) => t.required,
        }
    }

    /// Whether a raw value has the JSON shape this type expects.
    pub fn matches_shape(&self, value: &Value) -> bool {
        match self {
            SchemaType::Object(_) => value.is_object(),
            SchemaType::Array(_) => value.is_array(),
            SchemaType::Reference(_) => value.get("_ref").is_some(),
            SchemaType::Primitive(t) => match t.kind {
                PrimitiveKind::String | PrimitiveKind::Text => value.is_string(),
                PrimitiveKind::Number => value.is_number(),
                PrimitiveKind::Boolean => value.is_boolean(),
            },
        }
    }
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> ObjectType {
        ObjectType {
            name: name.into(),
            title: None,
            fields: Vec::new(),
            required: false,
        }
    }

    pub fn with_fields(mut self, fields: Vec<Field>) -> ObjectType {
        self.fields = fields;
        self
    }

    pub fn required(mut self) -> ObjectType {
        self.required = true;
        self
    }

    /// Look up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl Field {
    pub fn new(name: impl Into<String>, ty: SchemaType) -> Field {
        Field {
            name: name.into(),
            ty,
        }
    }
}

impl ArrayType {
    pub fn new(name: impl Into<String>, of: Vec<SchemaType>) -> ArrayType {
        ArrayType {
            name: name.into(),
            title: None,
            of,
            required: false,
        }
    }

    pub fn required(mut self) -> ArrayType {
        self.required = true;
        self
    }

    /// The member type a raw item deserializes under.
    ///
    /// Items carrying a `_type` attribute are matched by name. Arrays with a
    /// single member type use it for everything else; polymorphic arrays
    /// fall back to matching the item's JSON shape.
    pub fn member_for(&self, item: &Value) -> Option<&SchemaType> {
        if let Some(type_name) = item.get("_type").and_then(Value::as_str) {
            if let Some(member) = self.of.iter().find(|m| m.name() == type_name) {
                return Some(member);
            }
        }
        if self.of.len() == 1 {
            return self.of.first();
        }
        self.of.iter().find(|m| m.matches_shape(item))
    }
}

impl PrimitiveType {
    pub fn new(name: impl Into<String>, kind: PrimitiveKind) -> PrimitiveType {
        PrimitiveType {
            name: name.into(),
            title: None,
            kind,
            required: false,
        }
    }

    pub fn required(mut self) -> PrimitiveType {
        self.required = true;
        self
    }
}

impl ReferenceType {
    pub fn new(name: impl Into<String>, to: Vec<String>) -> ReferenceType {
        ReferenceType {
            name: name.into(),
            title: None,
            to,
            weak: false,
            required: false,
        }
    }

    pub fn weak(mut self) -> ReferenceType {
        self.weak = true;
        self
    }

    pub fn required(mut self) -> ReferenceType {
        self.required = true;
        self
    }
}
