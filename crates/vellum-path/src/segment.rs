//! Path segment types.

use serde_json::Value;
use std::fmt;

/// One step of a document path.
///
/// A path addresses a node inside a JSON document. Object members are
/// addressed by field name, array elements either by position or by a
/// keyed-attribute matcher such as `[_key=="f3a1"]`, which keeps the address
/// stable while the array is reordered around it.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Object field name.
    Field(String),
    /// Array index. Negative values count from the end of the array,
    /// so `-1` addresses the last element.
    Index(i64),
    /// Keyed-attribute matcher: addresses the first array element whose
    /// `attribute` equals `value`. The value is a JSON scalar.
    Key { attribute: String, value: Value },
}

impl Segment {
    /// Field segment from anything string-like.
    pub fn field(name: impl Into<String>) -> Segment {
        Segment::Field(name.into())
    }

    /// Index segment.
    pub fn index(index: i64) -> Segment {
        Segment::Index(index)
    }

    /// `_key` matcher segment, the common case for keyed arrays.
    pub fn key(value: impl Into<String>) -> Segment {
        Segment::Key {
            attribute: "_key".to_string(),
            value: Value::String(value.into()),
        }
    }

    /// Matcher segment on an arbitrary attribute.
    pub fn matcher(attribute: impl Into<String>, value: Value) -> Segment {
        Segment::Key {
            attribute: attribute.into(),
            value,
        }
    }

    pub fn is_field(&self) -> bool {
        matches!(self, Segment::Field(_))
    }

    pub fn is_index(&self) -> bool {
        matches!(self, Segment::Index(_))
    }

    pub fn is_key(&self) -> bool {
        matches!(self, Segment::Key { .. })
    }

    /// The field name, if this is a field segment.
    pub fn as_field(&self) -> Option<&str> {
        match self {
            Segment::Field(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Segment {
    /// Renders the segment the way it appears inside a match path:
    /// `title`, `[3]`, `[_key=="abc"]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Field(name) => f.write_str(name),
            Segment::Index(index) => write!(f, "[{index}]"),
            Segment::Key { attribute, value } => write!(f, "[{attribute}=={value}]"),
        }
    }
}

impl From<&str> for Segment {
    fn from(name: &str) -> Segment {
        Segment::Field(name.to_string())
    }
}

impl From<String> for Segment {
    fn from(name: String) -> Segment {
        Segment::Field(name)
    }
}

impl From<i64> for Segment {
    fn from(index: i64) -> Segment {
        Segment::Index(index)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Segment {
        Segment::Index(index as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_constructors() {
        assert_eq!(Segment::field("title"), Segment::Field("title".to_string()));
        assert_eq!(Segment::index(-1), Segment::Index(-1));
        assert_eq!(
            Segment::key("abc"),
            Segment::Key {
                attribute: "_key".to_string(),
                value: json!("abc"),
            }
        );
        assert_eq!(
            Segment::matcher("id", json!(7)),
            Segment::Key {
                attribute: "id".to_string(),
                value: json!(7),
            }
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Segment::field("title").to_string(), "title");
        assert_eq!(Segment::index(3).to_string(), "[3]");
        assert_eq!(Segment::index(-1).to_string(), "[-1]");
        assert_eq!(Segment::key("abc").to_string(), "[_key==\"abc\"]");
        assert_eq!(Segment::matcher("n", json!(true)).to_string(), "[n==true]");
    }

    #[test]
    fn test_from_impls() {
        assert_eq!(Segment::from("a"), Segment::Field("a".to_string()));
        assert_eq!(Segment::from(2i64), Segment::Index(2));
        assert_eq!(Segment::from(2usize), Segment::Index(2));
    }
}
