//! Document paths for structured content.
//!
//! A [`Path`] addresses one node inside a JSON document. Object members are
//! addressed by field name and array elements by position or by a
//! keyed-attribute matcher, which keeps the address stable under reordering.
//! Paths have a canonical wire string syntax used by the document store:
//!
//! ```text
//! field.subfield[3][_key=="abc"].text
//! ```
//!
//! # Example
//!
//! ```
//! use vellum_path::{parse_match_path, format_match_path, Segment};
//!
//! let path = parse_match_path("spans[_key==\"k1\"].text").unwrap();
//! assert_eq!(
//!     path,
//!     vec![
//!         Segment::field("spans"),
//!         Segment::key("k1"),
//!         Segment::field("text"),
//!     ]
//! );
//!
//! // Format path segments back to the wire string
//! assert_eq!(format_match_path(&path), "spans[_key==\"k1\"].text");
//!
//! // Resolve a path against a document
//! let doc = serde_json::json!({"spans": [{"_key": "k1", "text": "hi"}]});
//! let val = vellum_path::get(&doc, &path);
//! assert_eq!(val, Some(&serde_json::json!("hi")));
//! ```

use serde_json::Value;
use thiserror::Error;

pub mod segment;
pub use segment::Segment;

pub mod get;
pub use get::{exists, get, get_mut, index_of, resolve_index};

/// A document path: a sequence of segments from the root.
pub type Path = Vec<Segment>;

// ── Formatting ────────────────────────────────────────────────────────────

/// Format path segments into the canonical wire string.
///
/// Field segments are joined with `.` (no leading dot), index and matcher
/// segments are rendered in brackets with no separator. Matcher values are
/// rendered as JSON literals, so string escaping is exactly JSON's. The root
/// path formats to an empty string.
///
/// # Example
///
/// ```
/// use vellum_path::{format_match_path, Segment};
///
/// assert_eq!(format_match_path(&[]), "");
/// assert_eq!(
///     format_match_path(&[Segment::field("a"), Segment::index(0), Segment::field("b")]),
///     "a[0].b"
/// );
/// assert_eq!(
///     format_match_path(&[Segment::field("spans"), Segment::key("ab\"c")]),
///     "spans[_key==\"ab\\\"c\"]"
/// );
/// ```
pub fn format_match_path(path: &[Segment]) -> String {
    let mut out = String::new();
    for (i, segment) in path.iter().enumerate() {
        match segment {
            Segment::Field(name) => {
                if i > 0 {
                    out.push('.');
                }
                out.push_str(name);
            }
            Segment::Index(index) => {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            }
            Segment::Key { attribute, value } => {
                out.push('[');
                out.push_str(attribute);
                out.push_str("==");
                // Display on Value produces the compact JSON rendering
                out.push_str(&value.to_string());
                out.push(']');
            }
        }
    }
    out
}

// ── Parsing ───────────────────────────────────────────────────────────────

/// Parse a wire path string into segments.
///
/// The empty string parses to the root path. Anything that is not a valid
/// path is a hard error; the store never emits malformed paths, so there is
/// no lenient mode.
///
/// # Example
///
/// ```
/// use vellum_path::{parse_match_path, Segment};
///
/// assert_eq!(parse_match_path("").unwrap(), vec![]);
/// assert_eq!(
///     parse_match_path("a.b[-1]").unwrap(),
///     vec![Segment::field("a"), Segment::field("b"), Segment::index(-1)]
/// );
/// assert_eq!(
///     parse_match_path("[id==7].name").unwrap(),
///     vec![
///         Segment::matcher("id", serde_json::json!(7)),
///         Segment::field("name"),
///     ]
/// );
/// assert!(parse_match_path("a..b").is_err());
/// assert!(parse_match_path("a[").is_err());
/// ```
pub fn parse_match_path(input: &str) -> Result<Path, PathError> {
    let bytes = input.as_bytes();
    let mut path = Path::new();
    let mut pos = 0usize;
    while pos < bytes.len() {
        match bytes[pos] {
            b'.' => {
                if path.is_empty() {
                    return Err(PathError::UnexpectedChar {
                        found: '.',
                        offset: pos,
                    });
                }
                let (name, next) = scan_ident(input, pos + 1)?;
                path.push(Segment::Field(name));
                pos = next;
            }
            b'[' => {
                let (segment, next) = scan_bracket(input, pos)?;
                path.push(segment);
                pos = next;
            }
            _ => {
                // A bare field name is only valid as the first segment.
                if !path.is_empty() {
                    return Err(unexpected_char_at(input, pos));
                }
                let (name, next) = scan_ident(input, pos)?;
                path.push(Segment::Field(name));
                pos = next;
            }
        }
    }
    Ok(path)
}

fn unexpected_char_at(input: &str, offset: usize) -> PathError {
    let found = input[offset..].chars().next().unwrap_or('\0');
    PathError::UnexpectedChar { found, offset }
}

fn is_ident_start(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphabetic()
}

fn is_ident_continue(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

/// Scan a field identifier: `[A-Za-z_][A-Za-z0-9_]*`.
fn scan_ident(input: &str, start: usize) -> Result<(String, usize), PathError> {
    let bytes = input.as_bytes();
    let mut end = start;
    while end < bytes.len() {
        let b = bytes[end];
        let ok = if end == start {
            is_ident_start(b)
        } else {
            is_ident_continue(b)
        };
        if !ok {
            break;
        }
        end += 1;
    }
    if end == start {
        return match input[start..].chars().next() {
            None | Some('.') | Some('[') | Some(']') => {
                Err(PathError::EmptyField { offset: start })
            }
            Some(found) => Err(PathError::UnexpectedChar {
                found,
                offset: start,
            }),
        };
    }
    Ok((input[start..end].to_string(), end))
}

/// Scan a bracket segment starting at the `[` byte. Returns the parsed
/// segment and the offset just past the closing `]`.
fn scan_bracket(input: &str, open: usize) -> Result<(Segment, usize), PathError> {
    let bytes = input.as_bytes();
    let mut i = open + 1;
    let mut in_string = false;
    let mut escaped = false;
    let close = loop {
        if i >= bytes.len() {
            return Err(PathError::UnterminatedBracket { offset: open });
        }
        let b = bytes[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
        } else if b == b'"' {
            in_string = true;
        } else if b == b']' {
            break i;
        }
        i += 1;
    };
    let inner = &input[open + 1..close];
    let segment = parse_bracket_inner(inner, open + 1)?;
    Ok((segment, close + 1))
}

fn looks_like_index(inner: &str) -> bool {
    let digits = inner.strip_prefix('-').unwrap_or(inner);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn parse_bracket_inner(inner: &str, offset: usize) -> Result<Segment, PathError> {
    if inner.is_empty() {
        return Err(PathError::EmptyBracket { offset });
    }
    if looks_like_index(inner) {
        return inner
            .parse::<i64>()
            .map(Segment::Index)
            .map_err(|_| PathError::BadIndex {
                index: inner.to_string(),
                offset,
            });
    }
    let Some(eq) = inner.find("==") else {
        return Err(PathError::BadIndex {
            index: inner.to_string(),
            offset,
        });
    };
    let attribute = &inner[..eq];
    let attr_ok = !attribute.is_empty()
        && is_ident_start(attribute.as_bytes()[0])
        && attribute.bytes().all(is_ident_continue);
    if !attr_ok {
        return Err(PathError::BadMatcherAttribute {
            attribute: attribute.to_string(),
            offset,
        });
    }
    let literal = &inner[eq + 2..];
    let value_offset = offset + eq + 2;
    let value: Value =
        serde_json::from_str(literal).map_err(|_| PathError::BadMatcherValue {
            value: literal.to_string(),
            offset: value_offset,
        })?;
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => Ok(Segment::Key {
            attribute: attribute.to_string(),
            value,
        }),
        _ => Err(PathError::BadMatcherValue {
            value: literal.to_string(),
            offset: value_offset,
        }),
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────

/// Check if a path points to the document root.
///
/// # Example
///
/// ```
/// use vellum_path::{is_root, Segment};
///
/// assert!(is_root(&[]));
/// assert!(!is_root(&[Segment::field("title")]));
/// ```
pub fn is_root(path: &[Segment]) -> bool {
    path.is_empty()
}

/// Check if `parent` strictly contains `child`.
///
/// # Example
///
/// ```
/// use vellum_path::{is_child, Segment};
///
/// let parent = vec![Segment::field("a")];
/// let child = vec![Segment::field("a"), Segment::index(0)];
/// assert!(is_child(&parent, &child));
/// assert!(!is_child(&child, &parent));
/// assert!(!is_child(&parent, &parent));
/// ```
pub fn is_child(parent: &[Segment], child: &[Segment]) -> bool {
    if parent.len() >= child.len() {
        return false;
    }
    parent.iter().zip(child).all(|(a, b)| a == b)
}

/// The parent path of a given path.
///
/// # Errors
///
/// Returns an error if the path is the root.
///
/// # Example
///
/// ```
/// use vellum_path::{parent, Segment};
///
/// let path = vec![Segment::field("a"), Segment::field("b")];
/// assert_eq!(parent(&path).unwrap(), vec![Segment::field("a")]);
/// assert!(parent(&[]).is_err());
/// ```
pub fn parent(path: &[Segment]) -> Result<Path, PathError> {
    if path.is_empty() {
        return Err(PathError::NoParent);
    }
    Ok(path[..path.len() - 1].to_vec())
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PathError {
    #[error("unexpected character {found:?} at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },
    #[error("expected a field name at offset {offset}")]
    EmptyField { offset: usize },
    #[error("unterminated bracket segment at offset {offset}")]
    UnterminatedBracket { offset: usize },
    #[error("empty bracket segment at offset {offset}")]
    EmptyBracket { offset: usize },
    #[error("invalid array index {index:?} at offset {offset}")]
    BadIndex { index: String, offset: usize },
    #[error("invalid matcher attribute {attribute:?} at offset {offset}")]
    BadMatcherAttribute { attribute: String, offset: usize },
    #[error("invalid matcher value {value:?} at offset {offset}")]
    BadMatcherValue { value: String, offset: usize },
    #[error("path has no parent")]
    NoParent,
}
