//! Patch types.
//!
//! A [`Patch`] pairs a [`vellum_path::Path`] addressing the target node with a
//! [`PatchOp`] describing the change. Patches are plain data; applying them is
//! the job of [`super::apply`].

use serde_json::{Number, Value};
use thiserror::Error;
use vellum_path::{format_match_path, Path, Segment};

use crate::dmp::DmpError;

/// Where a patch came from. The session layer uses this to tell its own
/// echoed mutations apart from other collaborators' edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Local,
    Remote,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Local => "local",
            Origin::Remote => "remote",
        }
    }
}

/// Which side of the reference element inserted items land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Before,
    After,
}

impl InsertPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsertPosition::Before => "before",
            InsertPosition::After => "after",
        }
    }
}

/// One patch operation.
///
/// `Inc`/`Dec` carry a [`serde_json::Number`] so integer amounts stay
/// integers all the way through. `DiffMatchPatch` carries the serialized
/// patch text understood by [`crate::dmp`].
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    Set { value: Value },
    SetIfMissing { value: Value },
    Unset,
    Insert {
        position: InsertPosition,
        items: Vec<Value>,
    },
    Move { from: i64, to: i64 },
    Merge { value: Value },
    Inc { amount: Number },
    Dec { amount: Number },
    DiffMatchPatch { value: String },
    Replace { value: Value },
}

impl PatchOp {
    /// Wire-level name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            PatchOp::Set { .. } => "set",
            PatchOp::SetIfMissing { .. } => "setIfMissing",
            PatchOp::Unset => "unset",
            PatchOp::Insert { .. } => "insert",
            PatchOp::Move { .. } => "move",
            PatchOp::Merge { .. } => "merge",
            PatchOp::Inc { .. } => "inc",
            PatchOp::Dec { .. } => "dec",
            PatchOp::DiffMatchPatch { .. } => "diffMatchPatch",
            PatchOp::Replace { .. } => "replace",
        }
    }
}

/// A single edit: an operation aimed at a path.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub path: Path,
    pub origin: Option<Origin>,
    pub op: PatchOp,
}

impl Patch {
    pub fn new(path: Path, op: PatchOp) -> Patch {
        Patch {
            path,
            origin: None,
            op,
        }
    }

    pub fn set(path: Path, value: Value) -> Patch {
        Patch::new(path, PatchOp::Set { value })
    }

    pub fn set_if_missing(path: Path, value: Value) -> Patch {
        Patch::new(path, PatchOp::SetIfMissing { value })
    }

    pub fn unset(path: Path) -> Patch {
        Patch::new(path, PatchOp::Unset)
    }

    pub fn insert(path: Path, position: InsertPosition, items: Vec<Value>) -> Patch {
        Patch::new(path, PatchOp::Insert { position, items })
    }

    pub fn insert_before(path: Path, items: Vec<Value>) -> Patch {
        Patch::insert(path, InsertPosition::Before, items)
    }

    pub fn insert_after(path: Path, items: Vec<Value>) -> Patch {
        Patch::insert(path, InsertPosition::After, items)
    }

    pub fn move_item(path: Path, from: i64, to: i64) -> Patch {
        Patch::new(path, PatchOp::Move { from, to })
    }

    pub fn merge(path: Path, value: Value) -> Patch {
        Patch::new(path, PatchOp::Merge { value })
    }

    pub fn inc(path: Path, amount: impl Into<Number>) -> Patch {
        Patch::new(
            path,
            PatchOp::Inc {
                amount: amount.into(),
            },
        )
    }

    pub fn dec(path: Path, amount: impl Into<Number>) -> Patch {
        Patch::new(
            path,
            PatchOp::Dec {
                amount: amount.into(),
            },
        )
    }

    pub fn diff_match_patch(path: Path, value: impl Into<String>) -> Patch {
        Patch::new(
            path,
            PatchOp::DiffMatchPatch {
                value: value.into(),
            },
        )
    }

    pub fn replace(path: Path, value: Value) -> Patch {
        Patch::new(path, PatchOp::Replace { value })
    }

    pub fn with_origin(mut self, origin: Origin) -> Patch {
        self.origin = Some(origin);
        self
    }

    /// Wire-level name of this patch's operation.
    pub fn op_name(&self) -> &'static str {
        self.op.name()
    }

    /// The target path rendered in match-path syntax.
    pub fn path_string(&self) -> String {
        format_match_path(&self.path)
    }

    /// Returns the same patch re-rooted one level deeper, with `segment`
    /// prepended to its path. Used when bubbling edits from a child input up
    /// to the document root.
    pub fn prefixed(mut self, segment: impl Into<Segment>) -> Patch {
        self.path.insert(0, segment.into());
        self
    }
}

/// Prefixes every patch in `patches` with `segment`.
pub fn prefix_all(segment: impl Into<Segment>, patches: Vec<Patch>) -> Vec<Patch> {
    let segment = segment.into();
    patches
        .into_iter()
        .map(|patch| patch.prefixed(segment.clone()))
        .collect()
}

/// Errors raised while applying patches.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PatchError {
    /// The payload or target of `set`/`merge` has the wrong runtime shape.
    #[error("{op} expected {expected}, got {found}")]
    TypeMismatch {
        op: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// The operation is not defined for the target node's kind.
    #[error("cannot apply {op} to {kind}")]
    UnsupportedOp {
        op: &'static str,
        kind: &'static str,
    },

    /// A non-empty path descended into a leaf value.
    #[error("cannot apply deep operations on {kind}")]
    DeepPath { kind: &'static str },

    /// A keyed matcher resolved to no array element.
    #[error("no array element matches {matcher}")]
    NoMatch { matcher: String },

    /// An index fell outside the addressable range.
    #[error("index {index} is out of bounds for an array of length {len}")]
    OutOfBounds { index: i64, len: usize },

    /// An insert landed outside `[0, len]`.
    #[error("insert position {pos} is out of bounds for an array of length {len}")]
    BadInsertPosition { pos: usize, len: usize },

    /// Object navigation needs a field-name segment.
    #[error("expected a field name segment, got {segment}")]
    ExpectedField { segment: String },

    /// Array navigation needs an index or matcher segment.
    #[error("expected an index or matcher segment, got {segment}")]
    ExpectedElement { segment: String },

    /// `inc`/`dec` produced a value JSON cannot represent.
    #[error("{op} result is not a representable JSON number")]
    InvalidNumber { op: &'static str },

    /// A container accessor addressed a field the schema does not declare.
    #[error("field {name:?} is not declared on type {type_name:?}")]
    UnknownField { name: String, type_name: String },

    #[error(transparent)]
    Dmp(#[from] DmpError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vellum_path::Segment;

    #[test]
    fn test_op_names() {
        assert_eq!(Patch::set(vec![], json!(1)).op_name(), "set");
        assert_eq!(
            Patch::set_if_missing(vec![], json!({})).op_name(),
            "setIfMissing"
        );
        assert_eq!(Patch::unset(vec![]).op_name(), "unset");
        assert_eq!(
            Patch::insert_after(vec![Segment::index(-1)], vec![json!(1)]).op_name(),
            "insert"
        );
        assert_eq!(Patch::move_item(vec![], 0, 2).op_name(), "move");
        assert_eq!(Patch::merge(vec![], json!({})).op_name(), "merge");
        assert_eq!(Patch::inc(vec![], 1).op_name(), "inc");
        assert_eq!(Patch::dec(vec![], 1).op_name(), "dec");
        assert_eq!(
            Patch::diff_match_patch(vec![], "@@ -1,1 +1,1 @@\n-a\n+b\n").op_name(),
            "diffMatchPatch"
        );
        assert_eq!(Patch::replace(vec![], json!(1)).op_name(), "replace");
    }

    #[test]
    fn test_prefixed() {
        let patch = Patch::set(vec![Segment::field("text")], json!("hi"));
        let patch = patch.prefixed(Segment::matcher("_key", json!("k1")));
        let patch = patch.prefixed("spans");
        assert_eq!(patch.path_string(), "spans[_key==\"k1\"].text");
    }

    #[test]
    fn test_prefix_all() {
        let patches = vec![
            Patch::set(vec![Segment::field("a")], json!(1)),
            Patch::unset(vec![Segment::field("b")]),
        ];
        let patches = prefix_all("nested", patches);
        assert_eq!(patches[0].path_string(), "nested.a");
        assert_eq!(patches[1].path_string(), "nested.b");
    }

    #[test]
    fn test_with_origin() {
        let patch = Patch::unset(vec![]).with_origin(Origin::Remote);
        assert_eq!(patch.origin, Some(Origin::Remote));
        assert_eq!(Origin::Remote.as_str(), "remote");
    }
}
