//! vellum — a path-addressed patch engine for structured documents.
//!
//! The crate is layered. [`patch`] applies operations to plain JSON values;
//! [`container`] binds values to a [`schema`] so every declared field stays
//! addressable and edits share untouched subtrees; [`wire`] converts between
//! patch lists and the store's batched wire format; [`session`] keeps a
//! local document in step with a store event stream. [`dmp`] carries the
//! diff-match-patch text format used for incremental string edits.
//!
//! ```
//! use serde_json::json;
//! use vellum::patch::{apply, Patch};
//! use vellum_path::parse_match_path;
//!
//! let doc = json!({"title": "draft", "tags": ["a"]});
//! let patch = Patch::set(parse_match_path("title").unwrap(), json!("final"));
//! let next = apply(Some(doc), &patch).unwrap();
//! assert_eq!(next, Some(json!({"title": "final", "tags": ["a"]})));
//! ```

pub mod container;
pub mod dmp;
pub mod key;
pub mod patch;
pub mod schema;
pub mod session;
pub mod state;
pub mod validation;
pub mod wire;
