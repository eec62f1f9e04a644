//! Path-addressed document patches.
//!
//! The patch layer has two halves: [`types`] defines the operations and
//! their failure modes, [`apply`] executes them against plain JSON values.
//! Higher layers (containers, sessions) build on these primitives but the
//! engine itself has no notion of schemas or documents.

pub mod apply;
pub mod types;

pub use apply::{apply, apply_all};
pub use types::{prefix_all, InsertPosition, Origin, Patch, PatchError, PatchOp};
