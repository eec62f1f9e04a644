//! Optimistic editing sessions.
//!
//! A [`DocumentSession`] sits between an editing surface and the store's
//! event stream. Local edits apply to the in-memory state immediately and go
//! out as wire batches; when the store later echoes a mutation tagged
//! [`Origin::Local`] the session drops it instead of applying it twice.
//! Remote mutations apply as they arrive, and a snapshot or rebase replaces
//! the state wholesale. There is no retry or conflict resolution here; the
//! store's stream is taken as authoritative.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::patch::{Origin, Patch, PatchError};
use crate::schema::SchemaType;
use crate::state::DocumentState;
use crate::validation::ValidationResult;
use crate::wire::{self, WireError, WirePatch};

/// One event from the store's document stream.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// The initial checkout of the document.
    Snapshot { document: Option<Value> },
    /// A committed mutation batch.
    Mutation {
        origin: Origin,
        patches: Vec<WirePatch>,
    },
    /// An authoritative resync. Any unconfirmed local edits are gone.
    Rebase { document: Option<Value> },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Patch(#[from] PatchError),
    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Local editing state for one document.
pub struct DocumentSession {
    ty: SchemaType,
    state: DocumentState,
    in_flight: Vec<Vec<WirePatch>>,
}

impl DocumentSession {
    pub fn new(document: Option<&Value>, ty: SchemaType) -> DocumentSession {
        let state = DocumentState::new(document, ty.clone());
        DocumentSession {
            ty,
            state,
            in_flight: Vec::new(),
        }
    }

    pub fn state(&self) -> &DocumentState {
        &self.state
    }

    pub fn value(&self) -> Option<Value> {
        self.state.value()
    }

    pub fn validate(&self) -> ValidationResult {
        self.state.validate()
    }

    /// Number of submitted batches the store has not echoed back yet.
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    /// Applies an edit optimistically and returns the wire batches to
    /// submit. Nothing changes unless both the encoding and the local apply
    /// succeed.
    pub fn apply_local(&mut self, patches: &[Patch]) -> Result<Vec<WirePatch>, SessionError> {
        let batch = wire::to_wire(patches)?;
        let next = self.state.apply_all(patches)?;
        self.state = next;
        if batch.is_empty() {
            return Ok(batch);
        }
        debug!(batches = batch.len(), "submitting local edit");
        self.in_flight.push(batch.clone());
        Ok(batch)
    }

    /// Feeds one store event into the session.
    pub fn handle_event(&mut self, event: StoreEvent) -> Result<(), SessionError> {
        match event {
            StoreEvent::Snapshot { document } | StoreEvent::Rebase { document } => {
                debug!(pending = self.in_flight.len(), "replacing state from store");
                self.state = DocumentState::new(document.as_ref(), self.ty.clone());
                self.in_flight.clear();
            }
            StoreEvent::Mutation {
                origin: Origin::Local,
                patches,
            } => {
                // Our own edit coming back around. The state already
                // reflects it, so only the in-flight record is settled.
                match self.in_flight.iter().position(|batch| *batch == patches) {
                    Some(index) => {
                        self.in_flight.remove(index);
                    }
                    None => debug!("local echo with no in-flight record"),
                }
            }
            StoreEvent::Mutation {
                origin: Origin::Remote,
                patches,
            } => {
                let expanded = wire::from_wire(Origin::Remote, &patches)?;
                self.state = self.state.apply_all(&expanded)?;
            }
        }
        Ok(())
    }
}
