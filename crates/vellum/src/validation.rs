//! Validation results.
//!
//! Validation never fails: data problems become messages in a result tree
//! that mirrors the document shape. Results are produced on demand and are
//! not cached anywhere.

use indexmap::IndexMap;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
}

/// One validation finding at a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationMessage {
    /// Stable machine-readable identifier, e.g. `required`.
    pub id: &'static str,
    pub level: Level,
    pub message: String,
}

/// Validation findings for one node and its children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    pub messages: Vec<ValidationMessage>,
    /// Child results of an object node, keyed by field name.
    pub fields: IndexMap<String, ValidationResult>,
    /// Child results of an array node, keyed by element index.
    pub items: BTreeMap<usize, ValidationResult>,
}

impl ValidationResult {
    pub fn new() -> ValidationResult {
        ValidationResult::default()
    }

    pub fn add_error(&mut self, id: &'static str, message: impl Into<String>) {
        self.messages.push(ValidationMessage {
            id,
            level: Level::Error,
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, id: &'static str, message: impl Into<String>) {
        self.messages.push(ValidationMessage {
            id,
            level: Level::Warning,
            message: message.into(),
        });
    }

    /// Record a child result under a field name. Blank results are dropped.
    pub fn add_field(&mut self, name: impl Into<String>, result: ValidationResult) {
        if !result.is_blank() {
            self.fields.insert(name.into(), result);
        }
    }

    /// Record a child result under an element index. Blank results are dropped.
    pub fn add_item(&mut self, index: usize, result: ValidationResult) {
        if !result.is_blank() {
            self.items.insert(index, result);
        }
    }

    /// No messages and no child results at all.
    pub fn is_blank(&self) -> bool {
        self.messages.is_empty() && self.fields.is_empty() && self.items.is_empty()
    }

    /// No error-level message at any depth. Warnings do not affect validity.
    pub fn is_valid(&self) -> bool {
        self.messages.iter().all(|m| m.level != Level::Error)
            && self.fields.values().all(ValidationResult::is_valid)
            && self.items.values().all(ValidationResult::is_valid)
    }

    /// Total number of error-level messages at any depth.
    pub fn error_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.level == Level::Error)
            .count()
            + self.fields.values().map(ValidationResult::error_count).sum::<usize>()
            + self.items.values().map(ValidationResult::error_count).sum::<usize>()
    }
}
