//! Lifecycle phases and operations a handler method can bind to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of a host subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandlerKind {
    /// Runs before the operation's main handler
    Before,
    /// Runs as the operation's main handler
    On,
    /// Runs after the operation produced its result
    After,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => f.write_str("before"),
            Self::On => f.write_str("on"),
            Self::After => f.write_str("after"),
        }
    }
}

/// Operation an action is registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// Insert a new entity
    Create,
    /// Query entities
    Read,
    /// Replace or modify an entity
    Update,
    /// Remove an entity
    Delete,
    /// Draft: create a new draft
    New,
    /// Draft: put an active entity into edit mode
    Edit,
    /// Draft: patch a draft
    Patch,
    /// Draft: activate a draft
    Save,
    /// Unbound or bound function import
    #[serde(rename = "FUNC")]
    Function,
    /// Unbound or bound action import
    Action,
}

impl Operation {
    /// Every operation, CRUD first
    pub const ALL: [Operation; 10] = [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
        Operation::New,
        Operation::Edit,
        Operation::Patch,
        Operation::Save,
        Operation::Function,
        Operation::Action,
    ];

    /// Event name the host service uses for this operation
    pub fn event(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::New => "NEW",
            Self::Edit => "EDIT",
            Self::Patch => "PATCH",
            Self::Save => "SAVE",
            Self::Function => "FUNC",
            Self::Action => "ACTION",
        }
    }

    /// Function and action imports are subscribed by import name, not by event
    pub fn is_import(&self) -> bool {
        matches!(self, Self::Function | Self::Action)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_match_serde() {
        for operation in Operation::ALL {
            let json = serde_json::to_value(operation).unwrap();
            assert_eq!(json, serde_json::Value::String(operation.event().into()));
        }
    }

    #[test]
    fn test_imports() {
        assert!(Operation::Function.is_import());
        assert!(Operation::Action.is_import());
        assert!(!Operation::Read.is_import());
    }
}
