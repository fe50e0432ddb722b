//! Parameter and rejection descriptors of the compiled graph.

use super::records::{ParamRecord, RejectRecord};
use crate::types::ParamKind;

/// Resolved parameter descriptor consumed by argument building
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamMetadata {
    /// Position in the method's argument list
    pub index: usize,
    /// What the parameter asks for
    pub kind: ParamKind,
}

impl From<&ParamRecord> for ParamMetadata {
    fn from(record: &ParamRecord) -> Self {
        Self {
            index: record.index,
            kind: record.kind.clone(),
        }
    }
}

/// Rejection bound to an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectMetadata {
    /// Status code
    pub code: u16,
    /// Configured message
    pub message: String,
    /// Append the handler error's message
    pub append_error_message: bool,
}

impl RejectMetadata {
    /// Message to signal for a failed invocation
    pub fn message_for(&self, error: &anyhow::Error) -> String {
        if self.append_error_message {
            format!("{}: {error}", self.message)
        } else {
            self.message.clone()
        }
    }
}

impl From<RejectRecord> for RejectMetadata {
    fn from(record: RejectRecord) -> Self {
        Self {
            code: record.code,
            message: record.message,
            append_error_message: record.append_error_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_for() {
        let mut reject = RejectMetadata {
            code: 400,
            message: "Greeting failed".into(),
            append_error_message: false,
        };
        let error = anyhow::anyhow!("name missing");
        assert_eq!(reject.message_for(&error), "Greeting failed");

        reject.append_error_message = true;
        assert_eq!(reject.message_for(&error), "Greeting failed: name missing");
    }
}
