//! Error types for dispatch, argument access, host subscription, registration, and configuration
//!
//! Per-request faults surface as [`DispatchError`]; startup faults never abort
//! registration of unrelated items and are reported through [`SubscriptionError`]
//! entries. Only a host without a subscription surface yields a [`RegistrationError`].

use serde_json::Value;
use std::path::PathBuf;

/// Result of invoking a compiled action, middleware, or user checker
///
/// `Ok(None)` means the invocation ended in a handled rejection.
pub type DispatchResult = Result<Option<Value>, DispatchError>;

/// Error raised while dispatching a request to annotated code
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The handler body failed; the error is passed through unchanged
    #[error(transparent)]
    Handler(anyhow::Error),

    /// The container has no instance for the class
    #[error("No instance available for class {class}")]
    Unresolved {
        /// Type path of the class
        class: &'static str,
    },

    /// The container returned an instance of a different type
    #[error("Container returned an instance of the wrong type for {class}")]
    InstanceMismatch {
        /// Type path of the class
        class: &'static str,
    },

    /// The method's return value could not be converted to JSON
    #[error("Failed to serialize the result of {class}::{method}")]
    Serialization {
        /// Type path of the class
        class: &'static str,
        /// Method name
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The bound user checker failed while resolving a `User` parameter
    #[error("User checker {class} failed")]
    UserChecker {
        /// Type path of the checker class
        class: &'static str,
        #[source]
        source: Box<DispatchError>,
    },
}

impl DispatchError {
    /// Wrap a handler body failure
    pub fn handler(error: impl Into<anyhow::Error>) -> Self {
        Self::Handler(error.into())
    }

    /// The handler's own error, if this is a handler failure
    pub fn as_handler_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Handler(error) => Some(error),
            _ => None,
        }
    }

    /// Unwrap the handler's own error, if this is a handler failure
    pub fn into_handler_error(self) -> Option<anyhow::Error> {
        match self {
            Self::Handler(error) => Some(error),
            _ => None,
        }
    }
}

/// Error returned by the typed accessors of `Arguments`
#[derive(Debug, thiserror::Error)]
pub enum ArgumentError {
    /// No argument at this position
    #[error("Argument {index} requested but only {len} were built")]
    OutOfRange {
        /// Requested position
        index: usize,
        /// Number of built arguments
        len: usize,
    },

    /// The argument at this position has a different kind
    #[error("Argument {index} is {found}, expected {expected}")]
    Mismatch {
        /// Requested position
        index: usize,
        /// Kind the accessor expects
        expected: &'static str,
        /// Kind actually built
        found: &'static str,
    },

    /// The JSON value could not be decoded into the requested type
    #[error("Argument {index} could not be decoded")]
    Decode {
        /// Requested position
        index: usize,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },
}

/// Error returned by a host that refuses a subscription
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Host refused subscription: {message}")]
pub struct HostError {
    /// Host-provided reason
    pub message: String,
}

impl HostError {
    /// Create a host error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Fault registering a single action or middleware
///
/// These are logged and collected; registration of other items continues.
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    /// A function/action import was declared without an import name
    #[error("{class}::{method} is bound to a function or action import without a name")]
    MissingImportName {
        /// Type path of the handler class
        class: &'static str,
        /// Method name
        method: &'static str,
    },

    /// The host refused the subscription
    #[error("Subscription for {source_name} failed")]
    Host {
        /// `Class::method` that was being registered
        source_name: String,
        #[source]
        source: HostError,
    },
}

/// Error aborting a whole registration call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    /// The host service does not expose before/on/after
    #[error("Service '{service}' does not expose before/on/after; nothing was registered")]
    MissingSubscriptionApi {
        /// Name reported by the host service
        service: String,
    },
}

/// Error loading or validating routing configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read config file {}", .path.display())]
    Io {
        /// Path that was read
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema
    #[error("Invalid routing config")]
    Parse {
        #[source]
        source: toml::de::Error,
    },

    /// A class glob does not parse
    #[error("Invalid class glob '{pattern}'")]
    InvalidGlob {
        /// Offending pattern
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// An environment override has an unusable value
    #[error("Invalid value for {key}: {message}")]
    InvalidEnv {
        /// Environment variable name
        key: String,
        /// What was wrong with it
        message: String,
    },
}
