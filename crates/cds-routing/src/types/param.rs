//! Parameter kinds that can be injected into handler, middleware, and checker methods.

use std::fmt;

/// What a single positional parameter asks the executor for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// The host service reference
    Srv,
    /// The incoming request
    Req,
    /// The request payload
    Data,
    /// The request payload, used for function/action parameter objects
    ParamObj,
    /// A single named field of the request payload
    Param(String),
    /// The bearer token from the transport's authorization header
    Jwt,
    /// The entities produced by the operation (after phase only)
    Entities,
    /// The continuation into the next host handler
    Next,
    /// The locale of the requesting user
    Locale,
    /// The result of the bound user checker
    User,
}

impl ParamKind {
    /// Short kind label used in logs and argument errors
    pub fn label(&self) -> &'static str {
        match self {
            Self::Srv => "srv",
            Self::Req => "req",
            Self::Data => "data",
            Self::ParamObj => "param_obj",
            Self::Param(_) => "param",
            Self::Jwt => "jwt",
            Self::Entities => "entities",
            Self::Next => "next",
            Self::Locale => "locale",
            Self::User => "user",
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Param(name) => write!(f, "param({name})"),
            other => f.write_str(other.label()),
        }
    }
}
