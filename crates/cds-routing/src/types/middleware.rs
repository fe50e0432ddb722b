//! Middleware scheduling options.

use serde::{Deserialize, Serialize};

/// Priority assigned to middlewares that do not declare one
pub const DEFAULT_MIDDLEWARE_PRIORITY: u32 = 99;

/// Where a global middleware is hooked into the host service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MiddlewareRuntime {
    /// Regular `before("*")` subscription
    #[default]
    Normal,
    /// Spliced in front of the host's built-in default handlers.
    ///
    /// Deprecated: only hosts that expose their default handler list support this.
    BeforeDefaults,
    /// Spliced behind the host's built-in default handlers.
    ///
    /// Deprecated: only hosts that expose their default handler list support this.
    AfterDefaults,
}

/// Options of a `Middleware` declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiddlewareOptions {
    /// Applies to every request instead of entities that opted in via `uses`
    pub global: bool,
    /// Lower values are registered, and therefore run, first
    pub priority: u32,
    /// Hook point for global middlewares
    pub runtime: MiddlewareRuntime,
}

impl Default for MiddlewareOptions {
    fn default() -> Self {
        Self {
            global: false,
            priority: DEFAULT_MIDDLEWARE_PRIORITY,
            runtime: MiddlewareRuntime::Normal,
        }
    }
}
