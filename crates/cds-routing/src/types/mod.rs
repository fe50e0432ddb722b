//! Plain value types shared by records, compiled metadata, and the registration engine.

pub mod class;
pub mod middleware;
pub mod operation;
pub mod param;

pub use class::{ClassFactory, ClassRef, Instance};
pub use middleware::{MiddlewareOptions, MiddlewareRuntime, DEFAULT_MIDDLEWARE_PRIORITY};
pub use operation::{HandlerKind, Operation};
pub use param::ParamKind;
