//! Call-time machinery: execution context, parameter resolution, and dispatch.

pub mod arguments;
pub mod context;
pub mod executor;
pub mod jwt;

pub use arguments::{Argument, Arguments};
pub use context::ExecutionContext;
pub use executor::{build_arguments, Executor};
pub use jwt::retrieve_jwt;
