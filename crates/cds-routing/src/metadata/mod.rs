//! Decoration records, their storage, and the compiled metadata graph
//!
//! Records are plain facts appended while decorations run. The
//! [`MetadataBuilder`] links them into [`HandlerMetadata`] → [`ActionMetadata`]
//! and [`MiddlewareMetadata`] nodes, each able to invoke its bound method.

pub mod builder;
pub mod handler;
pub mod middleware;
pub mod param;
pub mod records;
pub mod storage;

pub use builder::MetadataBuilder;
pub use handler::{ActionMetadata, HandlerMetadata};
pub use middleware::{MiddlewareMetadata, UserCheckerMetadata};
pub use param::{ParamMetadata, RejectMetadata};
pub use records::{
    ActionRecord, HandlerRecord, MethodRef, MiddlewareRecord, ParamRecord, RejectRecord,
    UseRecord, UserCheckerRecord, MIDDLEWARE_METHOD, USER_CHECKER_METHOD,
};
pub use storage::{collect_decorators, metadata_storage, MetadataStorage};
