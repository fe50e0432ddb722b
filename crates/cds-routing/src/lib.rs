//! # cds-routing
//!
//! Declarative routing for CDS services. Classes declare which entity,
//! operation, and lifecycle phase each method handles and which values each
//! parameter needs; at startup those declarations are compiled and subscribed
//! on the host service.
//!
//! ## Pipeline
//!
//! 1. **Declare**: [`decorators`] builders append records to a
//!    [`MetadataStorage`], usually from functions submitted with
//!    `inventory::submit!(Decorators::new(..))`.
//! 2. **Build**: [`MetadataBuilder`] links records into handler, action,
//!    middleware, and user checker metadata.
//! 3. **Register**: [`Registrar`] binds the graph to a [`ServiceHost`]'s
//!    `before`/`on`/`after` hooks, global middlewares first by priority.
//! 4. **Dispatch**: each callback builds an [`ExecutionContext`], resolves the
//!    instance through a [`Container`], builds the positional [`Arguments`],
//!    and calls the bound method. Failures of actions with a declared
//!    rejection are turned into [`Request::reject`] calls.
//!
//! The library only logs through `tracing`; installing a subscriber is up to
//! the application.

pub mod config;
pub mod container;
pub mod decorators;
pub mod discovery;
pub mod errors;
pub mod execution;
pub mod host;
pub mod metadata;
pub mod registration;
pub mod types;

pub use inventory;

pub use config::RoutingConfig;
pub use container::{
    get_from_container, reset_container, use_container, Container, DefaultContainer,
    GlobalContainer, InstanceContainer, LayeredContainer,
};
pub use decorators::{Decorators, Handler, Method, Middleware, UserChecker};
pub use discovery::{ClassDiscovery, ClassSource, StorageDiscovery};
pub use errors::{
    ArgumentError, ConfigError, DispatchError, DispatchResult, HostError, RegistrationError,
    SubscriptionError,
};
pub use execution::{build_arguments, retrieve_jwt, Argument, Arguments, ExecutionContext, Executor};
pub use host::{
    CallbackFuture, DefaultHandlerChain, DefaultsPosition, EventSubscriber, Next, Rejection,
    Request, RequestBuilder, RequestCallback, ResultCallback, ServiceHost, TransportMessage,
    UserInfo, ALL_EVENTS,
};
pub use metadata::{
    collect_decorators, metadata_storage, ActionMetadata, HandlerMetadata, MetadataBuilder,
    MetadataStorage, MiddlewareMetadata, UserCheckerMetadata,
};
pub use registration::{
    combined_handler, register, RegisterOptions, Registrar, RegistrationReport, Subscription,
    SubscriptionPhase,
};
pub use types::{ClassRef, HandlerKind, MiddlewareOptions, MiddlewareRuntime, Operation, ParamKind};

/// Everything needed to declare and register classes
pub mod prelude {
    pub use crate::decorators::{Decorators, Handler, Method, Middleware, UserChecker};
    pub use crate::execution::Arguments;
    pub use crate::host::{Next, Request, ServiceHost};
    pub use crate::metadata::MetadataStorage;
    pub use crate::registration::{register, RegisterOptions, Registrar};
    pub use crate::types::{ClassRef, MiddlewareRuntime, Operation};
    pub use std::sync::Arc;
}
