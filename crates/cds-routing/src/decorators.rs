//! Declarative builders that record handler, middleware, and user checker metadata
//!
//! Each builder collects the facts of one annotated class and appends them to a
//! [`MetadataStorage`]. Decorations that must exist before any explicit
//! initialization are submitted with `inventory`:
//!
//! ```ignore
//! use cds_routing::prelude::*;
//!
//! #[derive(Default)]
//! struct GreeterHandler;
//!
//! fn decorate(storage: &MetadataStorage) {
//!     Handler::<GreeterHandler>::new()
//!         .entity("Greeter")
//!         .method(
//!             Method::new("read", |_this: Arc<GreeterHandler>, args: Arguments| async move {
//!                 Ok::<_, anyhow::Error>(args.param::<String>(1)?)
//!             })
//!             .on_read()
//!             .req(0)
//!             .param(1, "name"),
//!         )
//!         .apply(storage);
//! }
//!
//! inventory::submit!(Decorators::new(decorate));
//! ```

use crate::execution::Arguments;
use crate::metadata::{
    metadata_storage, ActionRecord, HandlerRecord, MetadataStorage, MethodRef, MiddlewareRecord,
    ParamRecord, RejectRecord, UseRecord, UserCheckerRecord, MIDDLEWARE_METHOD, USER_CHECKER_METHOD,
};
use crate::types::{
    ClassRef, HandlerKind, MiddlewareOptions, MiddlewareRuntime, Operation, ParamKind,
};
use serde::Serialize;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;

/// A decoration function collected at startup
///
/// The process-wide storage applies every submitted entry when first touched.
/// Decoration functions must write to the storage they are given and never
/// call [`metadata_storage`] themselves.
pub struct Decorators {
    apply: fn(&MetadataStorage),
}

impl Decorators {
    /// Wrap a decoration function
    pub const fn new(apply: fn(&MetadataStorage)) -> Self {
        Self { apply }
    }

    /// Run the decoration function against `storage`
    pub fn apply(&self, storage: &MetadataStorage) {
        (self.apply)(storage);
    }
}

inventory::collect!(Decorators);

macro_rules! param_markers {
    () => {
        /// Inject the host service at `index`
        pub fn srv(self, index: usize) -> Self {
            self.with_param(index, ParamKind::Srv)
        }

        /// Inject the request at `index`
        pub fn req(self, index: usize) -> Self {
            self.with_param(index, ParamKind::Req)
        }

        /// Inject the request payload at `index`
        pub fn data(self, index: usize) -> Self {
            self.with_param(index, ParamKind::Data)
        }

        /// Inject the function/action parameter object at `index`
        pub fn param_obj(self, index: usize) -> Self {
            self.with_param(index, ParamKind::ParamObj)
        }

        /// Inject the payload field `name` at `index`
        pub fn param(self, index: usize, name: impl Into<String>) -> Self {
            self.with_param(index, ParamKind::Param(name.into()))
        }

        /// Inject the bearer token at `index`
        pub fn jwt(self, index: usize) -> Self {
            self.with_param(index, ParamKind::Jwt)
        }

        /// Inject the after-phase entities at `index`
        pub fn entities(self, index: usize) -> Self {
            self.with_param(index, ParamKind::Entities)
        }

        /// Inject the continuation at `index`
        pub fn next(self, index: usize) -> Self {
            self.with_param(index, ParamKind::Next)
        }

        /// Inject the user's locale at `index`
        pub fn locale(self, index: usize) -> Self {
            self.with_param(index, ParamKind::Locale)
        }

        /// Inject the user checker's result at `index`
        pub fn user(self, index: usize) -> Self {
            self.with_param(index, ParamKind::User)
        }

        fn with_param(mut self, index: usize, kind: ParamKind) -> Self {
            self.params.push((index, kind));
            self
        }
    };
}

macro_rules! lifecycle_markers {
    ($($operation:ident => $before:ident, $on:ident, $after:ident;)*) => {
        $(
            #[doc = concat!("Run before `", stringify!($operation), "`")]
            pub fn $before(self) -> Self {
                self.before(Operation::$operation)
            }

            #[doc = concat!("Handle `", stringify!($operation), "`")]
            pub fn $on(self) -> Self {
                self.on(Operation::$operation)
            }

            #[doc = concat!("Run after `", stringify!($operation), "`")]
            pub fn $after(self) -> Self {
                self.after(Operation::$operation)
            }
        )*
    };
}

#[derive(Debug, Clone)]
struct Binding {
    kind: HandlerKind,
    operation: Operation,
    import_name: Option<String>,
}

/// A method of a handler class with its lifecycle bindings
pub struct Method<T> {
    name: &'static str,
    invoker: MethodRef,
    bindings: Vec<Binding>,
    params: Vec<(usize, ParamKind)>,
    reject: Option<(u16, String, bool)>,
    _class: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Method<T> {
    /// Method `name` implemented by `f`
    pub fn new<F, Fut, R>(name: &'static str, f: F) -> Self
    where
        F: Fn(Arc<T>, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: Serialize + Send + 'static,
    {
        Self {
            name,
            invoker: MethodRef::new(name, f),
            bindings: Vec::new(),
            params: Vec::new(),
            reject: None,
            _class: PhantomData,
        }
    }

    /// Run before `operation`
    pub fn before(self, operation: Operation) -> Self {
        self.bind(HandlerKind::Before, operation, None)
    }

    /// Handle `operation`
    pub fn on(self, operation: Operation) -> Self {
        self.bind(HandlerKind::On, operation, None)
    }

    /// Run after `operation`
    pub fn after(self, operation: Operation) -> Self {
        self.bind(HandlerKind::After, operation, None)
    }

    /// Handle the function import `name`
    pub fn func(self, name: impl Into<String>) -> Self {
        self.import(HandlerKind::On, Operation::Function, name)
    }

    /// Handle the action import `name`
    pub fn action(self, name: impl Into<String>) -> Self {
        self.import(HandlerKind::On, Operation::Action, name)
    }

    /// Bind a phase of a function or action import `name`
    pub fn import(self, kind: HandlerKind, operation: Operation, name: impl Into<String>) -> Self {
        self.bind(kind, operation, Some(name.into()))
    }

    lifecycle_markers! {
        Create => before_create, on_create, after_create;
        Read => before_read, on_read, after_read;
        Update => before_update, on_update, after_update;
        Delete => before_delete, on_delete, after_delete;
        New => before_new, on_new, after_new;
        Edit => before_edit, on_edit, after_edit;
        Patch => before_patch, on_patch, after_patch;
        Save => before_save, on_save, after_save;
    }

    /// Reject the request with `code` and `message` when the method fails
    ///
    /// With `append_error_message` the message becomes `"{message}: {error}"`.
    pub fn on_reject(mut self, code: u16, message: impl Into<String>, append_error_message: bool) -> Self {
        self.reject = Some((code, message.into(), append_error_message));
        self
    }

    param_markers!();

    fn bind(mut self, kind: HandlerKind, operation: Operation, import_name: Option<String>) -> Self {
        self.bindings.push(Binding {
            kind,
            operation,
            import_name,
        });
        self
    }

    fn apply(self, target: ClassRef, storage: &MetadataStorage) {
        if self.bindings.is_empty() {
            warn!(class = target.name(), method = self.name, "Method has no lifecycle binding");
        }
        for binding in self.bindings {
            storage.add_action(ActionRecord {
                target,
                method: self.name,
                handler_kind: binding.kind,
                operation: binding.operation,
                function_import_name: binding.import_name,
                invoker: self.invoker.clone(),
            });
        }
        add_params(storage, target, self.name, self.params);
        if let Some((code, message, append_error_message)) = self.reject {
            storage.add_reject(RejectRecord {
                target,
                method: self.name,
                code,
                message,
                append_error_message,
            });
        }
    }
}

/// Handler class declaration
pub struct Handler<T> {
    target: ClassRef,
    entity: Option<String>,
    uses: Vec<ClassRef>,
    methods: Vec<Method<T>>,
}

impl<T: Default + Send + Sync + 'static> Handler<T> {
    /// Declare a handler the default container can construct
    pub fn new() -> Self {
        Self::for_class(ClassRef::of::<T>())
    }
}

impl<T: Default + Send + Sync + 'static> Default for Handler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> Handler<T> {
    /// Declare a handler whose instance comes from a user container
    pub fn injected() -> Self {
        Self::for_class(ClassRef::external::<T>())
    }

    fn for_class(target: ClassRef) -> Self {
        Self {
            target,
            entity: None,
            uses: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Entity the handler acts on
    pub fn entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Opt into the scoped middleware `M`
    pub fn uses<M: Send + Sync + 'static>(mut self) -> Self {
        self.uses.push(ClassRef::external::<M>());
        self
    }

    /// Add a method
    pub fn method(mut self, method: Method<T>) -> Self {
        self.methods.push(method);
        self
    }

    /// Append the declaration to `storage`
    pub fn apply(self, storage: &MetadataStorage) {
        storage.add_handler(HandlerRecord {
            target: self.target,
            entity: self.entity,
        });
        for middleware in self.uses {
            storage.add_use(UseRecord {
                target: self.target,
                middleware,
            });
        }
        for method in self.methods {
            method.apply(self.target, storage);
        }
    }

    /// Append the declaration to the process-wide storage
    pub fn register(self) {
        self.apply(&metadata_storage());
    }
}

/// Middleware class declaration
pub struct Middleware<T> {
    target: ClassRef,
    options: MiddlewareOptions,
    invoker: Option<MethodRef>,
    params: Vec<(usize, ParamKind)>,
    _class: PhantomData<fn() -> T>,
}

impl<T: Default + Send + Sync + 'static> Middleware<T> {
    /// Declare a middleware the default container can construct
    pub fn new() -> Self {
        Self::for_class(ClassRef::of::<T>())
    }
}

impl<T: Default + Send + Sync + 'static> Default for Middleware<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> Middleware<T> {
    /// Declare a middleware whose instance comes from a user container
    pub fn injected() -> Self {
        Self::for_class(ClassRef::external::<T>())
    }

    fn for_class(target: ClassRef) -> Self {
        Self {
            target,
            options: MiddlewareOptions::default(),
            invoker: None,
            params: Vec::new(),
            _class: PhantomData,
        }
    }

    /// Apply to every request instead of opted-in entities
    pub fn global(mut self, global: bool) -> Self {
        self.options.global = global;
        self
    }

    /// Registration order among global middlewares, ascending
    pub fn priority(mut self, priority: u32) -> Self {
        self.options.priority = priority;
        self
    }

    /// Hook point for a global middleware
    pub fn runtime(mut self, runtime: MiddlewareRuntime) -> Self {
        self.options.runtime = runtime;
        self
    }

    /// Replace all options at once
    pub fn options(mut self, options: MiddlewareOptions) -> Self {
        self.options = options;
        self
    }

    /// The `use` entry point
    pub fn handle<F, Fut, R>(mut self, f: F) -> Self
    where
        F: Fn(Arc<T>, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: Serialize + Send + 'static,
    {
        self.invoker = Some(MethodRef::new(MIDDLEWARE_METHOD, f));
        self
    }

    param_markers!();

    /// Append the declaration to `storage`; skipped without an entry point
    pub fn apply(self, storage: &MetadataStorage) {
        let Some(invoker) = self.invoker else {
            warn!(class = self.target.name(), "Middleware has no use method, skipping");
            return;
        };
        storage.add_middleware(MiddlewareRecord {
            target: self.target,
            options: self.options,
            invoker,
        });
        add_params(storage, self.target, MIDDLEWARE_METHOD, self.params);
    }

    /// Append the declaration to the process-wide storage
    pub fn register(self) {
        self.apply(&metadata_storage());
    }
}

/// User checker class declaration
pub struct UserChecker<T> {
    target: ClassRef,
    invoker: Option<MethodRef>,
    params: Vec<(usize, ParamKind)>,
    _class: PhantomData<fn() -> T>,
}

impl<T: Default + Send + Sync + 'static> UserChecker<T> {
    /// Declare a checker the default container can construct
    pub fn new() -> Self {
        Self::for_class(ClassRef::of::<T>())
    }
}

impl<T: Default + Send + Sync + 'static> Default for UserChecker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> UserChecker<T> {
    /// Declare a checker whose instance comes from a user container
    pub fn injected() -> Self {
        Self::for_class(ClassRef::external::<T>())
    }

    fn for_class(target: ClassRef) -> Self {
        Self {
            target,
            invoker: None,
            params: Vec::new(),
            _class: PhantomData,
        }
    }

    /// The `check` entry point
    pub fn check<F, Fut, R>(mut self, f: F) -> Self
    where
        F: Fn(Arc<T>, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: Serialize + Send + 'static,
    {
        self.invoker = Some(MethodRef::new(USER_CHECKER_METHOD, f));
        self
    }

    param_markers!();

    /// Append the declaration to `storage`; skipped without an entry point
    pub fn apply(self, storage: &MetadataStorage) {
        let Some(invoker) = self.invoker else {
            warn!(class = self.target.name(), "User checker has no check method, skipping");
            return;
        };
        storage.add_user_checker(UserCheckerRecord {
            target: self.target,
            invoker,
        });
        add_params(storage, self.target, USER_CHECKER_METHOD, self.params);
    }

    /// Append the declaration to the process-wide storage
    pub fn register(self) {
        self.apply(&metadata_storage());
    }
}

fn add_params(
    storage: &MetadataStorage,
    target: ClassRef,
    method: &'static str,
    params: Vec<(usize, ParamKind)>,
) {
    for (index, kind) in params {
        storage.add_param(ParamRecord {
            target,
            method,
            index,
            kind,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[derive(Default)]
    struct Greeter;

    #[derive(Default)]
    struct Audit;

    #[derive(Default)]
    struct Checker;

    fn read() -> Method<Greeter> {
        Method::new("read", |_this: Arc<Greeter>, args: Arguments| async move {
            Ok::<_, anyhow::Error>(args.param::<Value>(1)?)
        })
    }

    #[test]
    fn test_handler_declaration() {
        let storage = MetadataStorage::new();
        Handler::<Greeter>::new()
            .entity("Greeter")
            .uses::<Audit>()
            .method(
                read()
                    .on_read()
                    .after_read()
                    .req(0)
                    .param(1, "name")
                    .on_reject(400, "Read failed", true),
            )
            .method(
                Method::new("greet", |_this: Arc<Greeter>, _args: Arguments| async move { Ok("hi") })
                    .func("greet"),
            )
            .apply(&storage);

        let greeter = ClassRef::of::<Greeter>();
        let actions = storage.filter_actions_for_target(&greeter);
        assert_eq!(actions.len(), 3);
        assert_eq!(actions[0].handler_kind, HandlerKind::On);
        assert_eq!(actions[1].handler_kind, HandlerKind::After);
        assert_eq!(actions[2].operation, Operation::Function);
        assert_eq!(actions[2].function_import_name.as_deref(), Some("greet"));

        let params = storage.filter_params_for_target_method(&greeter, "read");
        assert_eq!(params.len(), 2);
        assert_eq!(params[1].kind, ParamKind::Param("name".into()));
        assert!(storage.filter_reject_for_target_method(&greeter, "read").is_some());
        assert_eq!(
            storage.filter_uses_for_middleware(&ClassRef::of::<Audit>())[0].target,
            greeter
        );
    }

    #[test]
    fn test_middleware_declaration() {
        let storage = MetadataStorage::new();
        Middleware::<Audit>::new()
            .global(true)
            .priority(1)
            .runtime(MiddlewareRuntime::BeforeDefaults)
            .handle(|_this: Arc<Audit>, _args: Arguments| async move { Ok(()) })
            .req(0)
            .next(1)
            .apply(&storage);

        let middlewares = storage.middlewares();
        assert_eq!(middlewares.len(), 1);
        assert!(middlewares[0].options.global);
        assert_eq!(middlewares[0].options.priority, 1);
        assert_eq!(
            storage
                .filter_params_for_target_method(&ClassRef::of::<Audit>(), MIDDLEWARE_METHOD)
                .len(),
            2
        );
    }

    #[test]
    fn test_declarations_without_entry_point_are_skipped() {
        let storage = MetadataStorage::new();
        Middleware::<Audit>::new().req(0).apply(&storage);
        UserChecker::<Checker>::new().req(0).apply(&storage);
        assert!(storage.middlewares().is_empty());
        assert!(storage.user_checkers().is_empty());
        assert!(storage.annotated_classes().is_empty());
    }

    #[test]
    fn test_user_checker_declaration() {
        let storage = MetadataStorage::new();
        UserChecker::<Checker>::new()
            .check(|_this: Arc<Checker>, args: Arguments| async move {
                Ok::<_, anyhow::Error>(args.request(0)?.user().map(|u| u.id.clone()))
            })
            .req(0)
            .apply(&storage);

        let checker = ClassRef::of::<Checker>();
        assert!(storage.find_user_checker_for_target(Some(&checker)).is_some());
        assert_eq!(
            storage
                .filter_params_for_target_method(&checker, USER_CHECKER_METHOD)
                .len(),
            1
        );
    }
}
