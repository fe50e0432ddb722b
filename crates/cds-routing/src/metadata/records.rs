//! Raw decoration records
//!
//! One record per decorated site. Records carry no behavior beyond the bound
//! [`MethodRef`]; the builder links them into the compiled graph.

use crate::errors::{DispatchError, DispatchResult};
use crate::execution::Arguments;
use crate::types::{ClassRef, HandlerKind, Instance, MiddlewareOptions, Operation, ParamKind};
use futures::future::{self, BoxFuture};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Method name of a middleware's entry point
pub const MIDDLEWARE_METHOD: &str = "use";

/// Method name of a user checker's entry point
pub const USER_CHECKER_METHOD: &str = "check";

type ErasedMethod = dyn Fn(Instance, Arguments) -> BoxFuture<'static, DispatchResult> + Send + Sync;

/// Direct reference to a method on an annotated class
///
/// Wraps `fn(Arc<T>, Arguments) -> impl Future<Output = anyhow::Result<R>>` so
/// the compiled graph can invoke it on a type-erased container instance.
#[derive(Clone)]
pub struct MethodRef {
    class: &'static str,
    method: &'static str,
    call: Arc<ErasedMethod>,
}

impl MethodRef {
    /// Bind `method` of `T`
    pub fn new<T, F, Fut, R>(method: &'static str, f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<T>, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: Serialize + Send + 'static,
    {
        let class = std::any::type_name::<T>();
        let call = move |instance: Instance, args: Arguments| -> BoxFuture<'static, DispatchResult> {
            let this = match instance.downcast::<T>() {
                Ok(this) => this,
                Err(_) => {
                    return Box::pin(future::ready(Err(DispatchError::InstanceMismatch { class })))
                }
            };
            let pending = f(this, args);
            Box::pin(async move {
                let value = pending.await.map_err(DispatchError::Handler)?;
                serde_json::to_value(value)
                    .map(Some)
                    .map_err(|source| DispatchError::Serialization {
                        class,
                        method,
                        source,
                    })
            })
        };
        Self {
            class,
            method,
            call: Arc::new(call),
        }
    }

    /// Type path of the owning class
    pub fn class(&self) -> &'static str {
        self.class
    }

    /// Method name
    pub fn method(&self) -> &'static str {
        self.method
    }

    /// Invoke the method on `instance`
    pub async fn call(&self, instance: Instance, args: Arguments) -> DispatchResult {
        (self.call)(instance, args).await
    }
}

impl fmt::Debug for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodRef({}::{})", self.class, self.method)
    }
}

/// A class declared as handler
#[derive(Debug, Clone)]
pub struct HandlerRecord {
    /// Handler class
    pub target: ClassRef,
    /// Entity the handler acts on; `None` for function/action-only classes
    pub entity: Option<String>,
}

/// A method bound to a lifecycle phase and operation
#[derive(Debug, Clone)]
pub struct ActionRecord {
    /// Handler class
    pub target: ClassRef,
    /// Method name
    pub method: &'static str,
    /// Lifecycle phase
    pub handler_kind: HandlerKind,
    /// Operation
    pub operation: Operation,
    /// Import name for function and action operations
    pub function_import_name: Option<String>,
    /// Bound method
    pub invoker: MethodRef,
}

/// A decorated method parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamRecord {
    /// Owning class
    pub target: ClassRef,
    /// Method name
    pub method: &'static str,
    /// Position in the method's argument list
    pub index: usize,
    /// What the parameter asks for
    pub kind: ParamKind,
}

/// Rejection declared for a handler method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectRecord {
    /// Handler class
    pub target: ClassRef,
    /// Method name
    pub method: &'static str,
    /// Status code sent on rejection
    pub code: u16,
    /// Message sent on rejection
    pub message: String,
    /// Append the handler's error message as `"{message}: {error}"`
    pub append_error_message: bool,
}

/// A class declared as middleware
#[derive(Debug, Clone)]
pub struct MiddlewareRecord {
    /// Middleware class
    pub target: ClassRef,
    /// Scope, priority and hook point
    pub options: MiddlewareOptions,
    /// Bound `use` entry point
    pub invoker: MethodRef,
}

/// A handler class opting into a scoped middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseRecord {
    /// Handler class
    pub target: ClassRef,
    /// Middleware class
    pub middleware: ClassRef,
}

/// A class declared as user checker
#[derive(Debug, Clone)]
pub struct UserCheckerRecord {
    /// Checker class
    pub target: ClassRef,
    /// Bound `check` entry point
    pub invoker: MethodRef,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[derive(Default)]
    struct Greeter {
        greeting: &'static str,
    }

    #[derive(Default)]
    struct Other;

    fn greet() -> MethodRef {
        MethodRef::new("greet", |this: Arc<Greeter>, _args: Arguments| async move {
            Ok(json!({ "greeting": this.greeting }))
        })
    }

    #[tokio::test]
    async fn test_call_serializes_result() {
        let instance: Instance = Arc::new(Greeter { greeting: "hi" });
        let result = greet().call(instance, Arguments::default()).await.unwrap();
        assert_eq!(result, Some(json!({ "greeting": "hi" })));
    }

    #[tokio::test]
    async fn test_call_rejects_foreign_instance() {
        let instance: Instance = Arc::new(Other);
        let result = greet().call(instance, Arguments::default()).await;
        assert_matches!(result, Err(DispatchError::InstanceMismatch { .. }));
    }

    #[tokio::test]
    async fn test_call_passes_handler_error() {
        let method = MethodRef::new("fail", |_this: Arc<Greeter>, _args: Arguments| async move {
            Err::<(), _>(anyhow::anyhow!("nope"))
        });
        let result = method.call(Arc::new(Greeter::default()), Arguments::default()).await;
        assert_eq!(result.unwrap_err().to_string(), "nope");
    }

    #[test]
    fn test_names() {
        let method = greet();
        assert_eq!(method.method(), "greet");
        assert!(method.class().ends_with("Greeter"));
    }
}
