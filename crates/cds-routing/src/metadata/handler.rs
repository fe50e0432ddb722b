//! Compiled handler classes and their actions.

use super::middleware::UserCheckerMetadata;
use super::param::{ParamMetadata, RejectMetadata};
use super::records::MethodRef;
use crate::container::Container;
use crate::errors::{DispatchError, DispatchResult};
use crate::execution::{ExecutionContext, Executor};
use crate::types::{ClassRef, HandlerKind, Operation};
use async_trait::async_trait;
use std::sync::{Arc, Weak};
use tracing::debug;

/// A handler class with every action declared on it
#[derive(Debug)]
pub struct HandlerMetadata {
    /// Handler class
    pub target: ClassRef,
    /// Entity the handler acts on
    pub entity: Option<String>,
    /// Actions, in declaration order
    pub actions: Vec<Arc<ActionMetadata>>,
}

/// One lifecycle phase and operation bound to a handler method
#[derive(Debug)]
pub struct ActionMetadata {
    /// Owning handler
    pub handler: Weak<HandlerMetadata>,
    /// Handler class
    pub target: ClassRef,
    /// Method name
    pub method: &'static str,
    /// Entity, copied from the handler
    pub entity: Option<String>,
    /// Lifecycle phase
    pub handler_kind: HandlerKind,
    /// Operation
    pub operation: Operation,
    /// Import name for function and action operations
    pub function_import_name: Option<String>,
    /// Rejection signaled when the method fails
    pub reject: Option<RejectMetadata>,
    /// Declared parameters
    pub params: Vec<ParamMetadata>,
    /// User checker shared across the build
    pub user_checker: Option<Arc<UserCheckerMetadata>>,
    /// Bound method
    pub invoker: MethodRef,
}

impl ActionMetadata {
    /// Owning handler, while the graph is alive
    pub fn handler(&self) -> Option<Arc<HandlerMetadata>> {
        self.handler.upgrade()
    }

    /// `Class::method`, used in logs and reports
    pub fn source_name(&self) -> String {
        format!("{}::{}", self.target.short_name(), self.method)
    }

    /// Invoke the action, translating failures into the bound rejection
    ///
    /// Without a rejection, the handler's error propagates unchanged. With
    /// one, it is signaled on the request and the result is `Ok(None)`.
    /// Resolution and argument faults always propagate.
    pub async fn invoke(
        &self,
        context: &ExecutionContext,
        container: &dyn Container,
    ) -> DispatchResult {
        match self.exec(context, container).await {
            Err(DispatchError::Handler(error)) => match &self.reject {
                Some(reject) => {
                    let message = reject.message_for(&error);
                    debug!(
                        action = %self.source_name(),
                        code = reject.code,
                        error = %error,
                        "Handler failed, rejecting request"
                    );
                    context.request.reject(reject.code, message);
                    Ok(None)
                }
                None => Err(DispatchError::Handler(error)),
            },
            other => other,
        }
    }
}

#[async_trait]
impl Executor for ActionMetadata {
    fn target(&self) -> ClassRef {
        self.target
    }

    fn params(&self) -> &[ParamMetadata] {
        &self.params
    }

    fn user_checker(&self) -> Option<&UserCheckerMetadata> {
        self.user_checker.as_deref()
    }

    fn invoker(&self) -> &MethodRef {
        &self.invoker
    }
}
