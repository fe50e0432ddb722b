//! Shared dispatch base: instance resolution and parameter resolution
//!
//! Actions, middlewares, and user checkers only differ in what they do around
//! a call. Building the positional argument list from [`ParamMetadata`]
//! descriptors lives here and nowhere else.

use super::arguments::{Argument, Arguments};
use super::context::ExecutionContext;
use super::jwt::retrieve_jwt;
use crate::container::Container;
use crate::errors::{DispatchError, DispatchResult};
use crate::metadata::{MethodRef, ParamMetadata, UserCheckerMetadata};
use crate::types::{ClassRef, ParamKind};
use async_trait::async_trait;
use serde_json::Value;

/// A compiled, invocable unit of the metadata graph
#[async_trait]
pub trait Executor: Send + Sync {
    /// Class whose instance is invoked
    fn target(&self) -> ClassRef;

    /// Declared parameters, in declaration order
    fn params(&self) -> &[ParamMetadata];

    /// User checker that satisfies `user` parameters
    fn user_checker(&self) -> Option<&UserCheckerMetadata>;

    /// Bound method
    fn invoker(&self) -> &MethodRef;

    /// Resolve the instance, build arguments, and call the bound method
    async fn exec(&self, context: &ExecutionContext, container: &dyn Container) -> DispatchResult {
        let target = self.target();
        let instance = container
            .resolve(&target)
            .ok_or(DispatchError::Unresolved {
                class: target.name(),
            })?;
        let args = build_arguments(self.params(), context, self.user_checker(), container).await?;
        self.invoker().call(instance, args).await
    }
}

/// Resolve parameter descriptors into positional arguments
///
/// Descriptors are ordered by ascending index (stable for duplicates). The
/// result has one entry per descriptor.
pub async fn build_arguments(
    params: &[ParamMetadata],
    context: &ExecutionContext,
    user_checker: Option<&UserCheckerMetadata>,
    container: &dyn Container,
) -> Result<Arguments, DispatchError> {
    let mut sorted: Vec<&ParamMetadata> = params.iter().collect();
    sorted.sort_by_key(|param| param.index);

    let mut values = Vec::with_capacity(sorted.len());
    for param in sorted {
        let value = match &param.kind {
            ParamKind::Srv => Argument::Service(context.service.clone()),
            ParamKind::Req => Argument::Request(context.request.clone()),
            ParamKind::Data | ParamKind::ParamObj => Argument::Data(context.request.data().clone()),
            ParamKind::Param(name) => Argument::Param(payload_field(context.request.data(), name)),
            ParamKind::Jwt => Argument::Jwt(retrieve_jwt(&context.request)),
            ParamKind::Entities => Argument::Entities(context.entities.clone()),
            ParamKind::Next => Argument::Next(context.next.clone()),
            ParamKind::Locale => Argument::Locale(context.request.locale().map(str::to_string)),
            ParamKind::User => match user_checker {
                Some(checker) => {
                    let user = checker.exec(context, container).await.map_err(|source| {
                        DispatchError::UserChecker {
                            class: checker.target.name(),
                            source: Box::new(source),
                        }
                    })?;
                    Argument::User(user)
                }
                None => Argument::User(None),
            },
        };
        values.push(value);
    }

    Ok(Arguments::new(values))
}

fn payload_field(data: &Value, name: &str) -> Option<Value> {
    data.get(name).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::DefaultContainer;
    use crate::host::{EventSubscriber, Next, Request, ServiceHost, UserInfo};
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::Arc;

    struct Bare;

    impl ServiceHost for Bare {
        fn name(&self) -> &str {
            "Bare"
        }

        fn subscriptions(&self) -> Option<&dyn EventSubscriber> {
            None
        }
    }

    fn context(data: Value) -> ExecutionContext {
        let request = Request::builder("READ")
            .data(data)
            .user(UserInfo {
                id: "ann".into(),
                locale: Some("de".into()),
                ..UserInfo::default()
            })
            .header("authorization", "Bearer token")
            .build();
        ExecutionContext::new(Arc::new(Bare), request).with_next(Some(Next::noop()))
    }

    fn param(index: usize, kind: ParamKind) -> ParamMetadata {
        ParamMetadata { index, kind }
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        futures::executor::block_on(future)
    }

    #[test]
    fn test_every_kind_resolves() {
        let ctx = context(json!({"name": "Ann"}));
        let params = vec![
            param(0, ParamKind::Srv),
            param(1, ParamKind::Req),
            param(2, ParamKind::Data),
            param(3, ParamKind::ParamObj),
            param(4, ParamKind::Param("name".into())),
            param(5, ParamKind::Param("missing".into())),
            param(6, ParamKind::Jwt),
            param(7, ParamKind::Entities),
            param(8, ParamKind::Next),
            param(9, ParamKind::Locale),
            param(10, ParamKind::User),
        ];
        let args = block_on(build_arguments(&params, &ctx, None, &DefaultContainer::new())).unwrap();

        assert_eq!(args.len(), params.len());
        assert_eq!(args.service(0).unwrap().name(), "Bare");
        assert!(Arc::ptr_eq(&args.request(1).unwrap(), &ctx.request));
        assert_eq!(args.data(2).unwrap(), &json!({"name": "Ann"}));
        assert_eq!(args.data(3).unwrap(), &json!({"name": "Ann"}));
        assert_eq!(args.param::<String>(4).unwrap().as_deref(), Some("Ann"));
        assert_eq!(args.param::<String>(5).unwrap(), None);
        assert_eq!(args.jwt(6).unwrap(), Some("token"));
        assert_eq!(args.entities(7).unwrap(), None);
        assert!(args.next(8).unwrap().is_some());
        assert_eq!(args.locale(9).unwrap(), Some("de"));
        assert_eq!(args.user::<Value>(10).unwrap(), None);
    }

    #[test]
    fn test_param_on_non_object_payload() {
        let ctx = context(json!("scalar"));
        let args = block_on(build_arguments(
            &[param(0, ParamKind::Param("name".into()))],
            &ctx,
            None,
            &DefaultContainer::new(),
        ))
        .unwrap();
        assert_eq!(args.param::<String>(0).unwrap(), None);
    }

    proptest! {
        #[test]
        fn prop_arguments_follow_index_order(order in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle()) {
            let ctx = context(json!({"p0": 0, "p1": 1, "p2": 2, "p3": 3, "p4": 4, "p5": 5}));
            let params: Vec<ParamMetadata> = order
                .iter()
                .map(|i| param(*i, ParamKind::Param(format!("p{i}"))))
                .collect();
            let args = block_on(build_arguments(&params, &ctx, None, &DefaultContainer::new())).unwrap();
            prop_assert_eq!(args.len(), 6);
            for i in 0..6usize {
                prop_assert_eq!(args.param::<usize>(i).unwrap(), Some(i));
            }
        }
    }
}
