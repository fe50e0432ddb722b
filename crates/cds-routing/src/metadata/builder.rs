//! Compiles storage records into the linked metadata graph
//!
//! Every call produces a fresh graph; nothing is cached between builds so the
//! same storage can back several services.

use super::handler::{ActionMetadata, HandlerMetadata};
use super::middleware::{MiddlewareMetadata, UserCheckerMetadata};
use super::param::{ParamMetadata, RejectMetadata};
use super::records::{MIDDLEWARE_METHOD, USER_CHECKER_METHOD};
use super::storage::MetadataStorage;
use crate::types::{ClassRef, ParamKind};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;

/// Builder over one storage
#[derive(Debug, Clone, Copy)]
pub struct MetadataBuilder<'a> {
    storage: &'a MetadataStorage,
}

impl<'a> MetadataBuilder<'a> {
    /// Build from `storage`
    pub fn new(storage: &'a MetadataStorage) -> Self {
        Self { storage }
    }

    /// Compile handlers, all or only those in `classes`
    pub fn build_handlers(
        &self,
        classes: Option<&[ClassRef]>,
        user_checker: Option<&ClassRef>,
    ) -> Vec<Arc<HandlerMetadata>> {
        let records = match classes {
            Some(classes) => self.storage.filter_handlers_for_classes(classes),
            None => self.storage.handlers(),
        };
        let checker = self.build_user_checker(user_checker);

        records
            .into_iter()
            .map(|record| {
                let actions = self.storage.filter_actions_for_target(&record.target);
                Arc::new_cyclic(|handler| HandlerMetadata {
                    target: record.target,
                    entity: record.entity.clone(),
                    actions: actions
                        .into_iter()
                        .map(|action| {
                            Arc::new(ActionMetadata {
                                handler: handler.clone(),
                                target: action.target,
                                method: action.method,
                                entity: record.entity.clone(),
                                handler_kind: action.handler_kind,
                                operation: action.operation,
                                function_import_name: action.function_import_name,
                                reject: self
                                    .storage
                                    .filter_reject_for_target_method(&action.target, action.method)
                                    .map(RejectMetadata::from),
                                params: self.build_params(&action.target, action.method),
                                user_checker: checker.clone(),
                                invoker: action.invoker,
                            })
                        })
                        .collect(),
                })
            })
            .collect()
    }

    /// Compile middlewares, all or only those in `classes`
    ///
    /// Scoped middlewares collect the entity of every handler class that uses them.
    pub fn build_middlewares(
        &self,
        classes: Option<&[ClassRef]>,
        user_checker: Option<&ClassRef>,
    ) -> Vec<MiddlewareMetadata> {
        let records = match classes {
            Some(classes) => self.storage.filter_middlewares_for_classes(classes),
            None => self.storage.middlewares(),
        };
        let checker = self.build_user_checker(user_checker);

        records
            .into_iter()
            .map(|record| {
                let entities = (!record.options.global).then(|| self.scoped_entities(&record.target));
                MiddlewareMetadata {
                    target: record.target,
                    global: record.options.global,
                    priority: record.options.priority,
                    runtime: record.options.runtime,
                    entities,
                    params: self.build_params(&record.target, MIDDLEWARE_METHOD),
                    user_checker: checker.clone(),
                    invoker: record.invoker,
                }
            })
            .collect()
    }

    /// Compile the selected user checker
    pub fn build_user_checker(&self, class: Option<&ClassRef>) -> Option<Arc<UserCheckerMetadata>> {
        let class = class?;
        let Some(record) = self.storage.find_user_checker_for_target(Some(class)) else {
            warn!(class = class.name(), "User checker class has no check method declared");
            return None;
        };

        let params = self.build_params(&record.target, USER_CHECKER_METHOD);
        if params.iter().any(|p| p.kind == ParamKind::User) {
            warn!(
                class = record.target.name(),
                "User checker declares a user parameter; it resolves to None"
            );
        }

        Some(Arc::new(UserCheckerMetadata {
            target: record.target,
            params,
            invoker: record.invoker,
        }))
    }

    fn build_params(&self, target: &ClassRef, method: &str) -> Vec<ParamMetadata> {
        let params: Vec<ParamMetadata> = self
            .storage
            .filter_params_for_target_method(target, method)
            .iter()
            .map(ParamMetadata::from)
            .collect();

        let mut seen = BTreeSet::new();
        for param in &params {
            if !seen.insert(param.index) {
                warn!(
                    class = target.name(),
                    method,
                    index = param.index,
                    "Parameter index declared more than once"
                );
            }
        }
        params
    }

    fn scoped_entities(&self, middleware: &ClassRef) -> Vec<String> {
        let mut entities: Vec<String> = Vec::new();
        for usage in self.storage.filter_uses_for_middleware(middleware) {
            let entity = self
                .storage
                .find_handler_for_target(&usage.target)
                .and_then(|handler| handler.entity)
                .filter(|entity| !entity.is_empty());
            if let Some(entity) = entity {
                if !entities.contains(&entity) {
                    entities.push(entity);
                }
            }
        }
        entities
    }
}
