//! Process-wide collection of decoration records
//!
//! Decorations are written while the process starts (see
//! [`Decorators`](crate::decorators::Decorators)), read when a service is
//! registered, and effectively read-only once requests flow. Insertion never
//! fails: conflicting rejections are logged and the first one is kept.

use super::records::{
    ActionRecord, HandlerRecord, MiddlewareRecord, ParamRecord, RejectRecord, UseRecord,
    UserCheckerRecord,
};
use crate::decorators::Decorators;
use crate::types::ClassRef;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

/// Append-only record lists with lookup by class, method, and middleware
#[derive(Debug, Default)]
pub struct MetadataStorage {
    handlers: RwLock<Vec<HandlerRecord>>,
    actions: RwLock<Vec<ActionRecord>>,
    params: RwLock<Vec<ParamRecord>>,
    rejects: RwLock<Vec<RejectRecord>>,
    middlewares: RwLock<Vec<MiddlewareRecord>>,
    uses: RwLock<Vec<UseRecord>>,
    user_checkers: RwLock<Vec<UserCheckerRecord>>,
}

impl MetadataStorage {
    /// Empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a handler class; a second declaration for the same class replaces the first
    pub fn add_handler(&self, record: HandlerRecord) {
        let mut handlers = self.handlers.write();
        if let Some(existing) = handlers.iter_mut().find(|h| h.target == record.target) {
            debug!(class = record.target.name(), "Handler declared twice, keeping the last declaration");
            *existing = record;
        } else {
            handlers.push(record);
        }
    }

    /// Record an action
    pub fn add_action(&self, record: ActionRecord) {
        self.actions.write().push(record);
    }

    /// Record a parameter
    pub fn add_param(&self, record: ParamRecord) {
        self.params.write().push(record);
    }

    /// Record a rejection unless one exists for the same class and method
    pub fn add_reject(&self, record: RejectRecord) {
        let mut rejects = self.rejects.write();
        if rejects
            .iter()
            .any(|r| r.target == record.target && r.method == record.method)
        {
            warn!(
                class = record.target.name(),
                method = record.method,
                "Reject already declared for this method, ignoring the new declaration"
            );
            return;
        }
        rejects.push(record);
    }

    /// Record a middleware class
    pub fn add_middleware(&self, record: MiddlewareRecord) {
        self.middlewares.write().push(record);
    }

    /// Record a handler's use of a middleware
    pub fn add_use(&self, record: UseRecord) {
        self.uses.write().push(record);
    }

    /// Record a user checker class
    pub fn add_user_checker(&self, record: UserCheckerRecord) {
        self.user_checkers.write().push(record);
    }

    /// All handler records
    pub fn handlers(&self) -> Vec<HandlerRecord> {
        self.handlers.read().clone()
    }

    /// All middleware records
    pub fn middlewares(&self) -> Vec<MiddlewareRecord> {
        self.middlewares.read().clone()
    }

    /// All user checker records
    pub fn user_checkers(&self) -> Vec<UserCheckerRecord> {
        self.user_checkers.read().clone()
    }

    /// Handler records whose class is in `classes`
    pub fn filter_handlers_for_classes(&self, classes: &[ClassRef]) -> Vec<HandlerRecord> {
        self.handlers
            .read()
            .iter()
            .filter(|h| classes.contains(&h.target))
            .cloned()
            .collect()
    }

    /// Handler record of one class
    pub fn find_handler_for_target(&self, target: &ClassRef) -> Option<HandlerRecord> {
        self.handlers
            .read()
            .iter()
            .find(|h| &h.target == target)
            .cloned()
    }

    /// Action records declared on `target`
    pub fn filter_actions_for_target(&self, target: &ClassRef) -> Vec<ActionRecord> {
        self.actions
            .read()
            .iter()
            .filter(|a| &a.target == target)
            .cloned()
            .collect()
    }

    /// Middleware records whose class is in `classes`
    pub fn filter_middlewares_for_classes(&self, classes: &[ClassRef]) -> Vec<MiddlewareRecord> {
        self.middlewares
            .read()
            .iter()
            .filter(|m| classes.contains(&m.target))
            .cloned()
            .collect()
    }

    /// Use records referencing `middleware`
    pub fn filter_uses_for_middleware(&self, middleware: &ClassRef) -> Vec<UseRecord> {
        self.uses
            .read()
            .iter()
            .filter(|u| &u.middleware == middleware)
            .cloned()
            .collect()
    }

    /// The rejection declared for a method, if any
    pub fn filter_reject_for_target_method(
        &self,
        target: &ClassRef,
        method: &str,
    ) -> Option<RejectRecord> {
        self.rejects
            .read()
            .iter()
            .find(|r| &r.target == target && r.method == method)
            .cloned()
    }

    /// Parameter records of a method, in insertion order
    pub fn filter_params_for_target_method(&self, target: &ClassRef, method: &str) -> Vec<ParamRecord> {
        self.params
            .read()
            .iter()
            .filter(|p| &p.target == target && p.method == method)
            .cloned()
            .collect()
    }

    /// User checker record of `target`; `None` when no target is given
    pub fn find_user_checker_for_target(&self, target: Option<&ClassRef>) -> Option<UserCheckerRecord> {
        let target = target?;
        self.user_checkers
            .read()
            .iter()
            .find(|c| &c.target == target)
            .cloned()
    }

    /// Every class carrying handler, middleware, or user checker records
    pub fn annotated_classes(&self) -> Vec<ClassRef> {
        let mut classes: Vec<ClassRef> = Vec::new();
        let handlers = self.handlers.read();
        let middlewares = self.middlewares.read();
        let checkers = self.user_checkers.read();
        let all = handlers
            .iter()
            .map(|h| h.target)
            .chain(middlewares.iter().map(|m| m.target))
            .chain(checkers.iter().map(|c| c.target));
        for class in all {
            if !classes.contains(&class) {
                classes.push(class);
            }
        }
        classes
    }

    /// Number of rejections recorded
    pub fn reject_count(&self) -> usize {
        self.rejects.read().len()
    }

    /// Clear every list
    pub fn reset(&self) {
        self.handlers.write().clear();
        self.actions.write().clear();
        self.params.write().clear();
        self.rejects.write().clear();
        self.middlewares.write().clear();
        self.uses.write().clear();
        self.user_checkers.write().clear();
    }
}

static STORAGE: Lazy<Arc<MetadataStorage>> = Lazy::new(|| {
    let storage = Arc::new(MetadataStorage::new());
    let applied = collect_decorators(&storage);
    debug!(decorators = applied, "Collected decorators");
    storage
});

/// The process-wide storage, populated with every submitted [`Decorators`] entry
pub fn metadata_storage() -> Arc<MetadataStorage> {
    Arc::clone(&STORAGE)
}

/// Apply every submitted [`Decorators`] entry to `storage`
///
/// Meant for fresh or freshly [`reset`](MetadataStorage::reset) storage;
/// applying twice duplicates actions and parameters.
pub fn collect_decorators(storage: &MetadataStorage) -> usize {
    let mut applied = 0;
    for decorators in inventory::iter::<Decorators> {
        decorators.apply(storage);
        applied += 1;
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::Arguments;
    use crate::metadata::records::MethodRef;
    use crate::types::{HandlerKind, MiddlewareOptions, Operation, ParamKind};

    #[derive(Default)]
    struct Greeter;

    #[derive(Default)]
    struct Audit;

    fn noop<T: Send + Sync + 'static>(method: &'static str) -> MethodRef {
        MethodRef::new(method, |_this: Arc<T>, _args: Arguments| async move { Ok(()) })
    }

    fn reject(message: &str) -> RejectRecord {
        RejectRecord {
            target: ClassRef::of::<Greeter>(),
            method: "read",
            code: 400,
            message: message.into(),
            append_error_message: false,
        }
    }

    #[test]
    fn test_duplicate_reject_keeps_first() {
        let storage = MetadataStorage::new();
        storage.add_reject(reject("first"));
        storage.add_reject(reject("second"));

        assert_eq!(storage.reject_count(), 1);
        let kept = storage
            .filter_reject_for_target_method(&ClassRef::of::<Greeter>(), "read")
            .unwrap();
        assert_eq!(kept.message, "first");
    }

    #[test]
    fn test_handler_redeclaration_replaces() {
        let storage = MetadataStorage::new();
        for entity in ["A", "B"] {
            storage.add_handler(HandlerRecord {
                target: ClassRef::of::<Greeter>(),
                entity: Some(entity.into()),
            });
        }
        let handlers = storage.handlers();
        assert_eq!(handlers.len(), 1);
        assert_eq!(handlers[0].entity.as_deref(), Some("B"));
    }

    #[test]
    fn test_filters() {
        let storage = MetadataStorage::new();
        let greeter = ClassRef::of::<Greeter>();
        let audit = ClassRef::of::<Audit>();
        storage.add_handler(HandlerRecord {
            target: greeter,
            entity: Some("Greeter".into()),
        });
        storage.add_action(ActionRecord {
            target: greeter,
            method: "read",
            handler_kind: HandlerKind::On,
            operation: Operation::Read,
            function_import_name: None,
            invoker: noop::<Greeter>("read"),
        });
        storage.add_param(ParamRecord {
            target: greeter,
            method: "read",
            index: 0,
            kind: ParamKind::Req,
        });
        storage.add_middleware(MiddlewareRecord {
            target: audit,
            options: MiddlewareOptions::default(),
            invoker: noop::<Audit>("use"),
        });
        storage.add_use(UseRecord {
            target: greeter,
            middleware: audit,
        });

        assert_eq!(storage.filter_handlers_for_classes(&[greeter]).len(), 1);
        assert!(storage.filter_handlers_for_classes(&[audit]).is_empty());
        assert_eq!(storage.filter_actions_for_target(&greeter).len(), 1);
        assert_eq!(storage.filter_params_for_target_method(&greeter, "read").len(), 1);
        assert!(storage.filter_params_for_target_method(&greeter, "write").is_empty());
        assert_eq!(storage.filter_middlewares_for_classes(&[audit]).len(), 1);
        assert_eq!(storage.filter_uses_for_middleware(&audit)[0].target, greeter);
        assert_eq!(storage.annotated_classes(), vec![greeter, audit]);
        assert!(storage.find_user_checker_for_target(None).is_none());
        assert!(storage.find_user_checker_for_target(Some(&greeter)).is_none());

        storage.reset();
        assert!(storage.handlers().is_empty());
        assert!(storage.annotated_classes().is_empty());
    }
}
