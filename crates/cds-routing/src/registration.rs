//! Registration engine
//!
//! Builds a fresh metadata graph for the selected classes and binds it to a
//! host service's subscription surface:
//!
//! 1. global middlewares, ascending by priority, through their runtime hook
//! 2. scoped middlewares, one `before("*")` per collected entity
//! 3. handler actions through `before`/`on`/`after`
//!
//! A fault registering one item is logged, collected in the
//! [`RegistrationReport`], and does not stop the others. Only a host without a
//! subscription surface aborts the call.

use crate::config::RoutingConfig;
use crate::container::{Container, GlobalContainer};
use crate::discovery::{resolve_sources, ClassDiscovery, ClassSource, StorageDiscovery};
use crate::errors::{ConfigError, HostError, RegistrationError, SubscriptionError};
use crate::execution::{ExecutionContext, Executor};
use crate::host::{
    CallbackFuture, DefaultsPosition, EventSubscriber, Next, Request, RequestCallback,
    ResultCallback, ServiceHost, ALL_EVENTS,
};
use crate::metadata::{
    metadata_storage, ActionMetadata, HandlerMetadata, MetadataBuilder, MetadataStorage,
    MiddlewareMetadata,
};
use crate::types::{ClassRef, HandlerKind, MiddlewareRuntime};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Classes to register on a service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterOptions {
    /// Handler classes, directly or by glob
    pub handler_classes: Vec<ClassSource>,
    /// Middleware classes; `None` registers every declared middleware
    pub middleware_classes: Option<Vec<ClassSource>>,
    /// User checker class, directly or by glob
    pub user_checker_class: Option<ClassSource>,
}

impl RegisterOptions {
    /// No classes selected
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler source
    pub fn handler(mut self, source: impl Into<ClassSource>) -> Self {
        self.handler_classes.push(source.into());
        self
    }

    /// Add a middleware source, switching from "all middlewares" to an explicit list
    pub fn middleware(mut self, source: impl Into<ClassSource>) -> Self {
        self.middleware_classes
            .get_or_insert_with(Vec::new)
            .push(source.into());
        self
    }

    /// Select the user checker
    pub fn user_checker(mut self, source: impl Into<ClassSource>) -> Self {
        self.user_checker_class = Some(source.into());
        self
    }

    /// Options selecting the classes a validated configuration names
    pub fn from_config(config: &RoutingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let globs = |patterns: &[String]| -> Vec<ClassSource> {
            patterns.iter().cloned().map(ClassSource::Glob).collect()
        };
        Ok(Self {
            handler_classes: globs(&config.handlers),
            middleware_classes: (!config.middlewares.is_empty()).then(|| globs(&config.middlewares)),
            user_checker_class: config.user_checker.clone().map(ClassSource::Glob),
        })
    }
}

/// Host hook a subscription went through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionPhase {
    /// `before`
    Before,
    /// `on`
    On,
    /// `after`
    After,
    /// Spliced in front of the host's default handlers
    BeforeDefaults,
    /// Spliced behind the host's default handlers
    AfterDefaults,
}

impl From<HandlerKind> for SubscriptionPhase {
    fn from(kind: HandlerKind) -> Self {
        match kind {
            HandlerKind::Before => Self::Before,
            HandlerKind::On => Self::On,
            HandlerKind::After => Self::After,
        }
    }
}

impl fmt::Display for SubscriptionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => f.write_str("before"),
            Self::On => f.write_str("on"),
            Self::After => f.write_str("after"),
            Self::BeforeDefaults => f.write_str("before-defaults"),
            Self::AfterDefaults => f.write_str("after-defaults"),
        }
    }
}

/// One successful subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Hook used
    pub phase: SubscriptionPhase,
    /// Event name or import name
    pub event: String,
    /// Entity selector
    pub entity: Option<String>,
    /// `Class::method` that was bound
    pub source: String,
}

/// Outcome of one registration call
#[derive(Debug, Default)]
pub struct RegistrationReport {
    /// Subscriptions made, in order
    pub subscriptions: Vec<Subscription>,
    /// Items that failed to register
    pub failures: Vec<SubscriptionError>,
    /// Middlewares skipped because the host lacks their hook point
    pub skipped: Vec<String>,
}

impl RegistrationReport {
    /// Whether every selected item was registered
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }

    fn record(&mut self, subscription: Subscription, result: Result<(), HostError>) {
        match result {
            Ok(()) => {
                debug!(
                    phase = %subscription.phase,
                    event = %subscription.event,
                    entity = ?subscription.entity,
                    origin = %subscription.source,
                    "Subscribed"
                );
                self.subscriptions.push(subscription);
            }
            Err(source) => self.fail(SubscriptionError::Host {
                source_name: subscription.source,
                source,
            }),
        }
    }

    fn fail(&mut self, failure: SubscriptionError) {
        error!(error = %failure, cause = ?std::error::Error::source(&failure), "Registration failed");
        self.failures.push(failure);
    }
}

/// Registration engine over one metadata storage
pub struct Registrar {
    storage: Arc<MetadataStorage>,
    container: Arc<dyn Container>,
    discovery: Arc<dyn ClassDiscovery>,
}

impl Registrar {
    /// Engine resolving instances through the process-wide containers and
    /// globs through the classes annotated in `storage`
    pub fn new(storage: Arc<MetadataStorage>) -> Self {
        let discovery = Arc::new(StorageDiscovery::new(Arc::clone(&storage)));
        Self {
            storage,
            container: Arc::new(GlobalContainer),
            discovery,
        }
    }

    /// Resolve instances through `container`
    pub fn with_container(mut self, container: Arc<dyn Container>) -> Self {
        self.container = container;
        self
    }

    /// Resolve globs through `discovery`
    pub fn with_discovery(mut self, discovery: Arc<dyn ClassDiscovery>) -> Self {
        self.discovery = discovery;
        self
    }

    /// Build and register the selected classes on `service`
    pub fn register(
        &self,
        service: Arc<dyn ServiceHost>,
        options: &RegisterOptions,
    ) -> Result<RegistrationReport, RegistrationError> {
        let Some(subscriber) = service.subscriptions() else {
            error!(
                service = service.name(),
                "Service does not expose before/on/after, nothing registered"
            );
            return Err(RegistrationError::MissingSubscriptionApi {
                service: service.name().to_string(),
            });
        };

        let handler_classes = resolve_sources(&options.handler_classes, self.discovery.as_ref());
        let middleware_classes = options
            .middleware_classes
            .as_ref()
            .map(|sources| resolve_sources(sources, self.discovery.as_ref()));
        let user_checker = options
            .user_checker_class
            .as_ref()
            .and_then(|source| self.resolve_user_checker(source));

        let builder = MetadataBuilder::new(&self.storage);
        let handlers =
            builder.build_handlers(Some(handler_classes.as_slice()), user_checker.as_ref());
        let middlewares =
            builder.build_middlewares(middleware_classes.as_deref(), user_checker.as_ref());

        let mut report = RegistrationReport::default();
        let (mut global, scoped): (Vec<_>, Vec<_>) =
            middlewares.into_iter().map(Arc::new).partition(|m| m.global);
        global.sort_by_key(|m| m.priority);

        for middleware in &global {
            self.register_global_middleware(&service, subscriber, middleware, &mut report);
        }
        for middleware in &scoped {
            self.register_scoped_middleware(&service, subscriber, middleware, &mut report);
        }
        for handler in &handlers {
            self.register_handler(&service, subscriber, handler, &mut report);
        }

        info!(
            service = service.name(),
            handlers = handlers.len(),
            middlewares = global.len() + scoped.len(),
            subscriptions = report.subscriptions.len(),
            failures = report.failures.len(),
            skipped = report.skipped.len(),
            "Registered routing metadata"
        );
        Ok(report)
    }

    fn resolve_user_checker(&self, source: &ClassSource) -> Option<ClassRef> {
        match source {
            ClassSource::Class(class) => Some(*class),
            ClassSource::Glob(pattern) => {
                let found: Vec<ClassRef> = self
                    .discovery
                    .discover(pattern)
                    .into_iter()
                    .filter(|class| self.storage.find_user_checker_for_target(Some(class)).is_some())
                    .collect();
                if found.len() > 1 {
                    warn!(
                        pattern = %pattern,
                        matched = found.len(),
                        "User checker glob is ambiguous, using the first match"
                    );
                }
                if found.is_empty() {
                    warn!(pattern = %pattern, "User checker glob matched no user checker class");
                }
                found.first().copied()
            }
        }
    }

    fn register_global_middleware(
        &self,
        service: &Arc<dyn ServiceHost>,
        subscriber: &dyn EventSubscriber,
        middleware: &Arc<MiddlewareMetadata>,
        report: &mut RegistrationReport,
    ) {
        let callback = self.middleware_callback(service, middleware);
        let source = middleware.source_name();
        let (phase, position) = match middleware.runtime {
            MiddlewareRuntime::Normal => {
                let result = subscriber.before(ALL_EVENTS, None, callback);
                report.record(
                    Subscription {
                        phase: SubscriptionPhase::Before,
                        event: ALL_EVENTS.to_string(),
                        entity: None,
                        source,
                    },
                    result,
                );
                return;
            }
            MiddlewareRuntime::BeforeDefaults => {
                (SubscriptionPhase::BeforeDefaults, DefaultsPosition::BeforeDefaults)
            }
            MiddlewareRuntime::AfterDefaults => {
                (SubscriptionPhase::AfterDefaults, DefaultsPosition::AfterDefaults)
            }
        };

        match service.default_handlers() {
            Some(chain) => {
                let result = chain.splice(position, callback);
                report.record(
                    Subscription {
                        phase,
                        event: ALL_EVENTS.to_string(),
                        entity: None,
                        source,
                    },
                    result,
                );
            }
            None => {
                warn!(
                    service = service.name(),
                    middleware = %source,
                    runtime = ?middleware.runtime,
                    "Service exposes no default handler list, skipping middleware"
                );
                report.skipped.push(source);
            }
        }
    }

    fn register_scoped_middleware(
        &self,
        service: &Arc<dyn ServiceHost>,
        subscriber: &dyn EventSubscriber,
        middleware: &Arc<MiddlewareMetadata>,
        report: &mut RegistrationReport,
    ) {
        if middleware.runtime != MiddlewareRuntime::Normal {
            warn!(
                middleware = %middleware.source_name(),
                runtime = ?middleware.runtime,
                "Runtime only applies to global middlewares, registering through before"
            );
        }
        let entities = middleware.entities.as_deref().unwrap_or_default();
        if entities.is_empty() {
            debug!(middleware = %middleware.source_name(), "Scoped middleware is used by no entity");
        }
        for entity in entities {
            let callback = self.middleware_callback(service, middleware);
            let result = subscriber.before(ALL_EVENTS, Some(entity), callback);
            report.record(
                Subscription {
                    phase: SubscriptionPhase::Before,
                    event: ALL_EVENTS.to_string(),
                    entity: Some(entity.clone()),
                    source: middleware.source_name(),
                },
                result,
            );
        }
    }

    fn register_handler(
        &self,
        service: &Arc<dyn ServiceHost>,
        subscriber: &dyn EventSubscriber,
        handler: &Arc<HandlerMetadata>,
        report: &mut RegistrationReport,
    ) {
        for action in &handler.actions {
            let event = if action.operation.is_import() {
                match &action.function_import_name {
                    Some(name) => name.clone(),
                    None => {
                        report.fail(SubscriptionError::MissingImportName {
                            class: action.target.name(),
                            method: action.method,
                        });
                        continue;
                    }
                }
            } else {
                action.operation.event().to_string()
            };
            let entity = action.entity.as_deref();

            let result = match action.handler_kind {
                HandlerKind::Before => {
                    subscriber.before(&event, entity, self.action_callback(service, action))
                }
                HandlerKind::On => subscriber.on(&event, entity, self.action_callback(service, action)),
                HandlerKind::After => {
                    subscriber.after(&event, entity, self.after_callback(service, action))
                }
            };
            report.record(
                Subscription {
                    phase: action.handler_kind.into(),
                    event,
                    entity: action.entity.clone(),
                    source: action.source_name(),
                },
                result,
            );
        }
    }

    fn middleware_callback(
        &self,
        service: &Arc<dyn ServiceHost>,
        middleware: &Arc<MiddlewareMetadata>,
    ) -> RequestCallback {
        let service = Arc::clone(service);
        let middleware = Arc::clone(middleware);
        let container = Arc::clone(&self.container);
        Arc::new(move |request: Arc<Request>, next: Option<Next>| -> CallbackFuture {
            let context = ExecutionContext::new(Arc::clone(&service), request).with_next(next);
            let middleware = Arc::clone(&middleware);
            let container = Arc::clone(&container);
            Box::pin(async move { middleware.exec(&context, container.as_ref()).await })
        })
    }

    fn action_callback(
        &self,
        service: &Arc<dyn ServiceHost>,
        action: &Arc<ActionMetadata>,
    ) -> RequestCallback {
        let service = Arc::clone(service);
        let action = Arc::clone(action);
        let container = Arc::clone(&self.container);
        Arc::new(move |request: Arc<Request>, next: Option<Next>| -> CallbackFuture {
            let context = ExecutionContext::new(Arc::clone(&service), request).with_next(next);
            let action = Arc::clone(&action);
            let container = Arc::clone(&container);
            Box::pin(async move { action.invoke(&context, container.as_ref()).await })
        })
    }

    fn after_callback(
        &self,
        service: &Arc<dyn ServiceHost>,
        action: &Arc<ActionMetadata>,
    ) -> ResultCallback {
        let service = Arc::clone(service);
        let action = Arc::clone(action);
        let container = Arc::clone(&self.container);
        Arc::new(move |entities: Value, request: Arc<Request>| -> CallbackFuture {
            let context = ExecutionContext::new(Arc::clone(&service), request).with_entities(entities);
            let action = Arc::clone(&action);
            let container = Arc::clone(&container);
            Box::pin(async move { action.invoke(&context, container.as_ref()).await })
        })
    }
}

/// Register on `service` using the process-wide storage and containers
pub fn register(
    service: Arc<dyn ServiceHost>,
    options: &RegisterOptions,
) -> Result<RegistrationReport, RegistrationError> {
    Registrar::new(metadata_storage()).register(service, options)
}

/// Registration closure for bootstrap code that receives the service later
pub fn combined_handler(
    options: RegisterOptions,
) -> impl Fn(Arc<dyn ServiceHost>) -> Result<RegistrationReport, RegistrationError> + Send + Sync + 'static
{
    move |service| register(service, &options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoutingConfig;

    #[test]
    fn test_options_builder() {
        let options = RegisterOptions::new()
            .handler("app/handlers/**")
            .middleware("app/middlewares/*")
            .user_checker("app/auth/Checker");
        assert_eq!(options.handler_classes.len(), 1);
        assert_eq!(options.middleware_classes.as_ref().map(Vec::len), Some(1));
        assert!(options.user_checker_class.is_some());
    }

    #[test]
    fn test_options_from_config() {
        let config = RoutingConfig {
            handlers: vec!["app/handlers/**".into()],
            middlewares: Vec::new(),
            user_checker: Some("app/auth/Checker".into()),
        };
        let options = RegisterOptions::from_config(&config).unwrap();
        assert_eq!(
            options.handler_classes,
            vec![ClassSource::Glob("app/handlers/**".into())]
        );
        assert!(options.middleware_classes.is_none());
        assert_eq!(
            options.user_checker_class,
            Some(ClassSource::Glob("app/auth/Checker".into()))
        );
    }

    #[test]
    fn test_options_from_invalid_config() {
        let config = RoutingConfig {
            handlers: vec!["[".into()],
            ..RoutingConfig::default()
        };
        assert!(RegisterOptions::from_config(&config).is_err());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(SubscriptionPhase::from(HandlerKind::After).to_string(), "after");
        assert_eq!(SubscriptionPhase::BeforeDefaults.to_string(), "before-defaults");
    }
}
