//! Recording host service
//!
//! Implements the whole host surface and keeps every subscribed callback so
//! tests can assert on registration order and then drive the callbacks.

use cds_routing::{
    DefaultHandlerChain, DefaultsPosition, DispatchResult, EventSubscriber, HostError, Next,
    Request, RequestCallback, ResultCallback, ServiceHost, SubscriptionPhase,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// One subscription as seen by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Hook used
    pub phase: SubscriptionPhase,
    /// Event selector
    pub event: String,
    /// Entity selector
    pub entity: Option<String>,
}

impl RecordedCall {
    /// Shorthand constructor
    pub fn new(phase: SubscriptionPhase, event: &str, entity: Option<&str>) -> Self {
        Self {
            phase,
            event: event.to_string(),
            entity: entity.map(str::to_string),
        }
    }
}

#[derive(Clone)]
enum StoredCallback {
    Request(RequestCallback),
    Result(ResultCallback),
}

/// Host service stub recording every subscription
pub struct RecordingService {
    name: String,
    expose_subscriptions: bool,
    expose_defaults: bool,
    refused_events: Mutex<Vec<String>>,
    calls: Mutex<Vec<(RecordedCall, StoredCallback)>>,
}

impl RecordingService {
    /// Service with `before`/`on`/`after` but no default handler list
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self::build(name, true, false))
    }

    /// Service that also exposes its default handler list
    pub fn with_default_handlers(name: &str) -> Arc<Self> {
        Arc::new(Self::build(name, true, true))
    }

    /// Object lacking the subscription surface entirely
    pub fn without_subscriptions(name: &str) -> Arc<Self> {
        Arc::new(Self::build(name, false, false))
    }

    fn build(name: &str, expose_subscriptions: bool, expose_defaults: bool) -> Self {
        Self {
            name: name.to_string(),
            expose_subscriptions,
            expose_defaults,
            refused_events: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Refuse every later subscription for `event`
    pub fn refuse_event(&self, event: &str) {
        self.refused_events.lock().push(event.to_string());
    }

    /// Upcast for registration calls
    pub fn as_host(self: &Arc<Self>) -> Arc<dyn ServiceHost> {
        self.clone()
    }

    /// Subscriptions in the order they were made
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().iter().map(|(call, _)| call.clone()).collect()
    }

    /// Number of subscriptions matching `phase` and `event`
    pub fn count(&self, phase: SubscriptionPhase, event: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.phase == phase && call.event == event)
            .count()
    }

    /// First `before`/`on`/defaults callback matching the selectors
    pub fn request_callback(
        &self,
        phase: SubscriptionPhase,
        event: &str,
        entity: Option<&str>,
    ) -> Option<RequestCallback> {
        let wanted = RecordedCall::new(phase, event, entity);
        self.calls
            .lock()
            .iter()
            .find_map(|(call, callback)| match callback {
                StoredCallback::Request(callback) if *call == wanted => Some(callback.clone()),
                _ => None,
            })
    }

    /// First `after` callback matching the selectors
    pub fn result_callback(&self, event: &str, entity: Option<&str>) -> Option<ResultCallback> {
        let wanted = RecordedCall::new(SubscriptionPhase::After, event, entity);
        self.calls
            .lock()
            .iter()
            .find_map(|(call, callback)| match callback {
                StoredCallback::Result(callback) if *call == wanted => Some(callback.clone()),
                _ => None,
            })
    }

    /// Drive the matching `before`/`on`/defaults callback; panics when none was subscribed
    pub async fn dispatch(
        &self,
        phase: SubscriptionPhase,
        event: &str,
        entity: Option<&str>,
        request: Arc<Request>,
        next: Option<Next>,
    ) -> DispatchResult {
        let callback = self
            .request_callback(phase, event, entity)
            .unwrap_or_else(|| panic!("no {phase} subscription for {event} {entity:?}"));
        callback(request, next).await
    }

    /// Drive the matching `after` callback; panics when none was subscribed
    pub async fn dispatch_after(
        &self,
        event: &str,
        entity: Option<&str>,
        entities: Value,
        request: Arc<Request>,
    ) -> DispatchResult {
        let callback = self
            .result_callback(event, entity)
            .unwrap_or_else(|| panic!("no after subscription for {event} {entity:?}"));
        callback(entities, request).await
    }

    fn push(
        &self,
        phase: SubscriptionPhase,
        event: &str,
        entity: Option<&str>,
        callback: StoredCallback,
    ) -> Result<(), HostError> {
        if self.refused_events.lock().iter().any(|e| e == event) {
            return Err(HostError::new(format!("event {event} is not served")));
        }
        self.calls
            .lock()
            .push((RecordedCall::new(phase, event, entity), callback));
        Ok(())
    }
}

impl ServiceHost for RecordingService {
    fn name(&self) -> &str {
        &self.name
    }

    fn subscriptions(&self) -> Option<&dyn EventSubscriber> {
        self.expose_subscriptions.then_some(self as &dyn EventSubscriber)
    }

    fn default_handlers(&self) -> Option<&dyn DefaultHandlerChain> {
        self.expose_defaults
            .then_some(self as &dyn DefaultHandlerChain)
    }
}

impl EventSubscriber for RecordingService {
    fn before(
        &self,
        event: &str,
        entity: Option<&str>,
        callback: RequestCallback,
    ) -> Result<(), HostError> {
        self.push(
            SubscriptionPhase::Before,
            event,
            entity,
            StoredCallback::Request(callback),
        )
    }

    fn on(
        &self,
        event: &str,
        entity: Option<&str>,
        callback: RequestCallback,
    ) -> Result<(), HostError> {
        self.push(
            SubscriptionPhase::On,
            event,
            entity,
            StoredCallback::Request(callback),
        )
    }

    fn after(
        &self,
        event: &str,
        entity: Option<&str>,
        callback: ResultCallback,
    ) -> Result<(), HostError> {
        self.push(
            SubscriptionPhase::After,
            event,
            entity,
            StoredCallback::Result(callback),
        )
    }
}

impl DefaultHandlerChain for RecordingService {
    fn splice(
        &self,
        position: DefaultsPosition,
        callback: RequestCallback,
    ) -> Result<(), HostError> {
        let phase = match position {
            DefaultsPosition::BeforeDefaults => SubscriptionPhase::BeforeDefaults,
            DefaultsPosition::AfterDefaults => SubscriptionPhase::AfterDefaults,
        };
        self.push(
            phase,
            cds_routing::ALL_EVENTS,
            None,
            StoredCallback::Request(callback),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> RequestCallback {
        Arc::new(|_request: Arc<Request>, _next: Option<Next>| -> cds_routing::CallbackFuture {
            Box::pin(async { Ok(Some(Value::Bool(true))) })
        })
    }

    #[tokio::test]
    async fn test_records_and_dispatches() {
        let service = RecordingService::new("Catalog");
        let subscriber = service.subscriptions().unwrap();
        subscriber.on("READ", Some("Books"), noop()).unwrap();

        assert_eq!(
            service.calls(),
            vec![RecordedCall::new(SubscriptionPhase::On, "READ", Some("Books"))]
        );
        let result = service
            .dispatch(
                SubscriptionPhase::On,
                "READ",
                Some("Books"),
                Request::builder("READ").build(),
                None,
            )
            .await
            .unwrap();
        assert_eq!(result, Some(Value::Bool(true)));
    }

    #[test]
    fn test_surfaces() {
        assert!(RecordingService::without_subscriptions("x")
            .subscriptions()
            .is_none());
        assert!(RecordingService::new("x").default_handlers().is_none());
        assert!(RecordingService::with_default_handlers("x")
            .default_handlers()
            .is_some());
    }

    #[test]
    fn test_refused_event() {
        let service = RecordingService::new("Catalog");
        service.refuse_event("DELETE");
        let subscriber = service.subscriptions().unwrap();
        assert!(subscriber.before("DELETE", None, noop()).is_err());
        assert!(service.calls().is_empty());
    }
}
