//! Per-invocation value bundle shared by actions, middlewares, and user checkers.

use crate::host::{Next, Request, ServiceHost};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// References available to parameter resolution for one invocation
#[derive(Clone)]
pub struct ExecutionContext {
    /// Host service the callback was registered on
    pub service: Arc<dyn ServiceHost>,
    /// Incoming request
    pub request: Arc<Request>,
    /// Continuation; absent in the after phase
    pub next: Option<Next>,
    /// Result entities; present in the after phase only
    pub entities: Option<Value>,
}

impl ExecutionContext {
    /// Context for a before/on invocation
    pub fn new(service: Arc<dyn ServiceHost>, request: Arc<Request>) -> Self {
        Self {
            service,
            request,
            next: None,
            entities: None,
        }
    }

    /// Attach the continuation
    pub fn with_next(mut self, next: Option<Next>) -> Self {
        self.next = next;
        self
    }

    /// Attach after-phase entities
    pub fn with_entities(mut self, entities: Value) -> Self {
        self.entities = Some(entities);
        self
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("service", &self.service.name())
            .field("request", &self.request)
            .field("next", &self.next.is_some())
            .field("entities", &self.entities)
            .finish()
    }
}
