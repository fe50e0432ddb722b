//! Host service surface
//!
//! The routing layer never implements a service framework itself. It talks to
//! whatever hosts the service through the traits in this module: a
//! [`ServiceHost`] hands out an [`EventSubscriber`] (`before`/`on`/`after`) and,
//! on hosts that expose it, a [`DefaultHandlerChain`]. Requests travel as
//! [`Request`] values and rejections are recorded on them.

use crate::errors::{DispatchResult, HostError};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Event selector matching every event of a service
pub const ALL_EVENTS: &str = "*";

/// Future returned by every registered callback
pub type CallbackFuture = BoxFuture<'static, DispatchResult>;

/// Callback for `before`/`on` subscriptions: `(request, next)`
pub type RequestCallback = Arc<dyn Fn(Arc<Request>, Option<Next>) -> CallbackFuture + Send + Sync>;

/// Callback for `after` subscriptions: `(entities, request)`
pub type ResultCallback = Arc<dyn Fn(Value, Arc<Request>) -> CallbackFuture + Send + Sync>;

/// The service object handlers are registered on
pub trait ServiceHost: Send + Sync {
    /// Service name, used in logs
    fn name(&self) -> &str;

    /// The `before`/`on`/`after` surface, if this host has one
    fn subscriptions(&self) -> Option<&dyn EventSubscriber>;

    /// The host's internal default handler list, if this host version exposes it
    fn default_handlers(&self) -> Option<&dyn DefaultHandlerChain> {
        None
    }
}

/// Event subscription API of a host service
pub trait EventSubscriber: Send + Sync {
    /// Subscribe a callback that runs before the event's main handler
    fn before(
        &self,
        event: &str,
        entity: Option<&str>,
        callback: RequestCallback,
    ) -> Result<(), HostError>;

    /// Subscribe the event's main handler
    fn on(&self, event: &str, entity: Option<&str>, callback: RequestCallback)
        -> Result<(), HostError>;

    /// Subscribe a callback that receives the event's result
    fn after(
        &self,
        event: &str,
        entity: Option<&str>,
        callback: ResultCallback,
    ) -> Result<(), HostError>;
}

/// Position in the host's built-in default handler list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefaultsPosition {
    /// In front of the built-in handlers
    BeforeDefaults,
    /// Behind the built-in handlers
    AfterDefaults,
}

/// Host-internal list of built-in default handlers
pub trait DefaultHandlerChain: Send + Sync {
    /// Splice a callback into the list at the given position
    fn splice(&self, position: DefaultsPosition, callback: RequestCallback)
        -> Result<(), HostError>;
}

/// Continuation into the next handler of the host's chain
#[derive(Clone)]
pub struct Next {
    inner: Arc<dyn Fn() -> CallbackFuture + Send + Sync>,
}

impl Next {
    /// Wrap a continuation
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> CallbackFuture + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Continuation that completes without a result
    pub fn noop() -> Self {
        Self::new(|| Box::pin(async { Ok(None) }))
    }

    /// Run the rest of the chain
    pub async fn run(&self) -> DispatchResult {
        (self.inner)().await
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Next")
    }
}

/// A rejection signaled on a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// HTTP-style status code
    pub code: u16,
    /// Message sent to the client
    pub message: String,
}

/// Authenticated user attached to a request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    /// User id
    pub id: String,
    /// Preferred locale, e.g. `de` or `en_US`
    pub locale: Option<String>,
    /// Additional attributes
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

/// Raw transport message underneath a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportMessage {
    headers: BTreeMap<String, Vec<String>>,
}

impl TransportMessage {
    /// Empty message
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header value; names are stored lowercase
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    /// First value of a header, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// Request as handed to subscribed callbacks
pub struct Request {
    event: String,
    entity: Option<String>,
    data: Value,
    user: Option<UserInfo>,
    transport: Option<TransportMessage>,
    context: Option<Arc<Request>>,
    rejections: Mutex<Vec<Rejection>>,
}

impl Request {
    /// Start building a request for an event
    pub fn builder(event: impl Into<String>) -> RequestBuilder {
        RequestBuilder {
            event: event.into(),
            entity: None,
            data: Value::Null,
            user: None,
            transport: None,
            context: None,
        }
    }

    /// Event name, e.g. `READ` or a function import name
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Target entity, if any
    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    /// Request payload
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Authenticated user, if any
    pub fn user(&self) -> Option<&UserInfo> {
        self.user.as_ref()
    }

    /// Locale of the authenticated user
    pub fn locale(&self) -> Option<&str> {
        self.user.as_ref().and_then(|user| user.locale.as_deref())
    }

    /// Raw transport message attached directly to this request
    pub fn transport(&self) -> Option<&TransportMessage> {
        self.transport.as_ref()
    }

    /// Enclosing request, e.g. the batch request around a change set
    pub fn context(&self) -> Option<&Arc<Request>> {
        self.context.as_ref()
    }

    /// Signal a rejection to the host
    pub fn reject(&self, code: u16, message: impl Into<String>) {
        self.rejections.lock().push(Rejection {
            code,
            message: message.into(),
        });
    }

    /// Rejections signaled so far
    pub fn rejections(&self) -> Vec<Rejection> {
        self.rejections.lock().clone()
    }

    /// Whether any rejection was signaled
    pub fn is_rejected(&self) -> bool {
        !self.rejections.lock().is_empty()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("event", &self.event)
            .field("entity", &self.entity)
            .field("data", &self.data)
            .field("user", &self.user)
            .field("rejections", &self.rejections.lock().len())
            .finish()
    }
}

/// Builder for [`Request`]
#[derive(Debug)]
pub struct RequestBuilder {
    event: String,
    entity: Option<String>,
    data: Value,
    user: Option<UserInfo>,
    transport: Option<TransportMessage>,
    context: Option<Arc<Request>>,
}

impl RequestBuilder {
    /// Set the target entity
    pub fn entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Set the payload
    pub fn data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Attach an authenticated user
    pub fn user(mut self, user: UserInfo) -> Self {
        self.user = Some(user);
        self
    }

    /// Attach a raw transport message
    pub fn transport(mut self, transport: TransportMessage) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Add a header to the attached transport message, creating it if needed
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        let transport = self.transport.take().unwrap_or_default();
        self.transport = Some(transport.with_header(name, value));
        self
    }

    /// Nest the request inside an enclosing request
    pub fn context(mut self, context: Arc<Request>) -> Self {
        self.context = Some(context);
        self
    }

    /// Finish the request
    pub fn build(self) -> Arc<Request> {
        Arc::new(Request {
            event: self.event,
            entity: self.entity,
            data: self.data,
            user: self.user,
            transport: self.transport,
            context: self.context,
            rejections: Mutex::new(Vec::new()),
        })
    }
}
