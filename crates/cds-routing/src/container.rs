//! Instance resolution for annotated classes
//!
//! A [`Container`] turns a [`ClassRef`] into the instance that handles calls.
//! [`DefaultContainer`] builds one instance per class through `Default` and
//! keeps it for its own lifetime. Applications that construct their classes
//! themselves install a container with [`use_container`]; it is consulted
//! first and the default container fills in every class it does not know.

use crate::types::{ClassRef, Instance};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Resolves a class reference to an instance
pub trait Container: Send + Sync {
    /// Instance for `class`, or `None` if this container cannot provide one
    fn resolve(&self, class: &ClassRef) -> Option<Instance>;
}

/// Memoizing container building classes through their `Default` impl
#[derive(Default)]
pub struct DefaultContainer {
    instances: RwLock<HashMap<ClassRef, Instance>>,
}

impl DefaultContainer {
    /// Empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every memoized instance
    pub fn clear(&self) {
        self.instances.write().clear();
    }
}

impl Container for DefaultContainer {
    fn resolve(&self, class: &ClassRef) -> Option<Instance> {
        if let Some(instance) = self.instances.read().get(class) {
            return Some(Arc::clone(instance));
        }

        let mut instances = self.instances.write();
        if let Some(instance) = instances.get(class) {
            return Some(Arc::clone(instance));
        }
        let instance = class.construct()?;
        debug!(class = class.name(), "Constructed instance");
        instances.insert(*class, Arc::clone(&instance));
        Some(instance)
    }
}

/// Container holding instances supplied up front
#[derive(Default)]
pub struct InstanceContainer {
    instances: HashMap<ClassRef, Instance>,
}

impl InstanceContainer {
    /// Empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance, keyed by its type
    pub fn with_instance<T: Send + Sync + 'static>(mut self, instance: Arc<T>) -> Self {
        self.instances.insert(ClassRef::external::<T>(), instance);
        self
    }
}

impl Container for InstanceContainer {
    fn resolve(&self, class: &ClassRef) -> Option<Instance> {
        self.instances.get(class).cloned()
    }
}

/// Caller-supplied container backed by a [`DefaultContainer`]
pub struct LayeredContainer {
    user: Option<Arc<dyn Container>>,
    fallback: DefaultContainer,
}

impl LayeredContainer {
    /// Layer `user` over a fresh default container
    pub fn new(user: Option<Arc<dyn Container>>) -> Self {
        Self {
            user,
            fallback: DefaultContainer::new(),
        }
    }
}

impl Container for LayeredContainer {
    fn resolve(&self, class: &ClassRef) -> Option<Instance> {
        self.user
            .as_ref()
            .and_then(|user| user.resolve(class))
            .or_else(|| self.fallback.resolve(class))
    }
}

static USER_CONTAINER: Lazy<RwLock<Option<Arc<dyn Container>>>> = Lazy::new(|| RwLock::new(None));
static DEFAULT_CONTAINER: Lazy<DefaultContainer> = Lazy::new(DefaultContainer::new);

/// Install the process-wide user container
pub fn use_container(container: Arc<dyn Container>) {
    *USER_CONTAINER.write() = Some(container);
}

/// Remove the process-wide user container and drop memoized default instances
pub fn reset_container() {
    *USER_CONTAINER.write() = None;
    DEFAULT_CONTAINER.clear();
}

/// Resolve through the process-wide user container, then the default container
pub fn get_from_container(class: &ClassRef) -> Option<Instance> {
    let user = USER_CONTAINER.read().clone();
    user.and_then(|container| container.resolve(class))
        .or_else(|| DEFAULT_CONTAINER.resolve(class))
}

/// [`Container`] view of the process-wide containers
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalContainer;

impl Container for GlobalContainer {
    fn resolve(&self, class: &ClassRef) -> Option<Instance> {
        get_from_container(class)
    }
}
