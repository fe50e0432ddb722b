//! Class identity for annotated handler, middleware, and user-checker types.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Type-erased instance of an annotated class as handed out by a container
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Constructor used by the default container
pub type ClassFactory = fn() -> Instance;

fn construct<T: Default + Send + Sync + 'static>() -> Instance {
    Arc::new(T::default())
}

/// Reference to an annotated type
///
/// Two references are equal when they name the same Rust type; the type path
/// and factory are carried along for logging, discovery, and construction.
#[derive(Clone, Copy)]
pub struct ClassRef {
    id: TypeId,
    name: &'static str,
    factory: Option<ClassFactory>,
}

impl ClassRef {
    /// Reference a type the default container can build through `Default`
    pub fn of<T: Default + Send + Sync + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            factory: Some(construct::<T>),
        }
    }

    /// Reference a type that only a caller-supplied container can build
    pub fn external<T: Any + Send + Sync>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            factory: None,
        }
    }

    /// Full type path, e.g. `my_app::handlers::GreeterHandler`
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment of the type name
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }

    /// Type path with `::` replaced by `/`, used for glob discovery
    pub fn module_path(&self) -> String {
        self.name.replace("::", "/")
    }

    /// The underlying type id
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Build a fresh instance when the type is default-constructible
    pub fn construct(&self) -> Option<Instance> {
        self.factory.map(|factory| factory())
    }

    /// Whether the default container can build this class
    pub fn is_constructible(&self) -> bool {
        self.factory.is_some()
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ClassRef {}

impl Hash for ClassRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassRef").field(&self.name).finish()
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
