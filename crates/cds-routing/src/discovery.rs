//! Class discovery by type path glob
//!
//! Registration accepts classes directly or as globs over their type paths.
//! Type paths are matched with `::` replaced by `/`, so
//! `my_app/handlers/**` selects every annotated class under
//! `my_app::handlers`.

use crate::errors::ConfigError;
use crate::metadata::MetadataStorage;
use crate::types::ClassRef;
use glob::{MatchOptions, Pattern};
use std::sync::Arc;
use tracing::{debug, warn};

/// A class given directly or through a type path glob
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassSource {
    /// A single class
    Class(ClassRef),
    /// Every annotated class whose type path matches
    Glob(String),
}

impl From<ClassRef> for ClassSource {
    fn from(class: ClassRef) -> Self {
        Self::Class(class)
    }
}

impl From<&str> for ClassSource {
    fn from(pattern: &str) -> Self {
        Self::Glob(pattern.to_string())
    }
}

impl From<String> for ClassSource {
    fn from(pattern: String) -> Self {
        Self::Glob(pattern)
    }
}

/// Resolves a glob into classes
pub trait ClassDiscovery: Send + Sync {
    /// Classes matching `pattern`; an invalid pattern yields no classes
    fn discover(&self, pattern: &str) -> Vec<ClassRef>;
}

/// Discovery over the classes recorded in a [`MetadataStorage`]
pub struct StorageDiscovery {
    storage: Arc<MetadataStorage>,
}

impl StorageDiscovery {
    /// Discover classes annotated in `storage`
    pub fn new(storage: Arc<MetadataStorage>) -> Self {
        Self { storage }
    }
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

impl ClassDiscovery for StorageDiscovery {
    fn discover(&self, pattern: &str) -> Vec<ClassRef> {
        let compiled = match compile_glob(pattern) {
            Ok(compiled) => compiled,
            Err(error) => {
                warn!(pattern, error = %error, "Ignoring invalid class glob");
                return Vec::new();
            }
        };

        let classes: Vec<ClassRef> = self
            .storage
            .annotated_classes()
            .into_iter()
            .filter(|class| compiled.matches_with(&class.module_path(), MATCH_OPTIONS))
            .collect();
        debug!(pattern, matched = classes.len(), "Discovered classes");
        classes
    }
}

/// Parse a class glob
pub fn compile_glob(pattern: &str) -> Result<Pattern, ConfigError> {
    Pattern::new(pattern).map_err(|source| ConfigError::InvalidGlob {
        pattern: pattern.to_string(),
        source,
    })
}

/// Resolve sources into classes, dropping duplicates and keeping first-seen order
pub fn resolve_sources(sources: &[ClassSource], discovery: &dyn ClassDiscovery) -> Vec<ClassRef> {
    let mut classes: Vec<ClassRef> = Vec::new();
    for source in sources {
        let found = match source {
            ClassSource::Class(class) => vec![*class],
            ClassSource::Glob(pattern) => discovery.discover(pattern),
        };
        for class in found {
            if !classes.contains(&class) {
                classes.push(class);
            }
        }
    }
    classes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::HandlerRecord;

    mod handlers {
        #[derive(Default)]
        pub struct Greeter;

        pub mod nested {
            #[derive(Default)]
            pub struct Farewell;
        }
    }

    #[derive(Default)]
    struct Outside;

    fn discovery() -> StorageDiscovery {
        let storage = Arc::new(MetadataStorage::new());
        for target in [
            ClassRef::of::<handlers::Greeter>(),
            ClassRef::of::<handlers::nested::Farewell>(),
            ClassRef::of::<Outside>(),
        ] {
            storage.add_handler(HandlerRecord {
                target,
                entity: None,
            });
        }
        StorageDiscovery::new(storage)
    }

    #[test]
    fn test_recursive_glob() {
        let found = discovery().discover("**/discovery/tests/handlers/**");
        assert_eq!(found.len(), 2);
        assert!(!found.contains(&ClassRef::of::<Outside>()));
    }

    #[test]
    fn test_single_level_glob() {
        let found = discovery().discover("**/tests/handlers/*");
        assert_eq!(found, vec![ClassRef::of::<handlers::Greeter>()]);
    }

    #[test]
    fn test_invalid_glob_yields_nothing() {
        assert!(discovery().discover("[").is_empty());
        assert!(compile_glob("[").is_err());
    }

    #[test]
    fn test_resolve_sources_dedupes() {
        let greeter = ClassRef::of::<handlers::Greeter>();
        let sources = vec![
            ClassSource::Class(greeter),
            ClassSource::from("**/tests/handlers/**"),
        ];
        let classes = resolve_sources(&sources, &discovery());
        assert_eq!(classes[0], greeter);
        assert_eq!(classes.len(), 2);
    }
}
