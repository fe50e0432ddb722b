//! Routing configuration
//!
//! Selects handler, middleware, and user checker classes by type path glob.
//! Loaded from TOML, overridden from `CDS_ROUTING_*` environment variables,
//! then validated:
//!
//! ```toml
//! handlers = ["my_app/handlers/**"]
//! middlewares = ["my_app/middlewares/*"]
//! user_checker = "my_app/auth/UserChecker"
//! ```

use crate::discovery::compile_glob;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "CDS_ROUTING_";

/// Class selection for a registration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoutingConfig {
    /// Globs selecting handler classes
    pub handlers: Vec<String>,
    /// Globs selecting middleware classes; empty means every middleware
    pub middlewares: Vec<String>,
    /// Glob selecting the user checker class
    pub user_checker: Option<String>,
}

impl RoutingConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse { source })
    }

    /// Load from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply `CDS_ROUTING_*` overrides from the process environment
    pub fn merge_with_env(&mut self) -> Result<(), ConfigError> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply `CDS_ROUTING_*` overrides from `vars`; other variables are ignored
    ///
    /// `HANDLERS` and `MIDDLEWARES` take comma-separated globs and replace the
    /// configured lists. `USER_CHECKER` replaces the checker glob.
    pub fn merge_with_vars<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(setting) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            self.set_from_string(&setting.to_ascii_lowercase(), &value)
                .map_err(|message| ConfigError::InvalidEnv {
                    key: key.clone(),
                    message,
                })?;
        }
        Ok(())
    }

    /// Overlay every setting `other` defines
    pub fn merge_with(&mut self, other: &Self) {
        if !other.handlers.is_empty() {
            self.handlers.clone_from(&other.handlers);
        }
        if !other.middlewares.is_empty() {
            self.middlewares.clone_from(&other.middlewares);
        }
        if other.user_checker.is_some() {
            self.user_checker.clone_from(&other.user_checker);
        }
    }

    /// Check that every glob parses
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.handlers
            .iter()
            .chain(&self.middlewares)
            .chain(&self.user_checker)
            .try_for_each(|pattern| compile_glob(pattern).map(|_| ()))
    }

    fn set_from_string(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "handlers" => self.handlers = split_list(value),
            "middlewares" => self.middlewares = split_list(value),
            "user_checker" => {
                let value = value.trim();
                if value.is_empty() {
                    return Err("must not be empty".into());
                }
                self.user_checker = Some(value.to_string());
            }
            other => return Err(format!("unknown setting '{other}'")),
        }
        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "handlers = [\"app/handlers/**\"]\nuser_checker = \"app/auth/Checker\""
        )
        .unwrap();

        let config = RoutingConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.handlers, vec!["app/handlers/**"]);
        assert!(config.middlewares.is_empty());
        assert_eq!(config.user_checker.as_deref(), Some("app/auth/Checker"));
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = RoutingConfig::load_from_file(&dir.path().join("routing.toml"));
        assert_matches!(result, Err(ConfigError::Io { .. }));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert_matches!(
            RoutingConfig::from_toml_str("handler = []"),
            Err(ConfigError::Parse { .. })
        );
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RoutingConfig::from_toml_str("handlers = [\"a/**\"]").unwrap();
        config
            .merge_with_vars(vars(&[
                ("CDS_ROUTING_MIDDLEWARES", "m/one, m/two,"),
                ("CDS_ROUTING_USER_CHECKER", "auth/Checker"),
                ("PATH", "/usr/bin"),
            ]))
            .unwrap();
        assert_eq!(config.handlers, vec!["a/**"]);
        assert_eq!(config.middlewares, vec!["m/one", "m/two"]);
        assert_eq!(config.user_checker.as_deref(), Some("auth/Checker"));
    }

    #[test]
    fn test_invalid_env() {
        let mut config = RoutingConfig::default();
        assert_matches!(
            config.merge_with_vars(vars(&[("CDS_ROUTING_USER_CHECKER", " ")])),
            Err(ConfigError::InvalidEnv { .. })
        );
        assert_matches!(
            config.merge_with_vars(vars(&[("CDS_ROUTING_PORT", "8080")])),
            Err(ConfigError::InvalidEnv { .. })
        );
    }

    #[test]
    fn test_merge_with() {
        let mut base = RoutingConfig {
            handlers: vec!["a/**".into()],
            middlewares: vec!["m/**".into()],
            user_checker: None,
        };
        base.merge_with(&RoutingConfig {
            handlers: vec!["b/**".into()],
            ..RoutingConfig::default()
        });
        assert_eq!(base.handlers, vec!["b/**"]);
        assert_eq!(base.middlewares, vec!["m/**"]);
    }

    #[test]
    fn test_validate_rejects_bad_glob() {
        let config = RoutingConfig {
            handlers: vec!["app/[".into()],
            ..RoutingConfig::default()
        };
        assert_matches!(config.validate(), Err(ConfigError::InvalidGlob { .. }));
    }
}
