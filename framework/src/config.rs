//! Chain configuration
//!
//! A [`ChainConfig`] is the configuration snapshot a chain closes over at
//! build time: the detected environment plus free-form string properties
//! for anything the surrounding application wants to thread through to its
//! handlers without a dedicated registry binding.

use std::collections::HashMap;

/// Environment type enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Local,
    Development,
    Staging,
    Production,
    Testing,
    Custom(String),
}

impl Environment {
    /// Detect environment from APP_ENV or default to Local
    pub fn detect() -> Self {
        match std::env::var("APP_ENV").ok().as_deref() {
            Some("production") => Self::Production,
            Some("staging") => Self::Staging,
            Some("development") => Self::Development,
            Some("testing") => Self::Testing,
            Some("local") | None => Self::Local,
            Some(other) => Self::Custom(other.to_string()),
        }
    }

    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if this is a development environment (local or development)
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Local | Self::Development)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Development => write!(f, "development"),
            Self::Staging => write!(f, "staging"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
            Self::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Configuration snapshot captured by a chain at build time
///
/// Immutable once built; chains clone it freely and share it with every
/// dispatch they run.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    environment: Environment,
    other: HashMap<String, String>,
}

impl ChainConfig {
    /// A local-environment config with no extra properties
    pub fn new() -> Self {
        Self {
            environment: Environment::Local,
            other: HashMap::new(),
        }
    }

    /// Build config from the process environment
    ///
    /// Loads `.env` first so local development picks up dotfiles, then
    /// detects the environment from `APP_ENV`.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self {
            environment: Environment::detect(),
            other: HashMap::new(),
        }
    }

    /// Create a builder for customizing config
    pub fn builder() -> ChainConfigBuilder {
        ChainConfigBuilder::default()
    }

    /// The environment this config was built for
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Look up a free-form property, falling back to a default
    ///
    /// # Example
    /// ```rust,ignore
    /// let templates = config.get_other("templates.path", "templates");
    /// ```
    pub fn get_other(&self, name: &str, default: &str) -> String {
        self.other
            .get(name)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// Check if this config is for a development environment
    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`ChainConfig`]
#[derive(Default)]
pub struct ChainConfigBuilder {
    environment: Option<Environment>,
    other: HashMap<String, String>,
}

impl ChainConfigBuilder {
    /// Set the environment
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Set a free-form property
    pub fn other(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.other.insert(name.into(), value.into());
        self
    }

    /// Build the ChainConfig
    pub fn build(self) -> ChainConfig {
        ChainConfig {
            environment: self.environment.unwrap_or(Environment::Local),
            other: self.other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_get_other_returns_default_when_unset() {
        let config = ChainConfig::new();
        assert_eq!(config.get_other("templates.path", "templates"), "templates");
    }

    #[test]
    fn test_get_other_returns_configured_value() {
        let config = ChainConfig::builder()
            .other("templates.path", "views")
            .build();
        assert_eq!(config.get_other("templates.path", "templates"), "views");
    }

    #[test]
    fn test_builder_sets_environment() {
        let config = ChainConfig::builder()
            .environment(Environment::Production)
            .build();
        assert!(config.environment().is_production());
        assert!(!config.is_development());
    }

    #[test]
    fn test_default_environment_is_local() {
        let config = ChainConfig::new();
        assert_eq!(*config.environment(), Environment::Local);
        assert!(config.is_development());
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::Staging.to_string(), "staging");
        assert_eq!(Environment::Custom("qa".into()).to_string(), "qa");
    }
}
