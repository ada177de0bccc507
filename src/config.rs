//! Adapter configuration
//!
//! Loaded once at startup and passed explicitly to the adapter. A YAML file
//! looks like:
//!
//! ```yaml
//! adapter: sqlite
//! route_basepath: /cms/routes
//! route_shape: auto_route
//! ```

use crate::document::{NodePath, AUTO_ROUTE_SHAPE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default base path all automatic routes live under
pub const DEFAULT_ROUTE_BASEPATH: &str = "/cms/routes";

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Startup-time settings for the route adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdapterConfig {
    /// Repository backend to use; `None` lets the host pick
    pub adapter: Option<String>,
    /// Path all automatic routes are created under; must already exist
    pub route_basepath: String,
    /// Shape new route nodes are created with
    pub route_shape: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            adapter: None,
            route_basepath: DEFAULT_ROUTE_BASEPATH.to_string(),
            route_shape: AUTO_ROUTE_SHAPE.to_string(),
        }
    }
}

impl AdapterConfig {
    pub fn with_route_basepath(mut self, path: impl Into<String>) -> Self {
        self.route_basepath = path.into();
        self
    }

    pub fn with_route_shape(mut self, shape: impl Into<String>) -> Self {
        self.route_shape = shape.into();
        self
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: AdapterConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.route_basepath.trim().is_empty() {
            return Err(ConfigError::Invalid("route_basepath cannot be empty".to_string()));
        }
        if self.route_shape.trim().is_empty() {
            return Err(ConfigError::Invalid("route_shape cannot be empty".to_string()));
        }
        Ok(())
    }

    /// The normalized base path
    pub fn base_path(&self) -> NodePath {
        NodePath::new(&self.route_basepath)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdapterConfig::default();
        assert_eq!(config.route_basepath, "/cms/routes");
        assert_eq!(config.route_shape, "auto_route");
        assert!(config.adapter.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = AdapterConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, AdapterConfig::default());
    }

    #[test]
    fn test_yaml_overrides() {
        let yaml = "adapter: sqlite\nroute_basepath: /site/routes/\nroute_shape: custom_route\n";
        let config = AdapterConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.adapter.as_deref(), Some("sqlite"));
        assert_eq!(config.route_shape, "custom_route");
        assert_eq!(config.base_path().as_str(), "/site/routes");
    }

    #[test]
    fn test_empty_basepath_rejected() {
        let err = AdapterConfig::from_yaml_str("route_basepath: ''").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = AdapterConfig::from_yaml_str("route_base_path: /x").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autoroute.yaml");
        std::fs::write(&path, "route_basepath: /routes\n").unwrap();

        let config = AdapterConfig::load(&path).unwrap();
        assert_eq!(config.base_path().as_str(), "/routes");

        let missing = AdapterConfig::load(dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io(_)));
    }
}
