//! Configuration for registry builds
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (registry.toml)
//! - Environment variables (APIREG_*)
//!
//! ## Example config file (registry.toml):
//! ```toml
//! [keys]
//! collision_policy = "disambiguate"
//!
//! [extract]
//! media_type = "application/json"
//! preferred_statuses = ["200", "201", "202", "204"]
//! ```
//!
//! The config is threaded explicitly into `OperationRegistry::build_with`;
//! nothing reads ambient global state.

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::endpoint::ExtractOptions;
use crate::opkey::CollisionPolicy;

/// Main configuration for a registry build
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Operation key settings
    #[serde(default)]
    pub keys: KeysConfig,

    /// Endpoint extraction settings
    #[serde(default)]
    pub extract: ExtractConfig,
}

/// Operation key settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeysConfig {
    /// What to do when two operations synthesize the same key
    #[serde(default)]
    pub collision_policy: CollisionPolicy,
}

/// Endpoint extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Media type whose schema is read from request/response bodies
    #[serde(default = "default_media_type")]
    pub media_type: String,

    /// Successful status codes tried in order before the first declared
    /// response is used
    #[serde(default = "default_preferred_statuses")]
    pub preferred_statuses: Vec<String>,
}

fn default_media_type() -> String {
    "application/json".to_string()
}

fn default_preferred_statuses() -> Vec<String> {
    vec![
        "200".to_string(),
        "201".to_string(),
        "202".to_string(),
        "204".to_string(),
    ]
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            media_type: default_media_type(),
            preferred_statuses: default_preferred_statuses(),
        }
    }
}

impl RegistryConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["registry.toml", ".registry.toml", "config/registry.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "api-registry") {
            let xdg_config = config_dir.config_dir().join("registry.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Environment variables (APIREG_*)
        builder = builder.add_source(
            Environment::with_prefix("APIREG")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Extraction options for the endpoint extractor
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            media_type: self.extract.media_type.clone(),
            preferred_statuses: self.extract.preferred_statuses.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.keys.collision_policy, CollisionPolicy::Disambiguate);
        assert_eq!(config.extract.media_type, "application/json");
        assert_eq!(config.extract.preferred_statuses.len(), 4);
    }

    #[test]
    fn test_serialize_config() {
        let config = RegistryConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[keys]"));
        assert!(toml_str.contains("[extract]"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.toml");

        let mut config = RegistryConfig::default();
        config.keys.collision_policy = CollisionPolicy::Fail;
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = RegistryConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(loaded.keys.collision_policy, CollisionPolicy::Fail);
    }
}
