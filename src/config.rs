//! Configuration for the affect inference service.
//!
//! Values are layered: defaults, then the JSON config file, then
//! environment variables. The binary applies CLI flags last.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the bind host.
pub const ENV_HOST: &str = "AFFECT_HOST";
/// Environment variable overriding the port.
pub const ENV_PORT: &str = "AFFECT_PORT";
/// Environment variable overriding the arousal model path.
pub const ENV_AROUSAL_MODEL: &str = "AFFECT_AROUSAL_MODEL";
/// Environment variable overriding the valence model path.
pub const ENV_VALENCE_MODEL: &str = "AFFECT_VALENCE_MODEL";

/// Main configuration for the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Interface to bind to
    pub host: String,

    /// Port to listen on (0 for random)
    pub port: u16,

    /// Persisted arousal model
    pub arousal_model_path: PathBuf,

    /// Persisted valence model
    pub valence_model_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let model_dir = Self::default_model_dir();

        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            arousal_model_path: model_dir.join("model_arousal.json"),
            valence_model_path: model_dir.join("model_valence.json"),
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_file()?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from the default location, ignoring the environment.
    pub fn load_file() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::Parse(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply overrides from a variable lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: ENV_PORT,
                value: port.clone(),
            })?;
        }
        if let Some(path) = lookup(ENV_AROUSAL_MODEL) {
            self.arousal_model_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_VALENCE_MODEL) {
            self.valence_model_path = PathBuf::from(path);
        }
        Ok(())
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("affect-inference")
            .join("config.json")
    }

    /// Directory holding the default model files.
    pub fn default_model_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("affect-inference")
            .join("models")
    }

    /// Address string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialize error: {0}")]
    Serialize(String),
    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert!(config.arousal_model_path.ends_with("model_arousal.json"));
        assert!(config.valence_model_path.ends_with("model_valence.json"));
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(lookup(&[
                (ENV_PORT, "9001"),
                (ENV_AROUSAL_MODEL, "/models/a.json"),
                (ENV_VALENCE_MODEL, "/models/v.json"),
            ]))
            .unwrap();

        assert_eq!(config.port, 9001);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.arousal_model_path, PathBuf::from("/models/a.json"));
        assert_eq!(config.valence_model_path, PathBuf::from("/models/v.json"));
    }

    #[test]
    fn test_invalid_port_env() {
        let mut config = Config::default();
        let err = config.apply_env(lookup(&[(ENV_PORT, "eighty")])).unwrap_err();
        assert!(err.to_string().contains(ENV_PORT));
        assert_eq!(config.port, 8000);
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir()
            .join("affect-inference-config-test")
            .join("config.json");
        let _ = std::fs::remove_file(&path);

        assert_eq!(Config::load_from(&path).unwrap(), Config::default());

        let mut config = Config::default();
        config.port = 9100;
        config.arousal_model_path = PathBuf::from("/models/a.json");
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"port": 8080}"#).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
    }
}
