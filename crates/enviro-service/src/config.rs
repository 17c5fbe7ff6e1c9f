//! Server configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use enviro_core::LinkCredentials;
use enviro_store::DEFAULT_MAX_HISTORY;

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Store settings.
    pub store: StoreConfig,
    /// Cloud device-link settings.
    pub link: LinkConfig,
    /// Synthetic-data simulator settings.
    pub simulator: SimulatorConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// Incomplete link credentials are *not* a validation error — they mean
    /// the device link is skipped, not that the service cannot start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.store.validate());
        errors.extend(self.simulator.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind: String,
    /// Broadcast channel buffer for observer fan-out.
    pub broadcast_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            broadcast_buffer: 100,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: "bind address cannot be empty".to_string(),
            });
        } else {
            let parts: Vec<&str> = self.bind.rsplitn(2, ':').collect();
            if parts.len() != 2 {
                errors.push(ValidationError {
                    field: "server.bind".to_string(),
                    message: format!(
                        "invalid bind address '{}': expected format 'host:port'",
                        self.bind
                    ),
                });
            } else if parts[0].parse::<u16>().is_err() {
                errors.push(ValidationError {
                    field: "server.bind".to_string(),
                    message: format!("invalid port '{}': must be a number 1-65535", parts[0]),
                });
            }
        }

        if self.broadcast_buffer == 0 {
            errors.push(ValidationError {
                field: "server.broadcast_buffer".to_string(),
                message: "broadcast buffer must be at least 1".to_string(),
            });
        }

        errors
    }
}

/// Store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// History buffer capacity.
    pub max_history_size: usize,
    /// Seconds between periodic re-stamps of the current reading.
    pub sample_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_history_size: DEFAULT_MAX_HISTORY,
            sample_interval_secs: 10,
        }
    }
}

impl StoreConfig {
    /// Validate store configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.max_history_size == 0 {
            errors.push(ValidationError {
                field: "store.max_history_size".to_string(),
                message: "history capacity must be at least 1".to_string(),
            });
        }
        if self.sample_interval_secs == 0 {
            errors.push(ValidationError {
                field: "store.sample_interval_secs".to_string(),
                message: "sample interval must be at least 1 second".to_string(),
            });
        }

        errors
    }
}

/// Cloud device-link configuration.
///
/// The credential triple defaults to placeholders; until all three carry
/// real values the link reports `ConfigIncomplete` and auto-connect is
/// skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Product key assigned by the cloud platform.
    pub product_key: String,
    /// Device name registered under the product.
    pub device_name: String,
    /// Per-device secret.
    pub device_secret: String,
    /// Cloud region identifier.
    pub region: String,
    /// MQTT keep-alive interval in seconds.
    pub keep_alive_secs: u64,
    /// Reconnect attempts before the link moves to `Failed`.
    pub max_reconnect_attempts: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            product_key: "YOUR_PRODUCT_KEY".to_string(),
            device_name: "YOUR_DEVICE_NAME".to_string(),
            device_secret: "YOUR_DEVICE_SECRET".to_string(),
            region: "cn-shanghai".to_string(),
            keep_alive_secs: 60,
            max_reconnect_attempts: 10,
        }
    }
}

impl LinkConfig {
    /// The credential triple for the state machine.
    pub fn credentials(&self) -> LinkCredentials {
        LinkCredentials::new(&self.product_key, &self.device_name, &self.device_secret)
    }

    /// Broker hostname for the configured product and region.
    pub fn broker_host(&self) -> String {
        format!("{}.iot-as-mqtt.{}.aliyuncs.com", self.product_key, self.region)
    }
}

/// Synthetic-data simulator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Start the simulator at boot.
    pub enabled: bool,
    /// Seconds between generated readings.
    pub interval_secs: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 5,
        }
    }
}

impl SimulatorConfig {
    /// Validate simulator configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.interval_secs == 0 {
            errors.push(ValidationError {
                field: "simulator.interval_secs".to_string(),
                message: "simulator interval must be at least 1 second".to_string(),
            });
        }
        errors
    }
}

/// A single invalid configuration field.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to write config to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Invalid configuration: {}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Default configuration path following platform conventions.
///
/// - Linux: `~/.config/enviro/server.toml`
/// - macOS: `~/Library/Application Support/enviro/server.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("enviro")
        .join("server.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().expect("default config should be valid");
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.store.max_history_size, DEFAULT_MAX_HISTORY);
        assert_eq!(config.link.max_reconnect_attempts, 10);
    }

    #[test]
    fn test_default_credentials_are_placeholders() {
        let config = Config::default();
        assert!(!config.link.credentials().is_complete());
    }

    #[test]
    fn test_real_credentials_are_complete() {
        let link = LinkConfig {
            product_key: "k1zfks5ATvF".to_string(),
            device_name: "rk3588-hub".to_string(),
            device_secret: "f7a394d926c9".to_string(),
            ..Default::default()
        };
        assert!(link.credentials().is_complete());
        assert_eq!(
            link.broker_host(),
            "k1zfks5ATvF.iot-as-mqtt.cn-shanghai.aliyuncs.com"
        );
    }

    #[test]
    fn test_invalid_bind_address() {
        let config = Config {
            server: ServerConfig {
                bind: "no-port".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.bind"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = Config {
            store: StoreConfig {
                max_history_size: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("store.max_history_size"));
    }

    #[test]
    fn test_multiple_errors_reported_together() {
        let config = Config {
            server: ServerConfig {
                bind: String::new(),
                broadcast_buffer: 0,
            },
            simulator: SimulatorConfig {
                enabled: true,
                interval_secs: 0,
            },
            ..Default::default()
        };
        let ConfigError::Validation(errors) = config.validate().unwrap_err() else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");

        let mut config = Config::default();
        config.server.bind = "0.0.0.0:9090".to_string();
        config.link.product_key = "k1zfks5ATvF".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.server.bind, "0.0.0.0:9090");
        assert_eq!(loaded.link.product_key, "k1zfks5ATvF");
        assert_eq!(loaded.simulator.interval_secs, 5);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            bind = "0.0.0.0:3000"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:3000");
        assert_eq!(config.server.broadcast_buffer, 100);
        assert_eq!(config.store.sample_interval_secs, 10);
    }
}
