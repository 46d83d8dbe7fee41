//! Configuration management infrastructure.
//!
//! Gateway settings live in a TOML file; command line flags override
//! individual values at startup.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::infra::error::{GatewayError, GatewayResult};

/// Gateway settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfiguration {
    /// Address the HTTP server binds to
    pub bind_address: String,

    /// URL of the external signing agent, handed to the browser unchanged
    pub nexu_url: String,

    /// Where users can download the signing agent
    pub download_nexu_url: String,

    /// Idle lifetime of a signing session
    pub session_ttl_seconds: u64,

    /// Answer content timestamp requests with the local mock source
    pub use_mock_tsp: bool,

    /// Upper bound for a multipart configuration upload
    pub max_upload_bytes: u64,
}

impl Default for GatewayConfiguration {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            nexu_url: "http://localhost:9795".to_string(),
            download_nexu_url: "http://nowina.lu/nexu/".to_string(),
            session_ttl_seconds: 3600,
            use_mock_tsp: true,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl GatewayConfiguration {
    /// Check value ranges.
    pub fn validate(&self) -> GatewayResult<()> {
        self.bind_socket_addr()?;

        if self.nexu_url.trim().is_empty() {
            return Err(GatewayError::ConfigurationError(
                "Signing agent URL must not be empty".to_string(),
            ));
        }

        if self.session_ttl_seconds == 0 {
            return Err(GatewayError::ConfigurationError(
                "Session TTL must be greater than 0".to_string(),
            ));
        }

        if self.max_upload_bytes == 0 {
            return Err(GatewayError::ConfigurationError(
                "Maximum upload size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn bind_socket_addr(&self) -> GatewayResult<SocketAddr> {
        self.bind_address.parse().map_err(|e| {
            GatewayError::ConfigurationError(format!(
                "Invalid bind address '{}': {e}",
                self.bind_address
            ))
        })
    }
}

/// Configuration manager for handling config files
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with default path
    pub fn new() -> GatewayResult<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Create a configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> GatewayResult<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir.join("signing-gateway").join("config.toml"))
        } else {
            Ok(PathBuf::from("signing-gateway-config.toml"))
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load_or_create_default(&self) -> GatewayResult<GatewayConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::info!(
                "Configuration file not found, creating default: {}",
                self.config_path.display()
            );
            let default_config = GatewayConfiguration::default();
            self.save(&default_config)?;
            Ok(default_config)
        }
    }

    /// Load configuration from file
    pub fn load(&self) -> GatewayResult<GatewayConfiguration> {
        log::info!("Loading configuration from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            GatewayError::ConfigurationError(format!(
                "Failed to read config file {}: {e}",
                self.config_path.display()
            ))
        })?;

        let config: GatewayConfiguration = toml::from_str(&content).map_err(|e| {
            GatewayError::ConfigurationError(format!("Failed to parse config file: {e}"))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &GatewayConfiguration) -> GatewayResult<()> {
        config.validate()?;

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                GatewayError::ConfigurationError(format!(
                    "Failed to create config directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| {
            GatewayError::ConfigurationError(format!("Failed to serialize config: {e}"))
        })?;

        fs::write(&self.config_path, content).map_err(|e| {
            GatewayError::ConfigurationError(format!(
                "Failed to write config file {}: {e}",
                self.config_path.display()
            ))
        })?;

        log::info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Update a single value by key and persist the result
    pub fn update_value(&self, key: &str, value: &str) -> GatewayResult<()> {
        let mut config = self.load()?;

        match key {
            "bind_address" => config.bind_address = value.to_string(),
            "nexu_url" => config.nexu_url = value.to_string(),
            "download_nexu_url" => config.download_nexu_url = value.to_string(),
            "session_ttl_seconds" => {
                config.session_ttl_seconds = value.parse().map_err(|_| {
                    GatewayError::ConfigurationError(format!("Invalid number of seconds: {value}"))
                })?;
            }
            "use_mock_tsp" => {
                config.use_mock_tsp = value.parse().map_err(|_| {
                    GatewayError::ConfigurationError(format!("Invalid boolean value: {value}"))
                })?;
            }
            "max_upload_bytes" => {
                config.max_upload_bytes = value.parse().map_err(|_| {
                    GatewayError::ConfigurationError(format!("Invalid byte count: {value}"))
                })?;
            }
            _ => {
                return Err(GatewayError::ConfigurationError(format!(
                    "Unknown configuration key: {key}"
                )));
            }
        }

        self.save(&config)
    }

    /// Get the configuration file path
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Export configuration as a portable format
    pub fn export_config(&self, format: ExportFormat) -> GatewayResult<String> {
        let config = self.load()?;

        match format {
            ExportFormat::Toml => toml::to_string_pretty(&config)
                .map_err(|e| GatewayError::ConfigurationError(format!("TOML export failed: {e}"))),
            ExportFormat::Json => serde_json::to_string_pretty(&config)
                .map_err(|e| GatewayError::ConfigurationError(format!("JSON export failed: {e}"))),
        }
    }
}

/// Configuration export formats
#[derive(Debug, Clone, Copy)]
pub enum ExportFormat {
    Toml,
    Json,
}
