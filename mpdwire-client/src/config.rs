//! Client configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via MPDWIRE_CONFIG)
//! 3. Environment variables (`MPD_HOST`, `MPD_PORT`, `MPD_TIMEOUT`)

use crate::connection::{Address, ConnectionConfig};
use mpdwire_protocol::DEFAULT_PORT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Host name, IP address, or absolute path of a local socket.
    pub host: String,
    /// TCP port; ignored for local sockets.
    pub port: u16,
    /// Password sent after connecting.
    pub password: Option<String>,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Per-command timeout in seconds.
    pub request_timeout_secs: u64,
    /// Chunk size for album art and embedded pictures.
    pub binary_limit: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            password: None,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            binary_limit: None,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("MPDWIRE_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: ClientConfig = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Applies overrides from a variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("MPD_HOST") {
            self.set_host(&host);
        }

        if let Some(port) = lookup("MPD_PORT") {
            if let Ok(port) = port.parse() {
                self.port = port;
            }
        }

        if let Some(timeout) = lookup("MPD_TIMEOUT") {
            if let Ok(secs) = timeout.parse() {
                self.request_timeout_secs = secs;
            }
        }
    }

    /// Sets the host from `MPD_HOST` syntax: `host`, `password@host`, or
    /// a socket path. A leading `@` is kept and rejected by [`validate`].
    ///
    /// [`validate`]: ClientConfig::validate
    pub fn set_host(&mut self, value: &str) {
        let value = value.trim();
        if value.starts_with('@') {
            self.host = value.to_string();
            return;
        }
        match value.rsplit_once('@') {
            Some((password, host)) if !host.is_empty() => {
                self.password = Some(password.to_string());
                self.host = host.to_string();
            }
            _ => self.host = value.to_string(),
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::ValidationError("host must not be empty".into()));
        }
        if self.host.starts_with('@') {
            return Err(ConfigError::ValidationError(format!(
                "abstract socket addresses are not supported: {}",
                self.host
            )));
        }
        if !self.is_local() && self.port == 0 {
            return Err(ConfigError::ValidationError("port must not be 0".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Whether the host names a local socket.
    pub fn is_local(&self) -> bool {
        self.host.starts_with('/')
    }

    pub fn address(&self) -> Address {
        if self.is_local() {
            Address::unix(&self.host)
        } else {
            Address::tcp(&self.host, self.port)
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Builds the connection settings.
    pub fn to_connection_config(&self) -> Result<ConnectionConfig, ConfigError> {
        self.validate()?;
        let mut config = ConnectionConfig::new(self.address())
            .with_connect_timeout(self.connect_timeout())
            .with_request_timeout(self.request_timeout());
        if let Some(password) = &self.password {
            config = config.with_password(password.as_str());
        }
        if let Some(limit) = self.binary_limit {
            config = config.with_binary_limit(limit);
        }
        Ok(config)
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
