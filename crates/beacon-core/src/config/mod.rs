mod client;
mod env;
mod instance;
mod logging;
mod remote;

pub use client::ClientConfig;
pub use env::{expand_env, substitute_env_vars};
pub use instance::InstanceConfig;
pub use logging::LoggingConfig;
pub use remote::{
    Bootstrap, ConfigClient, EnvLookup, RemoteFormat, ENV_CONFIG_PROFILE, ENV_CONFIG_SERVER_URI,
};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{BeaconError, Result};

/// Root configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeaconConfig {
    /// Instance being registered.
    #[serde(default)]
    pub instance: InstanceConfig,

    /// Registry client settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Supported configuration document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            "yml" | "yaml" => Ok(Self::Yaml),
            other => Err(BeaconError::Config(format!(
                "Unsupported config file extension '{}' for {}",
                other,
                path.display()
            ))),
        }
    }
}

/// Substitute `${VAR}` references, then deserialize `content`.
pub fn parse_document<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> Result<T> {
    let content = substitute_env_vars(content);

    let parsed = match format {
        ConfigFormat::Toml => toml::from_str(&content).map_err(|e| e.to_string()),
        ConfigFormat::Json => serde_json::from_str(&content).map_err(|e| e.to_string()),
        ConfigFormat::Yaml => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
    };

    parsed.map_err(|e| BeaconError::Config(format!("Failed to parse config: {}", e)))
}

/// Read a config file and parse it by extension.
pub(crate) fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = ConfigFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| {
        BeaconError::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    tracing::debug!("Loading configuration from {}", path.display());
    parse_document(&content, format)
}

impl BeaconConfig {
    /// Load configuration from a file, choosing the parser by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        read_document(path.as_ref())
    }

    /// Parse configuration from a string in the given format.
    pub fn parse_str(content: &str, format: ConfigFormat) -> Result<Self> {
        parse_document(content, format)
    }

    /// Build a defaulted configuration from the essentials.
    pub fn from_args<S: Into<String>>(
        app_name: &str,
        host: &str,
        port: u16,
        service_urls: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            instance: InstanceConfig {
                app_name: app_name.to_string(),
                ip_address: host.to_string(),
                port,
                ..Default::default()
            },
            client: ClientConfig {
                service_urls: service_urls.into_iter().map(Into::into).collect(),
                ..Default::default()
            },
            logging: LoggingConfig::default(),
        }
    }

    /// Check the invariants the discovery client relies on.
    pub fn validate(&self) -> Result<()> {
        if self.instance.app_name.trim().is_empty() {
            return Err(BeaconError::Config("instance.app must be set".into()));
        }
        if self.client.service_urls.is_empty() {
            return Err(BeaconError::Config(
                "client.serviceUrls must contain at least one registry URL".into(),
            ));
        }
        if self.client.poll_interval_seconds == 0 {
            return Err(BeaconError::Config(
                "client.pollIntervalSeconds must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
