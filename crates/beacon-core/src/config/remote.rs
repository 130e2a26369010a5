//! Client for a Spring Cloud Config style configuration server.
//!
//! Documents are addressed as `{uri}/{label}/{name}-{profile}.{ext}`. The
//! profile and server URI can be overridden at runtime through the
//! `CONFIG_PROFILE` and `CONFIG_SERVER_URI` environment variables.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::env::expand_env;
use crate::error::{BeaconError, Result};
use crate::transport::{HttpRequest, HttpTransport, APPLICATION_JSON};

/// Overrides [`Bootstrap::profile`] when set.
pub const ENV_CONFIG_PROFILE: &str = "CONFIG_PROFILE";
/// Overrides [`Bootstrap::uri`] when set.
pub const ENV_CONFIG_SERVER_URI: &str = "CONFIG_SERVER_URI";

pub const DEFAULT_URI: &str = "http://localhost:8888";
pub const DEFAULT_PROFILE: &str = "default";
pub const DEFAULT_LABEL: &str = "master";

/// Looks up an environment variable. Empty values count as unset.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Representation served by the config server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteFormat {
    Json,
    Yaml,
    Properties,
}

impl RemoteFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yml",
            Self::Properties => "properties",
        }
    }

    fn accept(&self) -> &'static str {
        match self {
            Self::Json => APPLICATION_JSON,
            Self::Yaml | Self::Properties => "text/plain",
        }
    }
}

/// Settings needed to locate a remote configuration document.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bootstrap {
    /// Config server base URI.
    pub uri: String,

    /// Base path for an optional refresh endpoint.
    pub context: String,

    /// Profile to fetch, comma-separated for several.
    pub profile: String,

    /// Application name. Required.
    pub name: String,

    /// SCM label (branch) to read from.
    pub label: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bootstrap")
            .field("uri", &self.uri)
            .field("context", &self.context)
            .field("profile", &self.profile)
            .field("name", &self.name)
            .field("label", &self.label)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Bootstrap {
    /// Defaulted settings for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
        .with_defaults()
    }

    /// Load bootstrap settings from a TOML, JSON or YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bootstrap: Self = super::read_document(path.as_ref())?;
        let bootstrap = bootstrap.with_defaults();
        bootstrap.validate()?;
        Ok(bootstrap)
    }

    /// Fill empty uri, profile and label with their defaults.
    pub fn with_defaults(mut self) -> Self {
        if self.uri.is_empty() {
            self.uri = DEFAULT_URI.to_string();
        }
        if self.profile.is_empty() {
            self.profile = DEFAULT_PROFILE.to_string();
        }
        if self.label.is_empty() {
            self.label = DEFAULT_LABEL.to_string();
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(BeaconError::Config("bootstrap name must be set".into()));
        }
        Ok(())
    }
}

fn process_env() -> EnvLookup {
    Arc::new(|name: &str| std::env::var(name).ok().filter(|v| !v.is_empty()))
}

/// Fetches configuration documents from the config server.
#[derive(Clone)]
pub struct ConfigClient {
    bootstrap: Bootstrap,
    transport: Arc<dyn HttpTransport>,
    env: EnvLookup,
}

impl ConfigClient {
    /// Create a client. Fails when the bootstrap has no name.
    pub fn new(bootstrap: Bootstrap, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        let bootstrap = bootstrap.with_defaults();
        bootstrap.validate()?;
        Ok(Self {
            bootstrap,
            transport,
            env: process_env(),
        })
    }

    /// Resolve `CONFIG_PROFILE` and `CONFIG_SERVER_URI` through `lookup`.
    pub fn with_env(mut self, lookup: EnvLookup) -> Self {
        self.env = lookup;
        self
    }

    pub fn bootstrap(&self) -> &Bootstrap {
        &self.bootstrap
    }

    /// Profile in effect, after the environment override.
    pub fn profile(&self) -> String {
        (self.env)(ENV_CONFIG_PROFILE).unwrap_or_else(|| self.bootstrap.profile.clone())
    }

    /// Server URI in effect, after the environment override.
    pub fn server_uri(&self) -> String {
        (self.env)(ENV_CONFIG_SERVER_URI).unwrap_or_else(|| self.bootstrap.uri.clone())
    }

    /// `{uri}/{label}/{name}-{profile}.{ext}`
    pub fn request_url(&self, format: RemoteFormat) -> String {
        format!(
            "{}/{}/{}-{}.{}",
            self.server_uri().trim_end_matches('/'),
            self.bootstrap.label,
            self.bootstrap.name,
            self.profile(),
            format.extension()
        )
    }

    /// Fetch the JSON document and decode it without substitution.
    pub async fn fetch<T: DeserializeOwned>(&self) -> Result<T> {
        let body = self.fetch_raw(RemoteFormat::Json).await?;
        serde_json::from_str(&body).map_err(|e| BeaconError::Deserialization(e.to_string()))
    }

    /// Fetch the YAML document, expand environment references, then decode it.
    pub async fn fetch_with_substitution<T: DeserializeOwned>(&self) -> Result<T> {
        let content = self.fetch_as_yaml().await?;
        serde_yaml::from_str(&content).map_err(|e| BeaconError::Deserialization(e.to_string()))
    }

    /// Fetch the properties document as flattened `key -> value` pairs.
    ///
    /// Lines split at the first `:` or `=`. Blank lines and `#`/`!`
    /// comments are skipped. Values are not substituted.
    pub async fn fetch_as_map(&self) -> Result<BTreeMap<String, String>> {
        let body = self.fetch_raw(RemoteFormat::Properties).await?;
        Ok(parse_properties(&body))
    }

    pub async fn fetch_as_json(&self) -> Result<String> {
        self.fetch_substituted(RemoteFormat::Json).await
    }

    pub async fn fetch_as_yaml(&self) -> Result<String> {
        self.fetch_substituted(RemoteFormat::Yaml).await
    }

    pub async fn fetch_as_properties(&self) -> Result<String> {
        self.fetch_substituted(RemoteFormat::Properties).await
    }

    async fn fetch_substituted(&self, format: RemoteFormat) -> Result<String> {
        let body = self.fetch_raw(format).await?;
        Ok(expand_env(&body))
    }

    async fn fetch_raw(&self, format: RemoteFormat) -> Result<String> {
        let url = self.request_url(format);
        tracing::debug!("Fetching remote configuration from {}", url);

        let mut request = HttpRequest::get(url.clone()).with_accept(format.accept());
        if let Some(username) = &self.bootstrap.username {
            request = request.with_basic_auth(username.clone(), self.bootstrap.password.clone());
        }

        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            return Err(BeaconError::Protocol {
                status: response.status,
                context: format!("fetching configuration {}", url),
                body: response.body,
            });
        }
        Ok(response.body)
    }
}

fn parse_properties(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let split = line.find([':', '='])?;
            let key = line[..split].trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), line[split + 1..].trim().to_string()))
        })
        .collect()
}
