use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Registry client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Registry server base URLs.
    #[serde(default)]
    pub service_urls: Vec<String>,

    /// Heartbeat interval in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,

    /// Whether the heartbeat loop runs after registration.
    #[serde(rename = "registerWithEureka", default = "default_true")]
    pub register_with_registry: bool,

    /// Whether client-side health checking is enabled.
    #[serde(default = "default_true")]
    pub health_check_enabled: bool,

    /// Registration attempts before giving up.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Delay between registration attempts in seconds.
    #[serde(default = "default_retry_interval")]
    pub retry_interval_seconds: u64,
}

impl ClientConfig {
    /// Heartbeat interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    /// Registration backoff interval as a duration.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_seconds)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_urls: Vec::new(),
            poll_interval_seconds: default_poll_interval(),
            register_with_registry: true,
            health_check_enabled: true,
            retries: default_retries(),
            retry_interval_seconds: default_retry_interval(),
        }
    }
}

fn default_poll_interval() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_retries() -> u32 {
    3
}

fn default_retry_interval() -> u64 {
    2
}
