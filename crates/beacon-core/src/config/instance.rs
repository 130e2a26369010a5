use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Static description of the instance being registered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceConfig {
    /// Application name, also used as the virtual address.
    #[serde(rename = "app", default)]
    pub app_name: String,

    /// Explicit advertised address. May reference environment variables.
    #[serde(default)]
    pub ip_address: String,

    /// Advertised hostname, used when `prefer_ip_address` is false.
    #[serde(default)]
    pub host_name: String,

    /// HTTP port.
    #[serde(default)]
    pub port: u16,

    /// HTTPS port.
    #[serde(default)]
    pub secure_port: u16,

    /// Advertise the IP address instead of the hostname.
    #[serde(default)]
    pub prefer_ip_address: bool,

    /// Home page path override.
    #[serde(default)]
    pub home_page_url_path: String,

    /// Status page path override.
    #[serde(default)]
    pub status_page_url_path: String,

    /// Health check path override.
    #[serde(default)]
    pub health_check_url_path: String,

    /// Free-form metadata published with the instance.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}
