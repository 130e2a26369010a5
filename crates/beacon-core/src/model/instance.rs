use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Datacenter name for instances not running in a cloud provider.
pub const MY_OWN_DATACENTER: &str = "MyOwn";

/// Class name the registry expects for the default datacenter descriptor.
pub const DEFAULT_DATACENTER_CLASS: &str = "com.netflix.appinfo.InstanceInfo$DefaultDataCenterInfo";

/// Status advertised by an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Up,
    Down,
    Starting,
    OutOfService,
    #[default]
    #[serde(other)]
    Unknown,
}

impl InstanceStatus {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Starting => "STARTING",
            Self::OutOfService => "OUT_OF_SERVICE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Port record: number plus enabled flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Port {
    #[serde(rename = "$", default)]
    pub number: u16,
    #[serde(rename = "@enabled", default, deserialize_with = "bool_or_string")]
    pub enabled: bool,
}

impl Port {
    pub fn new(number: u16, enabled: bool) -> Self {
        Self { number, enabled }
    }
}

/// Datacenter descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataCenterInfo {
    #[serde(rename = "@class", default)]
    pub class_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

impl Default for DataCenterInfo {
    fn default() -> Self {
        Self {
            class_name: DEFAULT_DATACENTER_CLASS.to_string(),
            name: MY_OWN_DATACENTER.to_string(),
            metadata: None,
        }
    }
}

/// A registered service instance.
///
/// Built once per registration and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    #[serde(default)]
    pub instance_id: String,
    #[serde(default)]
    pub host_name: String,
    #[serde(rename = "app", default)]
    pub app_name: String,
    #[serde(default)]
    pub ip_addr: String,
    #[serde(rename = "vipAddress", default)]
    pub vip_address: String,
    #[serde(default)]
    pub status: InstanceStatus,
    #[serde(default)]
    pub port: Port,
    #[serde(default)]
    pub secure_port: Port,
    #[serde(default)]
    pub home_page_url: String,
    #[serde(default)]
    pub status_page_url: String,
    #[serde(default)]
    pub health_check_url: String,
    #[serde(default)]
    pub data_center_info: DataCenterInfo,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl Instance {
    /// Wrap the instance in the registration envelope.
    pub fn to_request(&self) -> RegistrationRequest<'_> {
        RegistrationRequest { instance: self }
    }

    pub(crate) fn write_summary(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        writeln!(f, "{indent}InstanceId   : {}", self.instance_id)?;
        writeln!(f, "{indent}Hostname     : {}", self.host_name)?;
        writeln!(f, "{indent}IpAddr       : {}", self.ip_addr)?;
        writeln!(f, "{indent}Port         : {}", self.port.number)?;
        writeln!(f, "{indent}SecurePort   : {}", self.secure_port.number)?;
        writeln!(f, "{indent}Status       : {}", self.status)
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_summary(f, "")
    }
}

/// Registration body: `{"instance": {...}}`.
#[derive(Debug, Serialize)]
pub struct RegistrationRequest<'a> {
    pub instance: &'a Instance,
}

/// Single-instance lookup response.
#[derive(Debug, Deserialize)]
pub struct InstanceResponse {
    pub instance: Instance,
}

fn bool_or_string<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s.eq_ignore_ascii_case("true"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&InstanceStatus::OutOfService).unwrap(),
            "\"OUT_OF_SERVICE\""
        );
        let parsed: InstanceStatus = serde_json::from_str("\"UP\"").unwrap();
        assert_eq!(parsed, InstanceStatus::Up);
        let unknown: InstanceStatus = serde_json::from_str("\"PAUSED\"").unwrap();
        assert_eq!(unknown, InstanceStatus::Unknown);
    }

    #[test]
    fn test_port_wire_shape() {
        let value = serde_json::to_value(Port::new(8080, true)).unwrap();
        assert_eq!(value["$"], 8080);
        assert_eq!(value["@enabled"], true);

        let parsed: Port = serde_json::from_str(r#"{"$": 443, "@enabled": "false"}"#).unwrap();
        assert_eq!(parsed, Port::new(443, false));
    }

    #[test]
    fn test_registration_envelope() {
        let instance = Instance {
            instance_id: "svc:1".to_string(),
            app_name: "svc".to_string(),
            status: InstanceStatus::Up,
            ..Default::default()
        };

        let body = serde_json::to_value(instance.to_request()).unwrap();
        assert_eq!(body["instance"]["instanceId"], "svc:1");
        assert_eq!(body["instance"]["app"], "svc");
        assert_eq!(body["instance"]["status"], "UP");
        assert_eq!(
            body["instance"]["dataCenterInfo"]["@class"],
            DEFAULT_DATACENTER_CLASS
        );
        assert!(body["instance"].get("metadata").is_none());
    }

    #[test]
    fn test_display_summary() {
        let instance = Instance {
            instance_id: "svc:1".to_string(),
            ip_addr: "10.0.0.5".to_string(),
            port: Port::new(8080, true),
            status: InstanceStatus::Up,
            ..Default::default()
        };
        let text = instance.to_string();
        assert!(text.contains("InstanceId   : svc:1"));
        assert!(text.contains("Port         : 8080"));
        assert!(text.contains("Status       : UP"));
    }
}
