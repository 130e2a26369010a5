use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::instance::Instance;

/// An application and its registered instances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "instance", default, deserialize_with = "one_or_many")]
    pub instances: Vec<Instance>,
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "Name      : {}", self.name)?;
        writeln!(f, "Instances : [")?;
        for instance in &self.instances {
            writeln!(f)?;
            instance.write_summary(f, "  ")?;
        }
        writeln!(f, "]")
    }
}

/// Every application known to the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applications {
    #[serde(rename = "application", default, deserialize_with = "one_or_many")]
    pub applications: Vec<Application>,
    #[serde(rename = "apps__hashcode", default)]
    pub apps_hashcode: String,
    #[serde(rename = "versions__delta", default, deserialize_with = "number_or_string")]
    pub versions_delta: i64,
}

/// `GET /apps/{app}` envelope.
#[derive(Debug, Deserialize)]
pub struct ApplicationResponse {
    pub application: Application,
}

/// `GET /apps` envelope.
#[derive(Debug, Deserialize)]
pub struct ApplicationsResponse {
    pub applications: Applications,
}

/// Registries render single-element lists as a bare object.
fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        Some(OneOrMany::Many(items)) => items,
        Some(OneOrMany::One(item)) => vec![item],
        None => Vec::new(),
    })
}

fn number_or_string<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Delta {
        Number(i64),
        Text(String),
    }

    Ok(match Delta::deserialize(deserializer)? {
        Delta::Number(n) => n,
        Delta::Text(s) => s.parse().unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_applications_response() {
        let json = r#"{
            "applications": {
                "versions__delta": "1",
                "apps__hashcode": "UP_2_",
                "application": [
                    {
                        "name": "ORDERS",
                        "instance": [
                            {"instanceId": "orders:a", "app": "ORDERS", "status": "UP",
                             "port": {"$": 8080, "@enabled": "true"}},
                            {"instanceId": "orders:b", "app": "ORDERS", "status": "DOWN"}
                        ]
                    }
                ]
            }
        }"#;

        let response: ApplicationsResponse = serde_json::from_str(json).unwrap();
        let apps = response.applications;
        assert_eq!(apps.versions_delta, 1);
        assert_eq!(apps.apps_hashcode, "UP_2_");
        assert_eq!(apps.applications.len(), 1);
        assert_eq!(apps.applications[0].instances.len(), 2);
        assert!(apps.applications[0].instances[0].port.enabled);
    }

    #[test]
    fn test_single_instance_object() {
        let json = r#"{
            "application": {
                "name": "BILLING",
                "instance": {"instanceId": "billing:1", "app": "BILLING"}
            }
        }"#;

        let response: ApplicationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.application.name, "BILLING");
        assert_eq!(response.application.instances.len(), 1);
        assert_eq!(response.application.instances[0].instance_id, "billing:1");
    }

    #[test]
    fn test_application_display() {
        let app = Application {
            name: "ORDERS".to_string(),
            instances: vec![Instance {
                instance_id: "orders:a".to_string(),
                ..Default::default()
            }],
        };
        let text = app.to_string();
        assert!(text.contains("Name      : ORDERS"));
        assert!(text.contains("  InstanceId   : orders:a"));
    }
}
