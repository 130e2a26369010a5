use thiserror::Error;

/// Core error type for Beacon operations.
#[derive(Error, Debug)]
pub enum BeaconError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status} from {context}, body: \"{body}\"")]
    Protocol {
        status: u16,
        context: String,
        body: String,
    },

    #[error("Instance {instance_id} of {app} was evicted by the registry")]
    Evicted { app: String, instance_id: String },

    #[error("No active registration for {0}")]
    NotRegistered(String),

    #[error("Task cancelled: {0}")]
    Cancelled(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BeaconError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Protocol { status, .. } => Some(*status),
            Self::Evicted { .. } => Some(404),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for BeaconError {
    fn from(e: serde_json::Error) -> Self {
        BeaconError::Serialization(e.to_string())
    }
}

/// Result type alias using BeaconError.
pub type Result<T> = std::result::Result<T, BeaconError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_message() {
        let err = BeaconError::Protocol {
            status: 500,
            context: "registering instance=svc:1 app=svc".to_string(),
            body: "boom".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("boom"));
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_evicted_status() {
        let err = BeaconError::Evicted {
            app: "svc".to_string(),
            instance_id: "svc:1".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert!(BeaconError::Transport("refused".into()).status().is_none());
    }

    #[test]
    fn test_not_registered_message() {
        let err = BeaconError::NotRegistered("orders".into());
        assert_eq!(err.to_string(), "No active registration for orders");
        assert!(err.status().is_none());
    }
}
