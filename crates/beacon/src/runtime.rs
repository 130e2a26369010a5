//! Beacon - service registry client
//!
//! Host-side runtime that wires together:
//! - the discovery client (registration, heartbeat, deregistration)
//! - the HTTP transport
//! - process lifecycle and OS signal handling

use std::sync::Arc;

use beacon_core::config::BeaconConfig;
use beacon_core::error::{BeaconError, Result};
use beacon_core::transport::HttpTransport;
use beacon_runtime::http::ReqwestTransport;
use beacon_runtime::shutdown::{ShutdownConfig, ShutdownCoordinator, ShutdownReason};
use beacon_runtime::DiscoveryClient;

/// Prelude module for common imports.
pub mod prelude {
    pub use beacon_core::config::{
        BeaconConfig, Bootstrap, ClientConfig, ConfigClient, InstanceConfig,
    };
    pub use beacon_core::error::{BeaconError, Result};
    pub use beacon_core::model::{Application, Instance, InstanceStatus};
    pub use beacon_core::transport::HttpTransport;
    pub use beacon_runtime::shutdown::{ShutdownConfig, ShutdownCoordinator, ShutdownReason};
    pub use beacon_runtime::{DiscoveryClient, RegistrationTask, ReqwestTransport};

    pub use crate::{Beacon, BeaconBuilder};
}

/// A registered service process.
#[derive(Clone)]
pub struct Beacon {
    client: DiscoveryClient,
    lifecycle: Arc<ShutdownCoordinator>,
}

impl Beacon {
    /// Create a new builder.
    pub fn builder() -> BeaconBuilder {
        BeaconBuilder::new()
    }

    pub fn client(&self) -> &DiscoveryClient {
        &self.client
    }

    pub fn lifecycle(&self) -> &Arc<ShutdownCoordinator> {
        &self.lifecycle
    }

    /// Register and keep the lease alive until shutdown.
    ///
    /// Installs signal handlers, registers (waiting for the retry sequence
    /// when `blocking`), then waits for the lifecycle to stop.
    pub async fn run(&self, blocking: bool) -> Result<ShutdownReason> {
        self.lifecycle.listen_for_signals();
        self.client.register(blocking).await?;

        let reason = self.lifecycle.stopped().await;
        tracing::info!("Beacon stopped: {:?}", reason);
        Ok(reason)
    }

    /// Deregister and stop.
    pub async fn shutdown(&self) {
        self.lifecycle.shutdown().await;
    }
}

/// Builder for configuring the Beacon runtime.
pub struct BeaconBuilder {
    config: Option<BeaconConfig>,
    transport: Option<Arc<dyn HttpTransport>>,
    shutdown: ShutdownConfig,
}

impl BeaconBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: None,
            transport: None,
            shutdown: ShutdownConfig::default(),
        }
    }

    /// Set the configuration.
    pub fn config(mut self, config: BeaconConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a custom transport instead of reqwest.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set shutdown behavior.
    pub fn shutdown(mut self, shutdown: ShutdownConfig) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Build the runtime.
    pub fn build(self) -> Result<Beacon> {
        let config = self
            .config
            .ok_or_else(|| BeaconError::Config("Configuration is required".to_string()))?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };

        let lifecycle = ShutdownCoordinator::new(self.shutdown);
        let client = DiscoveryClient::new(config, transport)?.with_lifecycle(lifecycle.clone());

        Ok(Beacon { client, lifecycle })
    }
}

impl Default for BeaconBuilder {
    fn default() -> Self {
        Self::new()
    }
}
