mod query;
mod remote;
mod run;

pub use query::{AppsCommand, InstanceCommand};
pub use remote::{ConfigCommand, FetchFormat};
pub use run::RunCommand;

use std::path::Path;

use anyhow::Result;
use beacon_core::config::BeaconConfig;
use clap::{Parser, Subcommand};

/// Beacon - register a service with a Eureka-style registry
#[derive(Parser)]
#[command(name = "beacon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Register and keep the instance alive until interrupted.
    Run(RunCommand),

    /// List registered applications.
    Apps(AppsCommand),

    /// Show one registered instance.
    Instance(InstanceCommand),

    /// Fetch configuration from a config server.
    Config(ConfigCommand),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run(cmd) => cmd.execute().await,
            Commands::Apps(cmd) => cmd.execute().await,
            Commands::Instance(cmd) => cmd.execute().await,
            Commands::Config(cmd) => cmd.execute().await,
        }
    }
}

/// Load and validate a configuration file.
pub(crate) fn load_config(path: &str) -> Result<BeaconConfig> {
    if !Path::new(path).exists() {
        anyhow::bail!("Configuration file not found: {}", path);
    }

    let config = BeaconConfig::from_file(path)?;
    config.validate()?;
    Ok(config)
}

/// Fetch and validate the configuration served for a bootstrap file.
pub(crate) async fn load_remote_config(bootstrap: &str) -> Result<BeaconConfig> {
    if !Path::new(bootstrap).exists() {
        anyhow::bail!("Bootstrap file not found: {}", bootstrap);
    }

    let client = remote::config_client(bootstrap)?;
    let config: BeaconConfig = client.fetch_with_substitution().await?;
    config.validate()?;
    Ok(config)
}
