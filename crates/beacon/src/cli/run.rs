use anyhow::Result;
use beacon::logging::init_logging;
use beacon::Beacon;
use clap::Parser;
use console::style;
use tracing::info;

use super::{load_config, load_remote_config};

/// Register the instance and keep it alive.
#[derive(Parser)]
pub struct RunCommand {
    /// Configuration file path.
    #[arg(short, long, default_value = "beacon.yml")]
    pub config: String,

    /// Fetch the configuration from a config server described by this
    /// bootstrap file instead of reading `--config`.
    #[arg(short, long)]
    pub bootstrap: Option<String>,

    /// Register in the background instead of waiting for the registry.
    #[arg(long)]
    pub background: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl RunCommand {
    /// Execute the run command.
    pub async fn execute(self) -> Result<()> {
        let (config, source) = match &self.bootstrap {
            Some(bootstrap) => (load_remote_config(bootstrap).await?, bootstrap.as_str()),
            None => (load_config(&self.config)?, self.config.as_str()),
        };
        init_logging(&config.logging, self.verbose);

        println!();
        println!(
            "  {}  {} v{}",
            style("📡").bold(),
            style("BEACON").bold().cyan(),
            env!("CARGO_PKG_VERSION")
        );
        println!();
        println!(
            "  {} Application {}",
            style("🏷️").bold(),
            style(&config.instance.app_name).cyan()
        );
        for url in &config.client.service_urls {
            println!("  {} Registry {}", style("🌐").bold(), style(url).cyan());
        }
        println!();

        info!("Loaded configuration from {}", source);

        let beacon = Beacon::builder().config(config).build()?;
        beacon.run(!self.background).await?;

        println!("\n  {} Goodbye!", style("👋").bold());
        Ok(())
    }
}
