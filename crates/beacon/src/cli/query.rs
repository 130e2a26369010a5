use std::sync::Arc;

use anyhow::Result;
use beacon_core::model::Application;
use beacon_runtime::{DiscoveryClient, ReqwestTransport};
use clap::Parser;
use console::style;

use super::load_config;

/// List registered applications.
#[derive(Parser)]
pub struct AppsCommand {
    /// Configuration file path.
    #[arg(short, long, default_value = "beacon.yml")]
    pub config: String,

    /// Only show this application.
    #[arg(short, long)]
    pub name: Option<String>,

    /// Print raw JSON.
    #[arg(long)]
    pub json: bool,
}

impl AppsCommand {
    pub async fn execute(self) -> Result<()> {
        let client = connect(&self.config)?;

        let mut apps: Vec<Application> = match &self.name {
            Some(name) => vec![client.get_application(name).await?],
            None => client.get_applications().await?.into_values().collect(),
        };
        apps.sort_by(|a, b| a.name.cmp(&b.name));

        if self.json {
            println!("{}", serde_json::to_string_pretty(&apps)?);
            return Ok(());
        }

        if apps.is_empty() {
            println!("  {} No applications registered", style("ℹ").dim());
        }
        for app in &apps {
            println!(
                "{} {}",
                style(&app.name).bold().cyan(),
                style(format!("({} instances)", app.instances.len())).dim()
            );
            print!("{}", app);
        }
        Ok(())
    }
}

/// Show one registered instance.
#[derive(Parser)]
pub struct InstanceCommand {
    /// Configuration file path.
    #[arg(short, long, default_value = "beacon.yml")]
    pub config: String,

    /// Application name.
    #[arg(long)]
    pub app: String,

    /// Instance id.
    #[arg(long)]
    pub id: String,
}

impl InstanceCommand {
    pub async fn execute(self) -> Result<()> {
        let client = connect(&self.config)?;
        let instance = client.get_instance(&self.app, &self.id).await?;

        println!("{}", style(&instance.app_name).bold().cyan());
        print!("{}", instance);
        Ok(())
    }
}

fn connect(config_path: &str) -> Result<DiscoveryClient> {
    let config = load_config(config_path)?;
    let transport = Arc::new(ReqwestTransport::new()?);
    Ok(DiscoveryClient::new(config, transport)?)
}
