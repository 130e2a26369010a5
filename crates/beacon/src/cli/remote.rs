use std::sync::Arc;

use anyhow::Result;
use beacon_core::config::{Bootstrap, ConfigClient, RemoteFormat};
use beacon_runtime::ReqwestTransport;
use clap::{Parser, ValueEnum};
use console::style;

/// Output representation for a fetched document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FetchFormat {
    Json,
    Yaml,
    Properties,
    /// Flattened `key = value` pairs.
    Map,
}

/// Fetch configuration from a config server.
#[derive(Parser)]
pub struct ConfigCommand {
    /// Bootstrap file naming the server, application and profile.
    #[arg(short, long, default_value = "bootstrap.yml")]
    pub bootstrap: String,

    /// Representation to fetch.
    #[arg(short, long, value_enum, default_value_t = FetchFormat::Yaml)]
    pub format: FetchFormat,
}

impl ConfigCommand {
    pub async fn execute(self) -> Result<()> {
        let client = config_client(&self.bootstrap)?;
        eprintln!(
            "  {} {}",
            style("⚙").bold(),
            style(client.request_url(remote_format(self.format))).dim()
        );

        match self.format {
            FetchFormat::Json => println!("{}", client.fetch_as_json().await?),
            FetchFormat::Yaml => println!("{}", client.fetch_as_yaml().await?),
            FetchFormat::Properties => println!("{}", client.fetch_as_properties().await?),
            FetchFormat::Map => {
                for (key, value) in client.fetch_as_map().await? {
                    println!("{} = {}", style(key).cyan(), value);
                }
            }
        }
        Ok(())
    }
}

fn remote_format(format: FetchFormat) -> RemoteFormat {
    match format {
        FetchFormat::Json => RemoteFormat::Json,
        FetchFormat::Yaml => RemoteFormat::Yaml,
        FetchFormat::Properties | FetchFormat::Map => RemoteFormat::Properties,
    }
}

/// Build a config client from a bootstrap file.
pub(crate) fn config_client(path: &str) -> Result<ConfigClient> {
    let bootstrap = Bootstrap::from_file(path)?;
    Ok(ConfigClient::new(bootstrap, Arc::new(ReqwestTransport::new()?))?)
}
