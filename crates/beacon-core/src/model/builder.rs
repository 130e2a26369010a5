use std::net::Ipv4Addr;

use uuid::Uuid;

use super::instance::{DataCenterInfo, Instance, InstanceStatus, Port};
use crate::config::{expand_env, InstanceConfig};
use crate::error::{BeaconError, Result};

const HOME_PAGE_DEFAULT_PATH: &str = "/";
const STATUS_PAGE_DEFAULT_PATH: &str = "/info";
const HEALTH_CHECK_DEFAULT_PATH: &str = "health";

/// Build the registration payload for the configured instance.
///
/// Generates a fresh instance id on every call.
pub fn build_instance(config: &InstanceConfig) -> Result<Instance> {
    let address = resolve_address(&config.ip_address)?;
    Ok(build_instance_with_address(config, address))
}

/// Build the registration payload using an already resolved address.
pub fn build_instance_with_address(config: &InstanceConfig, address: String) -> Instance {
    let host_name = if !config.prefer_ip_address && !config.host_name.is_empty() {
        expand_env(&config.host_name)
    } else {
        address.clone()
    };

    Instance {
        instance_id: generate_id(&config.app_name),
        host_name,
        app_name: config.app_name.clone(),
        vip_address: config.app_name.clone(),
        status: InstanceStatus::Up,
        port: Port::new(config.port, true),
        secure_port: Port::new(config.secure_port, false),
        home_page_url: instance_url(
            &address,
            config.port,
            &config.home_page_url_path,
            HOME_PAGE_DEFAULT_PATH,
        ),
        status_page_url: instance_url(
            &address,
            config.port,
            &config.status_page_url_path,
            STATUS_PAGE_DEFAULT_PATH,
        ),
        health_check_url: instance_url(
            &address,
            config.port,
            &config.health_check_url_path,
            HEALTH_CHECK_DEFAULT_PATH,
        ),
        data_center_info: DataCenterInfo::default(),
        metadata: config.metadata.clone(),
        ip_addr: address,
    }
}

/// Resolve the advertised address.
///
/// An explicit address has its environment references expanded; otherwise
/// the first non-loopback IPv4 interface address is used.
pub fn resolve_address(explicit: &str) -> Result<String> {
    if !explicit.is_empty() {
        return Ok(expand_env(explicit));
    }

    local_ipv4()
        .map(|ip| ip.to_string())
        .ok_or_else(|| {
            BeaconError::Config("Unable to determine local IP address (non loopback)".into())
        })
}

/// First non-loopback IPv4 address of the local interfaces.
pub fn local_ipv4() -> Option<Ipv4Addr> {
    let interfaces = match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces,
        Err(e) => {
            tracing::warn!("Failed to enumerate network interfaces: {}", e);
            return None;
        }
    };

    interfaces.into_iter().find_map(|iface| {
        if iface.is_loopback() {
            return None;
        }
        match iface.addr {
            if_addrs::IfAddr::V4(v4) => Some(v4.ip),
            _ => None,
        }
    })
}

fn instance_url(host: &str, port: u16, path: &str, default_path: &str) -> String {
    let path = if path.is_empty() { default_path } else { path };
    let path = path.strip_prefix('/').unwrap_or(path);
    format!("http://{}:{}/{}", host, port, path)
}

fn generate_id(app_name: &str) -> String {
    format!("{}:{}", app_name, Uuid::new_v4())
}
