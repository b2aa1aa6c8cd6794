//! Environment variable overrides.

use std::str::FromStr;

use crate::{Config, ConfigError, DirectConfig, Result, TopologyConfig};

pub const ENV_DIRECT_ENABLED: &str = "TETHER_DIRECT_ENABLED";
pub const ENV_DIRECT_NETWORK: &str = "TETHER_DIRECT_NETWORK";
pub const ENV_DIRECT_ADDR: &str = "TETHER_DIRECT_ADDR";
pub const ENV_DIRECT_USERNAME: &str = "TETHER_DIRECT_USERNAME";
pub const ENV_DIRECT_PASSWORD: &str = "TETHER_DIRECT_PASSWORD";
pub const ENV_DIRECT_DB: &str = "TETHER_DIRECT_DB";
pub const ENV_DIRECT_PROTOCOL: &str = "TETHER_DIRECT_PROTOCOL";
pub const ENV_TOPOLOGY_ENABLED: &str = "TETHER_TOPOLOGY_ENABLED";
pub const ENV_TOPOLOGY_ADDRS: &str = "TETHER_TOPOLOGY_ADDRS";
pub const ENV_TOPOLOGY_USERNAME: &str = "TETHER_TOPOLOGY_USERNAME";
pub const ENV_TOPOLOGY_PASSWORD: &str = "TETHER_TOPOLOGY_PASSWORD";
pub const ENV_TOPOLOGY_MASTER_NAME: &str = "TETHER_TOPOLOGY_MASTER_NAME";
pub const ENV_TOPOLOGY_CLUSTER_MODE: &str = "TETHER_TOPOLOGY_CLUSTER_MODE";

const DIRECT_KEYS: [&str; 7] = [
    ENV_DIRECT_ENABLED,
    ENV_DIRECT_NETWORK,
    ENV_DIRECT_ADDR,
    ENV_DIRECT_USERNAME,
    ENV_DIRECT_PASSWORD,
    ENV_DIRECT_DB,
    ENV_DIRECT_PROTOCOL,
];

const TOPOLOGY_KEYS: [&str; 6] = [
    ENV_TOPOLOGY_ENABLED,
    ENV_TOPOLOGY_ADDRS,
    ENV_TOPOLOGY_USERNAME,
    ENV_TOPOLOGY_PASSWORD,
    ENV_TOPOLOGY_MASTER_NAME,
    ENV_TOPOLOGY_CLUSTER_MODE,
];

pub(crate) fn apply<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if DIRECT_KEYS.iter().any(|key| lookup(key).is_some()) {
        let direct = config.direct.get_or_insert_with(DirectConfig::default);
        apply_direct(direct, &lookup)?;
    }

    if TOPOLOGY_KEYS.iter().any(|key| lookup(key).is_some()) {
        let topology = config.topology.get_or_insert_with(TopologyConfig::default);
        apply_topology(topology, &lookup)?;
    }

    Ok(())
}

fn apply_direct<F>(direct: &mut DirectConfig, lookup: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_DIRECT_ENABLED) {
        direct.enabled = parse(ENV_DIRECT_ENABLED, &value, "true or false")?;
    }
    if let Some(value) = lookup(ENV_DIRECT_NETWORK) {
        direct.network = value;
    }
    if let Some(value) = lookup(ENV_DIRECT_ADDR) {
        direct.addr = value;
    }
    if let Some(value) = lookup(ENV_DIRECT_USERNAME) {
        direct.username = value;
    }
    if let Some(value) = lookup(ENV_DIRECT_PASSWORD) {
        direct.password = value;
    }
    if let Some(value) = lookup(ENV_DIRECT_DB) {
        direct.db = parse(ENV_DIRECT_DB, &value, "an integer")?;
    }
    if let Some(value) = lookup(ENV_DIRECT_PROTOCOL) {
        direct.protocol = parse(ENV_DIRECT_PROTOCOL, &value, "2 or 3")?;
    }
    Ok(())
}

fn apply_topology<F>(topology: &mut TopologyConfig, lookup: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_TOPOLOGY_ENABLED) {
        topology.enabled = parse(ENV_TOPOLOGY_ENABLED, &value, "true or false")?;
    }
    if let Some(value) = lookup(ENV_TOPOLOGY_ADDRS) {
        topology.addrs = value
            .split(',')
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(value) = lookup(ENV_TOPOLOGY_USERNAME) {
        topology.username = value;
    }
    if let Some(value) = lookup(ENV_TOPOLOGY_PASSWORD) {
        topology.password = value;
    }
    if let Some(value) = lookup(ENV_TOPOLOGY_MASTER_NAME) {
        topology.master_name = value;
    }
    if let Some(value) = lookup(ENV_TOPOLOGY_CLUSTER_MODE) {
        topology.is_cluster_mode = parse(ENV_TOPOLOGY_CLUSTER_MODE, &value, "true or false")?;
    }
    Ok(())
}

fn parse<T: FromStr>(key: &str, value: &str, expected: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::EnvVar(format!("{} must be {}, got: {:?}", key, expected, value)))
}
