//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::net::IpAddr;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the relay server to.
    /// Override: `LOCKSTEP_BIND_ADDR`
    pub bind_addr: IpAddr,

    /// Port to bind the relay server to.
    /// Override: `LOCKSTEP_BIND_PORT`
    pub bind_port: u16,

    /// Maximum members per session topic before joins are refused.
    /// Override: `LOCKSTEP_MAX_PEERS`
    pub max_peers_per_topic: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let defaults = lockstep_core::Config::default();
        Self {
            bind_addr: IpAddr::from([0, 0, 0, 0]),
            bind_port: 4000,
            max_peers_per_topic: defaults.max_peers_per_topic,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("LOCKSTEP_BIND_ADDR") {
            if let Ok(addr) = val.parse() {
                self.bind_addr = addr;
            }
        }

        if let Ok(val) = std::env::var("LOCKSTEP_BIND_PORT") {
            if let Ok(port) = val.parse() {
                self.bind_port = port;
            }
        }

        if let Ok(val) = std::env::var("LOCKSTEP_MAX_PEERS") {
            if let Ok(peers) = val.parse() {
                self.max_peers_per_topic = peers;
            }
        }
    }

    /// Converts to lockstep-core's Config type.
    pub fn to_core_config(&self) -> lockstep_core::Config {
        lockstep_core::Config {
            max_peers_per_topic: self.max_peers_per_topic,
            ..Default::default()
        }
    }
}
