use super::types::*;
use crate::error_handling::types::ConfigError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::path::Path;

/// Application configuration structure that defines all runtime parameters.
///
/// Loaded from a TOML file with `serde`; every field has a default so an empty
/// file (or no file at all) yields the stock deployment: HTTP on 800, FTP on
/// 210 and SMTP on 250, listening on the internal interface.
///
/// # Fields Overview
///
/// - `internal_address`: address the protocol listeners bind to
/// - `external_address`: address server-side sockets bind to before connecting
/// - `firewall`: control-plane command and device locations
/// - `session`: framing limits and read timeout
/// - `dlp`: thresholds of the embedded code detector
/// - `ips`: mode and command set of the command filter
/// - `services`: one entry per proxied protocol listener
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub internal_address: Ipv4Addr,
    pub external_address: Ipv4Addr,
    pub firewall: FirewallConfig,
    pub session: SessionConfig,
    pub dlp: DlpThresholds,
    pub ips: IpsConfig,
    pub services: Vec<ServiceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            internal_address: Ipv4Addr::new(10, 1, 1, 3),
            external_address: Ipv4Addr::new(10, 1, 2, 3),
            firewall: FirewallConfig::default(),
            session: SessionConfig::default(),
            dlp: DlpThresholds::default(),
            ips: IpsConfig::default(),
            services: vec![
                ServiceConfig::standard(Protocol::Http),
                ServiceConfig::standard(Protocol::Ftp),
                ServiceConfig::standard(Protocol::Smtp),
            ],
        }
    }
}

impl Config {
    /// Reads and validates a configuration file.
    ///
    /// # Errors
    /// - [`ConfigError::IoError`] if the file cannot be read
    /// - [`ConfigError::TomlError`] if it is not valid TOML for this schema
    /// - any validation error from [`Config::validate`]
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Reading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled_services().next().is_none() {
            return Err(ConfigError::ServicesEmpty(
                "at least one enabled service is required".to_string(),
            ));
        }

        let mut ports = HashSet::new();
        for service in self.enabled_services() {
            if !ports.insert(service.port) {
                return Err(ConfigError::DuplicatePort(service.port));
            }
        }

        if !(0.0..=1.0).contains(&self.dlp.frac_min) {
            return Err(ConfigError::NotInRange(format!(
                "dlp.frac_min must be within [0, 1], got {}",
                self.dlp.frac_min
            )));
        }
        if self.dlp.block_size_min == 0 {
            return Err(ConfigError::NotInRange(
                "dlp.block_size_min must be at least 1".to_string(),
            ));
        }
        if self.session.read_chunk_size == 0 {
            return Err(ConfigError::NotInRange(
                "session.read_chunk_size must be at least 1".to_string(),
            ));
        }
        if self.session.max_message_bytes < self.session.read_chunk_size {
            return Err(ConfigError::NotInRange(
                "session.max_message_bytes must not be smaller than session.read_chunk_size"
                    .to_string(),
            ));
        }
        if self.firewall.connection_table_command.is_empty() {
            return Err(ConfigError::NotInRange(
                "firewall.connection_table_command must name a program".to_string(),
            ));
        }

        Ok(())
    }

    pub fn enabled_services(&self) -> impl Iterator<Item = &ServiceConfig> {
        self.services.iter().filter(|s| s.enabled)
    }
}
