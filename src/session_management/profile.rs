use std::net::Ipv4Addr;
use std::time::Duration;

use crate::configuration::types::{Protocol, ServiceConfig};
use crate::configuration::Config;
use crate::framing::{FramingMode, MessageFramer};
use crate::inspection::InspectorChain;

/// Everything protocol specific about a session, shared by all sessions of a
/// listener.
#[derive(Clone)]
pub struct ProtocolProfile {
    pub protocol: Protocol,
    pub framing: FramingMode,
    /// Blades applied to client -> server messages
    pub client_chain: InspectorChain,
    /// Blades applied to server -> client messages
    pub server_chain: InspectorChain,
    /// Register active-mode FTP data channels announced by the client
    pub track_ftp_data: bool,
}

impl ProtocolProfile {
    pub fn from_service(service: &ServiceConfig, config: &Config) -> Self {
        Self {
            protocol: service.protocol,
            framing: FramingMode::for_protocol(service.protocol),
            client_chain: InspectorChain::from_kinds(&service.client_blades, config),
            server_chain: InspectorChain::from_kinds(&service.server_blades, config),
            track_ftp_data: service.protocol == Protocol::Ftp,
        }
    }
}

/// Socket and framing parameters common to every session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Interface server-side sockets bind to
    pub external_address: Ipv4Addr,
    pub read_chunk_size: usize,
    pub max_message_bytes: usize,
    pub idle_timeout: Option<Duration>,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            external_address: config.external_address,
            read_chunk_size: config.session.read_chunk_size,
            max_message_bytes: config.session.max_message_bytes,
            idle_timeout: match config.session.idle_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }

    pub fn framer(&self, mode: FramingMode) -> MessageFramer {
        MessageFramer::new(mode, self.read_chunk_size, self.max_message_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_profiles() {
        let config = Config::default();
        let profiles: Vec<ProtocolProfile> = config
            .enabled_services()
            .map(|s| ProtocolProfile::from_service(s, &config))
            .collect();

        let http = &profiles[0];
        assert_eq!(http.framing, FramingMode::HeaderBody);
        assert_eq!(http.client_chain.names(), vec!["dlp"]);
        assert_eq!(http.server_chain.names(), vec!["mime"]);
        assert!(!http.track_ftp_data);

        let ftp = &profiles[1];
        assert_eq!(ftp.framing, FramingMode::Line);
        assert!(ftp.client_chain.is_empty() && ftp.server_chain.is_empty());
        assert!(ftp.track_ftp_data);

        let smtp = &profiles[2];
        assert_eq!(smtp.client_chain.names(), vec!["dlp"]);
        assert_eq!(smtp.server_chain.names(), vec!["dlp"]);
    }

    #[test]
    fn test_settings() {
        let mut config = Config::default();
        assert_eq!(SessionSettings::from_config(&config).idle_timeout, None);

        config.session.idle_timeout_secs = 30;
        let settings = SessionSettings::from_config(&config);
        assert_eq!(settings.idle_timeout, Some(Duration::from_secs(30)));
        assert_eq!(settings.external_address, Ipv4Addr::new(10, 1, 2, 3));
    }
}
