use async_trait::async_trait;
use std::net::Ipv4Addr;

use super::types::Endpoint;
use crate::error_handling::types::FirewallError;

/// Operations the proxy needs from the firewall.
///
/// Implementations must be shareable between every session of every listener.
/// The registration writes are fire-and-forget; the control device serializes them.
#[async_trait]
pub trait FirewallControl: Send + Sync {
    /// Looks up the server a redirected client was originally heading to.
    ///
    /// Returns [`FirewallError::DestinationNotFound`] when no tracked connection
    /// matches `client`.
    async fn resolve_destination(&self, client: Endpoint) -> Result<Endpoint, FirewallError>;

    /// Tells the firewall which local port the proxy uses to reach the server on
    /// behalf of `client`. Must be called before connecting from that port.
    async fn register_proxy_port(&self, client: Endpoint, proxy_port: u16)
        -> Result<(), FirewallError>;

    /// Announces the data connection an FTP server is about to open towards
    /// `client_ip:data_port`.
    async fn register_ftp_data_channel(
        &self,
        client_ip: Ipv4Addr,
        server_ip: Ipv4Addr,
        data_port: u16,
    ) -> Result<(), FirewallError>;
}
