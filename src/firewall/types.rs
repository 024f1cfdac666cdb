use std::net::{SocketAddr, SocketAddrV4};

use crate::error_handling::types::FirewallError;

/// `(ip, port)` pair as tracked by the firewall. Only IPv4 is supported.
pub type Endpoint = SocketAddrV4;

/// One row of the firewall connection table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirewallRecord {
    pub client: Endpoint,
    pub server: Endpoint,
}

pub fn to_endpoint(addr: SocketAddr) -> Result<Endpoint, FirewallError> {
    match addr {
        SocketAddr::V4(v4) => Ok(v4),
        SocketAddr::V6(_) => Err(FirewallError::UnsupportedAddress(addr)),
    }
}
