//! Payload layouts of the firewall control devices.
//!
//! IP addresses are written in network order. Port fields follow the configured
//! [`ByteOrder`], which is the host's own order for the stock kernel module.

use std::net::Ipv4Addr;

use super::types::Endpoint;
use crate::configuration::types::ByteOrder;

pub const PROXY_PORT_PAYLOAD_LEN: usize = 8;
pub const FTP_DATA_PAYLOAD_LEN: usize = 10;

fn port_bytes(port: u16, order: ByteOrder) -> [u8; 2] {
    match order {
        ByteOrder::Native => port.to_ne_bytes(),
        ByteOrder::Little => port.to_le_bytes(),
        ByteOrder::Big => port.to_be_bytes(),
    }
}

/// `client ip (4) | client port (2) | proxy port (2)`
pub fn encode_proxy_port(
    client: Endpoint,
    proxy_port: u16,
    order: ByteOrder,
) -> [u8; PROXY_PORT_PAYLOAD_LEN] {
    let mut buf = [0u8; PROXY_PORT_PAYLOAD_LEN];
    buf[0..4].copy_from_slice(&client.ip().octets());
    buf[4..6].copy_from_slice(&port_bytes(client.port(), order));
    buf[6..8].copy_from_slice(&port_bytes(proxy_port, order));
    buf
}

/// `client ip (4) | server ip (4) | data port (2)`
pub fn encode_ftp_data(
    client_ip: Ipv4Addr,
    server_ip: Ipv4Addr,
    data_port: u16,
    order: ByteOrder,
) -> [u8; FTP_DATA_PAYLOAD_LEN] {
    let mut buf = [0u8; FTP_DATA_PAYLOAD_LEN];
    buf[0..4].copy_from_slice(&client_ip.octets());
    buf[4..8].copy_from_slice(&server_ip.octets());
    buf[8..10].copy_from_slice(&port_bytes(data_port, order));
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_port_layout() {
        let client: Endpoint = "10.1.1.5:5000".parse().unwrap();

        let big = encode_proxy_port(client, 0x1234, ByteOrder::Big);
        assert_eq!(big, [10, 1, 1, 5, 0x13, 0x88, 0x12, 0x34]);

        let little = encode_proxy_port(client, 0x1234, ByteOrder::Little);
        assert_eq!(little, [10, 1, 1, 5, 0x88, 0x13, 0x34, 0x12]);
    }

    #[test]
    fn test_native_order_matches_host() {
        let client: Endpoint = "10.1.1.5:5000".parse().unwrap();
        let native = encode_proxy_port(client, 40001, ByteOrder::Native);

        assert_eq!(&native[0..4], &[10, 1, 1, 5]);
        assert_eq!(&native[4..6], &5000u16.to_ne_bytes());
        assert_eq!(&native[6..8], &40001u16.to_ne_bytes());
    }

    #[test]
    fn test_ftp_data_layout() {
        let buf = encode_ftp_data(
            Ipv4Addr::new(192, 168, 1, 5),
            Ipv4Addr::new(10, 1, 2, 2),
            1025,
            ByteOrder::Big,
        );
        assert_eq!(buf, [192, 168, 1, 5, 10, 1, 2, 2, 0x04, 0x01]);
    }
}
