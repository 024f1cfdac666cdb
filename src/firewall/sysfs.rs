use async_trait::async_trait;
use log::{debug, trace};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::connection_table::{find_destination, parse_connection_table};
use super::control_port::FirewallControl;
use super::types::Endpoint;
use super::wire::{encode_ftp_data, encode_proxy_port};
use crate::configuration::types::{ByteOrder, FirewallConfig};
use crate::error_handling::types::FirewallError;

/// [`FirewallControl`] backed by the firewall's user-space tooling.
///
/// - destinations come from running the connection listing command
/// - registrations are single writes to the module's sysfs attributes
pub struct SysfsFirewall {
    connection_table_command: Vec<String>,
    proxy_port_device: PathBuf,
    ftp_data_device: PathBuf,
    byte_order: ByteOrder,
}

impl SysfsFirewall {
    pub fn new(config: &FirewallConfig) -> Self {
        Self {
            connection_table_command: config.connection_table_command.clone(),
            proxy_port_device: config.proxy_port_device.clone(),
            ftp_data_device: config.ftp_data_device.clone(),
            byte_order: config.byte_order,
        }
    }

    async fn query_connection_table(&self) -> Result<String, FirewallError> {
        let (program, args) = self
            .connection_table_command
            .split_first()
            .ok_or_else(|| FirewallError::CommandFailed("empty command".to_string()))?;

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| FirewallError::CommandFailed(format!("{}: {}", program, e)))?;

        if !output.status.success() {
            return Err(FirewallError::CommandFailed(format!(
                "{} exited with {}",
                program, output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn write_device(path: &Path, payload: &[u8]) -> Result<(), FirewallError> {
        let to_error = |source| FirewallError::DeviceWrite {
            path: path.to_path_buf(),
            source,
        };

        // sysfs attributes take the whole payload in one write
        let mut device = tokio::fs::OpenOptions::new()
            .write(true)
            .open(path)
            .await
            .map_err(to_error)?;
        device.write_all(payload).await.map_err(to_error)?;
        device.flush().await.map_err(to_error)?;

        trace!("wrote {} bytes to {}", payload.len(), path.display());
        Ok(())
    }
}

#[async_trait]
impl FirewallControl for SysfsFirewall {
    async fn resolve_destination(&self, client: Endpoint) -> Result<Endpoint, FirewallError> {
        let listing = self.query_connection_table().await?;
        let records = parse_connection_table(&listing);
        debug!(
            "connection table lists {} records, looking up {}",
            records.len(),
            client
        );

        find_destination(&records, client).ok_or(FirewallError::DestinationNotFound(client))
    }

    async fn register_proxy_port(
        &self,
        client: Endpoint,
        proxy_port: u16,
    ) -> Result<(), FirewallError> {
        debug!("registering proxy port {} for client {}", proxy_port, client);
        let payload = encode_proxy_port(client, proxy_port, self.byte_order);
        Self::write_device(&self.proxy_port_device, &payload).await
    }

    async fn register_ftp_data_channel(
        &self,
        client_ip: Ipv4Addr,
        server_ip: Ipv4Addr,
        data_port: u16,
    ) -> Result<(), FirewallError> {
        debug!(
            "registering FTP data channel {}:{} <- {}",
            client_ip, data_port, server_ip
        );
        let payload = encode_ftp_data(client_ip, server_ip, data_port, self.byte_order);
        Self::write_device(&self.ftp_data_device, &payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn firewall(command: &[&str], port_dev: &Path, ftp_dev: &Path) -> SysfsFirewall {
        SysfsFirewall::new(&FirewallConfig {
            connection_table_command: command.iter().map(|s| s.to_string()).collect(),
            proxy_port_device: port_dev.to_path_buf(),
            ftp_data_device: ftp_dev.to_path_buf(),
            byte_order: ByteOrder::Big,
        })
    }

    #[tokio::test]
    async fn test_resolve_destination_from_command() {
        let fw = firewall(
            &[
                "sh",
                "-c",
                "printf 'in_ip out_ip in_port out_port\\n10.1.1.5 93.0.0.1 5000 80\\n'",
            ],
            Path::new("/dev/null"),
            Path::new("/dev/null"),
        );

        let server = fw
            .resolve_destination("10.1.1.5:5000".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(server, "93.0.0.1:80".parse().unwrap());

        let err = fw
            .resolve_destination("10.1.1.6:5000".parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, FirewallError::DestinationNotFound(_)));
    }

    #[tokio::test]
    async fn test_failing_command() {
        let fw = firewall(&["false"], Path::new("/dev/null"), Path::new("/dev/null"));
        let err = fw
            .resolve_destination("10.1.1.5:5000".parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, FirewallError::CommandFailed(_)));

        let fw = firewall(
            &["/nonexistent/fw-user"],
            Path::new("/dev/null"),
            Path::new("/dev/null"),
        );
        let err = fw
            .resolve_destination("10.1.1.5:5000".parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, FirewallError::CommandFailed(_)));
    }

    #[tokio::test]
    async fn test_registrations_write_payloads() {
        let port_dev = NamedTempFile::new().unwrap();
        let ftp_dev = NamedTempFile::new().unwrap();
        let fw = firewall(&["true"], port_dev.path(), ftp_dev.path());

        fw.register_proxy_port("10.1.1.5:5000".parse().unwrap(), 40000)
            .await
            .unwrap();
        fw.register_ftp_data_channel(
            Ipv4Addr::new(192, 168, 1, 5),
            Ipv4Addr::new(93, 0, 0, 1),
            1025,
        )
        .await
        .unwrap();

        let written = std::fs::read(port_dev.path()).unwrap();
        assert_eq!(written, vec![10, 1, 1, 5, 0x13, 0x88, 0x9c, 0x40]);
        let written = std::fs::read(ftp_dev.path()).unwrap();
        assert_eq!(written, vec![192, 168, 1, 5, 93, 0, 0, 1, 4, 1]);
    }

    #[tokio::test]
    async fn test_missing_device() {
        let fw = firewall(
            &["true"],
            Path::new("/nonexistent/set_port"),
            Path::new("/nonexistent/add_ftp"),
        );
        let err = fw
            .register_proxy_port("10.1.1.5:5000".parse().unwrap(), 40000)
            .await
            .unwrap_err();
        assert!(matches!(err, FirewallError::DeviceWrite { .. }));
    }
}
