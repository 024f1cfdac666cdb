//! Active-mode FTP data channel tracking.
//!
//! In active mode the client announces `PORT h1,h2,h3,h4,p1,p2` and the server
//! then connects back to `h1.h2.h3.h4:(p1 * 256 + p2)`. The firewall has to be
//! told about that connection beforehand or it drops it.

use log::info;
use regex::Regex;
use std::net::Ipv4Addr;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

use crate::error_handling::types::FirewallError;
use crate::firewall::FirewallControl;

fn port_command() -> &'static Regex {
    static PORT_COMMAND: OnceLock<Regex> = OnceLock::new();
    PORT_COMMAND.get_or_init(|| {
        Regex::new(r"PORT (\d{1,3}),(\d{1,3}),(\d{1,3}),(\d{1,3}),(\d{1,3}),(\d{1,3})\b")
            .expect("PORT pattern is valid")
    })
}

/// Every data channel announced in `text`, in order of appearance.
///
/// Arguments outside `0..=255` are not valid PORT commands and are skipped.
pub fn parse_port_commands(text: &str) -> Vec<(Ipv4Addr, u16)> {
    port_command()
        .captures_iter(text)
        .filter_map(|caps| {
            let mut fields = [0u8; 6];
            for (i, field) in fields.iter_mut().enumerate() {
                *field = caps[i + 1].parse().ok()?;
            }
            let ip = Ipv4Addr::new(fields[0], fields[1], fields[2], fields[3]);
            let port = 256 * u16::from(fields[4]) + u16::from(fields[5]);
            Some((ip, port))
        })
        .collect()
}

/// Registers the data channels a client announces on one FTP control connection.
pub struct FtpDataTracker {
    control: Arc<dyn FirewallControl>,
    server_ip: Ipv4Addr,
    session_id: Uuid,
}

impl FtpDataTracker {
    pub fn new(control: Arc<dyn FirewallControl>, server_ip: Ipv4Addr, session_id: Uuid) -> Self {
        Self {
            control,
            server_ip,
            session_id,
        }
    }

    /// Registers every PORT command found in `text` and returns how many
    /// were registered. Stops at the first failed registration.
    pub async fn register_announced(&self, text: &str) -> Result<usize, FirewallError> {
        let announced = parse_port_commands(text);
        for (client_ip, data_port) in &announced {
            info!(
                "[{}] active FTP data channel {}:{} announced",
                self.session_id, client_ip, data_port
            );
            self.control
                .register_ftp_data_channel(*client_ip, self.server_ip, *data_port)
                .await?;
        }
        Ok(announced.len())
    }
}
