use chrono::{DateTime, Utc};
use log::info;
use uuid::Uuid;

use super::relay::DirectionStats;
use super::SessionStatus;
use crate::configuration::types::Protocol;
use crate::firewall::Endpoint;

/// Bookkeeping for one client-to-server relay instance.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub protocol: Protocol,
    pub client: Endpoint,
    /// Known once the firewall resolved the original destination
    pub server: Option<Endpoint>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub client_to_server: DirectionStats,
    pub server_to_client: DirectionStats,
}

impl Session {
    pub fn new(protocol: Protocol, client: Endpoint) -> Self {
        Self {
            id: Uuid::new_v4(),
            protocol,
            client,
            server: None,
            start_time: Utc::now(),
            end_time: None,
            status: SessionStatus::Pending,
            client_to_server: DirectionStats::default(),
            server_to_client: DirectionStats::default(),
        }
    }

    pub fn finish(&mut self, status: SessionStatus) {
        self.status = status;
        self.end_time = Some(Utc::now());
    }

    pub fn log_summary(&self) {
        let duration = self.end_time.unwrap_or_else(Utc::now) - self.start_time;
        info!(
            "[{}] {} session {} -> {} closed ({:?}) after {}ms: c2s forwarded={} blocked={} bytes={}, s2c forwarded={} blocked={} bytes={}",
            self.id,
            self.protocol,
            self.client,
            self.server
                .map(|s| s.to_string())
                .unwrap_or_else(|| "?".to_string()),
            self.status,
            duration.num_milliseconds(),
            self.client_to_server.messages_forwarded,
            self.client_to_server.messages_blocked,
            self.client_to_server.bytes_forwarded,
            self.server_to_client.messages_forwarded,
            self.server_to_client.messages_blocked,
            self.server_to_client.bytes_forwarded,
        );
    }
}
