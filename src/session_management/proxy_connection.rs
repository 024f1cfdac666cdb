use log::{debug, error, info, warn};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpSocket, TcpStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::ftp_data::FtpDataTracker;
use super::profile::{ProtocolProfile, SessionSettings};
use super::relay::{relay_direction, Direction, DirectionContext};
use super::session::Session;
use super::SessionStatus;
use crate::error_handling::types::SessionError;
use crate::firewall::{to_endpoint, Endpoint, FirewallControl};

/// Lifecycle of a proxied connection. Transitions only move forward; any
/// failure jumps straight to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Accepted,
    DestinationResolved,
    Connected,
    Relaying,
    Closed,
}

/// One intercepted client connection and its server-side counterpart.
///
/// # Fields Overview
///
/// - `session`: bookkeeping record returned when the connection ends
/// - `profile`: framing mode and blade chains of the listener that accepted it
/// - `control`: firewall control plane used for resolution and registrations
/// - `terminated`: shared by both relay directions, child of the listener token
pub struct ProxyConnection {
    session: Session,
    state: ConnectionState,
    profile: ProtocolProfile,
    control: Arc<dyn FirewallControl>,
    settings: SessionSettings,
    terminated: CancellationToken,
}

impl ProxyConnection {
    pub fn new(
        client: Endpoint,
        profile: ProtocolProfile,
        control: Arc<dyn FirewallControl>,
        settings: SessionSettings,
        shutdown: &CancellationToken,
    ) -> Self {
        Self {
            session: Session::new(profile.protocol, client),
            state: ConnectionState::Accepted,
            profile,
            control,
            settings,
            terminated: shutdown.child_token(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.session.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Drives the connection from accept to close.
    ///
    /// # Errors
    /// Setup failures (no firewall record, failed registration, unreachable
    /// server) abort the session before anything is relayed. Errors of a
    /// running relay direction only mark the returned session as `Error`.
    pub async fn run(mut self, client_stream: TcpStream) -> Result<Session, SessionError> {
        info!(
            "[{}] {} connection from {}",
            self.session.id, self.session.protocol, self.session.client
        );

        let server_stream = match self.connect_upstream().await {
            Ok(stream) => stream,
            Err(e) => {
                error!("[{}] session setup failed: {}", self.session.id, e);
                self.close(SessionStatus::Error);
                return Err(e);
            }
        };

        self.relay(client_stream, server_stream).await;
        Ok(self.session)
    }

    /// Resolves the original destination, binds a source port on the external
    /// interface, registers it with the firewall and connects.
    ///
    /// The registration has to happen before `connect` sends the first SYN,
    /// otherwise the firewall cannot map the server-side flow back to the client.
    pub async fn connect_upstream(&mut self) -> Result<TcpStream, SessionError> {
        let client = self.session.client;
        let server = self.control.resolve_destination(client).await?;
        self.session.server = Some(server);
        self.state = ConnectionState::DestinationResolved;
        debug!("[{}] original destination {}", self.session.id, server);

        let socket = TcpSocket::new_v4().map_err(SessionError::Connect)?;
        socket
            .bind(SocketAddr::new(IpAddr::V4(self.settings.external_address), 0))
            .map_err(SessionError::Connect)?;
        let local = to_endpoint(socket.local_addr().map_err(SessionError::Connect)?)?;

        self.control.register_proxy_port(client, local.port()).await?;

        let stream = socket
            .connect(SocketAddr::V4(server))
            .await
            .map_err(SessionError::Connect)?;
        self.state = ConnectionState::Connected;
        info!(
            "[{}] connected to {} from {}",
            self.session.id, server, local
        );

        Ok(stream)
    }

    /// Runs both relay directions until each has exited, then closes the session.
    ///
    /// Generic over the streams so the relay can run over in-memory pipes.
    pub async fn relay<C, S>(&mut self, client: C, server: S)
    where
        C: AsyncRead + AsyncWrite + Send + 'static,
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (client_read, client_write) = tokio::io::split(client);
        let (server_read, server_write) = tokio::io::split(server);

        let ftp_data = match (self.profile.track_ftp_data, self.session.server) {
            (true, Some(server)) => Some(FtpDataTracker::new(
                Arc::clone(&self.control),
                *server.ip(),
                self.session.id,
            )),
            _ => None,
        };

        let upstream = DirectionContext {
            session_id: self.session.id,
            direction: Direction::ClientToServer,
            framer: self.settings.framer(self.profile.framing),
            chain: self.profile.client_chain.clone(),
            ftp_data,
            idle_timeout: self.settings.idle_timeout,
            terminated: self.terminated.clone(),
        };
        let downstream = DirectionContext {
            session_id: self.session.id,
            direction: Direction::ServerToClient,
            framer: self.settings.framer(self.profile.framing),
            chain: self.profile.server_chain.clone(),
            ftp_data: None,
            idle_timeout: self.settings.idle_timeout,
            terminated: self.terminated.clone(),
        };

        self.state = ConnectionState::Relaying;
        self.session.status = SessionStatus::Active;

        let mut directions = JoinSet::new();
        directions.spawn(relay_direction(upstream, client_read, server_write));
        directions.spawn(relay_direction(downstream, server_read, client_write));

        // Both halves of each stream are dropped only once both tasks are done
        let mut failed = false;
        while let Some(joined) = directions.join_next().await {
            let report = match joined {
                Ok(report) => report,
                Err(e) => {
                    error!("[{}] relay task failed: {}", self.session.id, e);
                    failed = true;
                    continue;
                }
            };

            match &report.result {
                Ok(()) => {}
                Err(SessionError::IdleTimeout) => {
                    info!("[{}] {} idle, closing", self.session.id, report.direction);
                }
                Err(e) => {
                    warn!("[{}] {} ended: {}", self.session.id, report.direction, e);
                    failed = true;
                }
            }

            match report.direction {
                Direction::ClientToServer => self.session.client_to_server = report.stats,
                Direction::ServerToClient => self.session.server_to_client = report.stats,
            }
        }

        self.close(if failed {
            SessionStatus::Error
        } else {
            SessionStatus::Completed
        });
    }

    fn close(&mut self, status: SessionStatus) {
        self.terminated.cancel();
        self.state = ConnectionState::Closed;
        self.session.finish(status);
        self.session.log_summary();
    }
}
