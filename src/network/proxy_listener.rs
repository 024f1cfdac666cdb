use log::{debug, error, info, warn};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error_handling::types::NetworkError;
use crate::firewall::{to_endpoint, FirewallControl};
use crate::session_management::{ProtocolProfile, ProxyConnection, SessionSettings};

/// Accepts redirected connections for one protocol and spawns a
/// [`ProxyConnection`] per accepted socket.
///
/// Sessions get child tokens of the listener's `shutdown` token, so cancelling
/// it stops the accept loop and every live session of this listener.
pub struct ProxyListener {
    listener: TcpListener,
    profile: ProtocolProfile,
    control: Arc<dyn FirewallControl>,
    settings: SessionSettings,
    shutdown: CancellationToken,
}

impl ProxyListener {
    /// Binds `address:port`. Port `0` picks an ephemeral port.
    pub async fn bind(
        address: IpAddr,
        port: u16,
        profile: ProtocolProfile,
        control: Arc<dyn FirewallControl>,
        settings: SessionSettings,
        shutdown: CancellationToken,
    ) -> Result<Self, NetworkError> {
        let listener = TcpListener::bind(SocketAddr::new(address, port))
            .await
            .map_err(NetworkError::BindError)?;
        info!(
            "{} proxy listening on {}:{}",
            profile.protocol, address, port
        );

        Ok(Self {
            listener,
            profile,
            control,
            settings,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, NetworkError> {
        self.listener.local_addr().map_err(NetworkError::BindError)
    }

    /// Accept loop. Returns once the shutdown token is cancelled and every
    /// session spawned by this listener has ended.
    pub async fn serve(self) {
        let protocol = self.profile.protocol;
        let mut sessions = JoinSet::new();

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!("{} accept failed: {}", protocol, e);
                            continue;
                        }
                    };
                    let client = match to_endpoint(peer) {
                        Ok(client) => client,
                        Err(e) => {
                            warn!("{} rejecting {}: {}", protocol, peer, e);
                            continue;
                        }
                    };

                    let connection = ProxyConnection::new(
                        client,
                        self.profile.clone(),
                        Arc::clone(&self.control),
                        self.settings.clone(),
                        &self.shutdown,
                    );
                    debug!("[{}] spawning {} session", connection.id(), protocol);
                    sessions.spawn(connection.run(stream));
                }
                Some(finished) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = finished {
                        error!("{} session task failed: {}", protocol, e);
                    }
                }
            }
        }

        info!(
            "{} listener stopping, waiting for {} sessions",
            protocol,
            sessions.len()
        );
        while let Some(finished) = sessions.join_next().await {
            if let Err(e) = finished {
                error!("{} session task failed: {}", protocol, e);
            }
        }
        info!("{} listener stopped", protocol);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::types::{Protocol, ServiceConfig};
    use crate::configuration::Config;
    use crate::error_handling::types::FirewallError;
    use crate::firewall::Endpoint;
    use async_trait::async_trait;
    use std::net::Ipv4Addr;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    /// Sends every client to the same server.
    struct FixedDestination {
        server: Endpoint,
        registered: Mutex<Vec<u16>>,
    }

    #[async_trait]
    impl FirewallControl for FixedDestination {
        async fn resolve_destination(&self, _client: Endpoint) -> Result<Endpoint, FirewallError> {
            Ok(self.server)
        }

        async fn register_proxy_port(
            &self,
            _client: Endpoint,
            proxy_port: u16,
        ) -> Result<(), FirewallError> {
            self.registered.lock().unwrap().push(proxy_port);
            Ok(())
        }

        async fn register_ftp_data_channel(
            &self,
            _client_ip: Ipv4Addr,
            _server_ip: Ipv4Addr,
            _data_port: u16,
        ) -> Result<(), FirewallError> {
            Ok(())
        }
    }

    async fn listener(
        server: Endpoint,
        shutdown: CancellationToken,
    ) -> (ProxyListener, Arc<FixedDestination>) {
        let mut config = Config::default();
        config.external_address = Ipv4Addr::LOCALHOST;
        let control = Arc::new(FixedDestination {
            server,
            registered: Mutex::new(Vec::new()),
        });
        let profile =
            ProtocolProfile::from_service(&ServiceConfig::standard(Protocol::Smtp), &config);

        let listener = ProxyListener::bind(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            0,
            profile,
            control.clone(),
            SessionSettings::from_config(&config),
            shutdown,
        )
        .await
        .unwrap();
        (listener, control)
    }

    #[tokio::test]
    async fn test_bind_conflict() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        let config = Config::default();

        let result = ProxyListener::bind(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            port,
            ProtocolProfile::from_service(&ServiceConfig::standard(Protocol::Http), &config),
            Arc::new(FixedDestination {
                server: "127.0.0.1:1".parse().unwrap(),
                registered: Mutex::new(Vec::new()),
            }),
            SessionSettings::from_config(&config),
            CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(NetworkError::BindError(_))));
    }

    #[tokio::test]
    async fn test_serves_concurrent_sessions_and_shuts_down() {
        let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server_addr = to_endpoint(server.local_addr().unwrap()).unwrap();
        let shutdown = CancellationToken::new();
        let (listener, control) = listener(server_addr, shutdown.clone()).await;
        let proxy_addr = listener.local_addr().unwrap();
        let serving = tokio::spawn(listener.serve());

        let mut clients = Vec::new();
        let mut upstreams = Vec::new();
        for _ in 0..2 {
            clients.push(TcpStream::connect(proxy_addr).await.unwrap());
            upstreams.push(server.accept().await.unwrap().0);
        }
        assert_eq!(control.registered.lock().unwrap().len(), 2);

        for (i, upstream) in upstreams.iter_mut().enumerate() {
            upstream
                .write_all(format!("220 server {}\r\n", i).as_bytes())
                .await
                .unwrap();
        }
        let mut greetings = Vec::new();
        for client in clients.iter_mut() {
            let mut buf = [0u8; 64];
            let n = client.read(&mut buf).await.unwrap();
            greetings.push(String::from_utf8_lossy(&buf[..n]).into_owned());
        }
        greetings.sort();
        assert_eq!(greetings, vec!["220 server 0\r\n", "220 server 1\r\n"]);

        shutdown.cancel();
        serving.await.unwrap();

        // sessions were closed towards both peers
        for client in clients.iter_mut() {
            let mut rest = Vec::new();
            assert_eq!(client.read_to_end(&mut rest).await.unwrap(), 0);
        }
    }
}
