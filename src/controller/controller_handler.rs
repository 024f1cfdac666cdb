use log::{error, info, warn};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::configuration::Config;
use crate::error_handling::types::*;
use crate::firewall::{FirewallControl, SysfsFirewall};
use crate::network::ProxyListener;
use crate::session_management::{ProtocolProfile, SessionSettings};

/// Top level orchestrator: binds one listener per enabled service and runs
/// them until a shutdown is requested.
pub struct Controller {
    pub config: Config,
    control: Arc<dyn FirewallControl>,
    shutdown: CancellationToken,
}

impl Controller {
    /// Validates `config` and prepares the firewall control plane it describes.
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        let control = Arc::new(SysfsFirewall::new(&config.firewall));
        Self::with_control(config, control)
    }

    /// Same as [`Controller::new`] with a caller supplied control plane.
    pub fn with_control(
        config: Config,
        control: Arc<dyn FirewallControl>,
    ) -> Result<Self, ControllerError> {
        config.validate().map_err(|e| {
            error!("Invalid configuration: {}", e);
            ControllerError::ConfigurationError(e)
        })?;

        Ok(Self {
            config,
            control,
            shutdown: CancellationToken::new(),
        })
    }

    /// Token cancelling every listener and session when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Binds every enabled service. Fails without serving anything if one of
    /// the ports cannot be bound.
    pub async fn bind_listeners(&self) -> Result<Vec<ProxyListener>, ControllerError> {
        let settings = SessionSettings::from_config(&self.config);
        let mut listeners = Vec::new();

        for service in self.config.enabled_services() {
            let profile = ProtocolProfile::from_service(service, &self.config);
            info!(
                "Service {} ({}): client blades {:?}, server blades {:?}",
                service.name,
                service.protocol,
                profile.client_chain.names(),
                profile.server_chain.names()
            );

            let listener = ProxyListener::bind(
                IpAddr::V4(self.config.internal_address),
                service.port,
                profile,
                Arc::clone(&self.control),
                settings.clone(),
                self.shutdown.child_token(),
            )
            .await?;
            listeners.push(listener);
        }

        Ok(listeners)
    }

    /// Runs all listeners until Ctrl-C or until the shutdown token is
    /// cancelled, then waits for every session to end.
    pub async fn run(&self) -> Result<(), ControllerError> {
        let listeners = self.bind_listeners().await?;
        if listeners.is_empty() {
            return Err(ControllerError::InitializationFailed(
                "no listener could be started".to_string(),
            ));
        }

        let mut serving = JoinSet::new();
        for listener in listeners {
            serving.spawn(listener.serve());
        }
        info!("Proxy running with {} listeners", serving.len());

        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!("Unable to listen for the shutdown signal: {}", e);
                }
                info!("Shutdown requested");
            }
            _ = self.shutdown.cancelled() => {}
        }
        self.shutdown.cancel();

        while let Some(finished) = serving.join_next().await {
            if let Err(e) = finished {
                error!("Listener task failed: {}", e);
            }
        }
        info!("All listeners stopped");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::types::{Protocol, ServiceConfig};
    use std::net::Ipv4Addr;
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn local_config(ports: &[(Protocol, u16)]) -> Config {
        let mut config = Config::default();
        config.internal_address = Ipv4Addr::LOCALHOST;
        config.external_address = Ipv4Addr::LOCALHOST;
        config.services = ports
            .iter()
            .map(|(protocol, port)| ServiceConfig {
                port: *port,
                ..ServiceConfig::standard(*protocol)
            })
            .collect();
        config
    }

    /// Two distinct ports nothing listens on.
    async fn free_ports() -> (u16, u16) {
        let a = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let b = TcpListener::bind("127.0.0.1:0").await.unwrap();
        (a.local_addr().unwrap().port(), b.local_addr().unwrap().port())
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        let mut config = Config::default();
        config.services.clear();
        assert!(matches!(
            Controller::new(config),
            Err(ControllerError::ConfigurationError(ConfigError::ServicesEmpty(_)))
        ));
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let controller = Controller::new(local_config(&[(Protocol::Http, port)])).unwrap();
        assert!(matches!(
            controller.run().await,
            Err(ControllerError::NetworkError(NetworkError::BindError(_)))
        ));
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let (http, ftp) = free_ports().await;
        let config = local_config(&[(Protocol::Http, http), (Protocol::Ftp, ftp)]);
        let controller = Arc::new(Controller::new(config).unwrap());
        assert_eq!(controller.bind_listeners().await.unwrap().len(), 2);

        let shutdown = controller.shutdown_token();
        let running = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.run().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
