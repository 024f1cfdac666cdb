use std::fmt;
use std::net::{SocketAddr, SocketAddrV4};
use std::path::PathBuf;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    ServicesEmpty(String),
    NotInRange(String),
    DuplicatePort(u16),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::ServicesEmpty(e) => write!(f, "Services configuration error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
            ConfigError::DuplicatePort(p) => write!(f, "Port {} is used by more than one service", p),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::TomlError(err.to_string())
    }
}

/// Failures talking to the firewall control plane.
#[derive(Debug)]
pub enum FirewallError {
    /// No connection-table row matches the client endpoint.
    DestinationNotFound(SocketAddrV4),
    /// The connection-table query could not be run or exited unsuccessfully.
    CommandFailed(String),
    /// A control device could not be opened or written.
    DeviceWrite { path: PathBuf, source: std::io::Error },
    /// The firewall only tracks IPv4 connections.
    UnsupportedAddress(SocketAddr),
}

impl fmt::Display for FirewallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FirewallError::DestinationNotFound(client) => {
                write!(f, "No firewall record for client {}", client)
            }
            FirewallError::CommandFailed(e) => write!(f, "Connection table query failed: {}", e),
            FirewallError::DeviceWrite { path, source } => {
                write!(f, "Control device {} write failed: {}", path.display(), source)
            }
            FirewallError::UnsupportedAddress(addr) => {
                write!(f, "Unsupported (non IPv4) address: {}", addr)
            }
        }
    }
}

impl std::error::Error for FirewallError {}

#[derive(Debug)]
pub enum FramingError {
    /// Peer closed before the declared message length was received.
    ShortRead { expected: usize, received: usize },
    MalformedHeader(String),
    MessageTooLarge(usize),
    Io(std::io::Error),
}

impl fmt::Display for FramingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramingError::ShortRead { expected, received } => write!(
                f,
                "Short read: expected {} bytes, peer closed after {}",
                expected, received
            ),
            FramingError::MalformedHeader(e) => write!(f, "Malformed header: {}", e),
            FramingError::MessageTooLarge(limit) => {
                write!(f, "Message exceeds the {} byte limit", limit)
            }
            FramingError::Io(e) => write!(f, "Framing IO error: {}", e),
        }
    }
}

impl std::error::Error for FramingError {}

impl From<std::io::Error> for FramingError {
    fn from(err: std::io::Error) -> Self {
        FramingError::Io(err)
    }
}

#[derive(Debug)]
pub enum SessionError {
    Firewall(FirewallError),
    Connect(std::io::Error),
    Framing(FramingError),
    Io(std::io::Error),
    IdleTimeout,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Firewall(e) => write!(f, "Firewall error: {}", e),
            SessionError::Connect(e) => write!(f, "Server connection failed: {}", e),
            SessionError::Framing(e) => write!(f, "Framing error: {}", e),
            SessionError::Io(e) => write!(f, "Session IO error: {}", e),
            SessionError::IdleTimeout => write!(f, "Session idle timeout"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<FirewallError> for SessionError {
    fn from(err: FirewallError) -> Self {
        SessionError::Firewall(err)
    }
}

impl From<FramingError> for SessionError {
    fn from(err: FramingError) -> Self {
        SessionError::Framing(err)
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Io(err)
    }
}

#[derive(Debug)]
pub enum NetworkError {
    BindError(std::io::Error),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::BindError(e) => write!(f, "Network bind error: {}", e),
        }
    }
}

impl std::error::Error for NetworkError {}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    NetworkError(NetworkError),
    InitializationFailed(String),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::NetworkError(e) => write!(f, "Network error: {}", e),
            ControllerError::InitializationFailed(e) => write!(f, "Initialization failed: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<NetworkError> for ControllerError {
    fn from(err: NetworkError) -> Self {
        ControllerError::NetworkError(err)
    }
}
