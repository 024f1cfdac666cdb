//! Session management core module.
//!
//! One [`ProxyConnection`] drives one intercepted client connection through
//! destination resolution, server connection, and the two relay directions.
//! The protocol specific parts (framing discipline, blade chains, FTP data
//! channel tracking) come from a [`ProtocolProfile`] chosen per listener.

use serde::{Deserialize, Serialize};

pub mod ftp_data;
pub mod profile;
pub mod proxy_connection;
pub mod relay;
pub mod session;

pub use profile::{ProtocolProfile, SessionSettings};
pub use proxy_connection::{ConnectionState, ProxyConnection};
pub use relay::{Direction, DirectionStats};
pub use session::Session;

/// Represents the current status of a session.
///
/// Variants:
/// - `Pending`: accepted, server side not connected yet.
/// - `Active`: both relay directions are running.
/// - `Completed`: both directions ended normally.
/// - `Error`: setup failed or a direction ended with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Pending,
    Active,
    Completed,
    Error,
}
