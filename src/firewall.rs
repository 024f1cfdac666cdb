//! Firewall control plane.
//!
//! The packet filter redirects client connections to the proxy listeners and keeps
//! a table of the connections it tracks. The proxy talks to it through three
//! primitives, grouped in the [`FirewallControl`] trait:
//!
//! - resolving the real destination of a redirected client from the connection table
//! - registering the source port of the server-side socket so the firewall can NAT it
//! - announcing the data channel of an active-mode FTP session
//!
//! [`SysfsFirewall`] implements them on top of the firewall's user-space listing
//! command and its two write-only sysfs attributes.

pub mod connection_table;
pub mod control_port;
pub mod sysfs;
pub mod types;
pub mod wire;

pub use control_port::FirewallControl;
pub use sysfs::SysfsFirewall;
pub use types::{to_endpoint, Endpoint, FirewallRecord};
