use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application protocols the proxy knows how to frame.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Ftp,
    Smtp,
}

impl Protocol {
    /// Port the firewall redirects this protocol's traffic to.
    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Http => 800,
            Protocol::Ftp => 210,
            Protocol::Smtp => 250,
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Http => write!(f, "HTTP"),
            Protocol::Ftp => write!(f, "FTP"),
            Protocol::Smtp => write!(f, "SMTP"),
        }
    }
}

/// Content-inspection blades selectable per service direction.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BladeKind {
    /// Embedded C source detector.
    Dlp,
    /// `Content-Type` blocklist.
    Mime,
    /// Administrative command allow/deny filter.
    Ips,
}

/// Byte order of the multi-byte fields written to the firewall control devices.
///
/// The kernel module reads the port fields in whatever order the host CPU uses,
/// so `Native` is the default. The IP fields are always network order.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Native,
    Little,
    Big,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    Whitelist,
    #[default]
    Blacklist,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallConfig {
    /// Program and arguments printing the firewall connection table
    pub connection_table_command: Vec<String>,
    /// Device receiving `client ip | client port | proxy port` registrations
    pub proxy_port_device: PathBuf,
    /// Device receiving `client ip | server ip | data port` registrations
    pub ftp_data_device: PathBuf,
    pub byte_order: ByteOrder,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            connection_table_command: vec!["../user/main".to_string(), "show_conns".to_string()],
            proxy_port_device: PathBuf::from("/sys/class/fw/proxy/set_port"),
            ftp_data_device: PathBuf::from("/sys/class/fw/proxy/add_ftp"),
            byte_order: ByteOrder::Native,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Size of a single socket read
    pub read_chunk_size: usize,
    /// Upper bound on a single framed message
    pub max_message_bytes: usize,
    /// Seconds a direction may wait for data before ending. `0` disables the timeout
    pub idle_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: 4096,
            max_message_bytes: 1024 * 1024,
            idle_timeout_secs: 0,
        }
    }
}

/// Thresholds of the embedded code detector.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DlpThresholds {
    /// Minimum run of consecutive suspicious fragments forming a block
    pub block_size_min: usize,
    /// Below this many suspicious fragments the payload is always allowed
    pub lines_min_to_judge: usize,
    pub blocks_min: usize,
    pub lines_amount_min: usize,
    pub frac_min: f64,
}

impl Default for DlpThresholds {
    fn default() -> Self {
        Self {
            block_size_min: 3,
            lines_min_to_judge: 20,
            blocks_min: 5,
            lines_amount_min: 100,
            frac_min: 0.25,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IpsConfig {
    pub mode: FilterMode,
    pub commands: Vec<String>,
}

impl Default for IpsConfig {
    fn default() -> Self {
        let commands = [
            "conf", "cons", "crst", "envi", "ruok", "srst", "srvr", "stat", "wchs", "dirs", "wchp",
            "mntr",
        ];
        Self {
            mode: FilterMode::Blacklist,
            commands: commands.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// One proxied service: a listener port plus the blade chain of each direction.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub protocol: Protocol,
    pub port: u16,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Blades applied to client -> server messages, in order
    #[serde(default)]
    pub client_blades: Vec<BladeKind>,
    /// Blades applied to server -> client messages, in order
    #[serde(default)]
    pub server_blades: Vec<BladeKind>,
}

fn enabled_by_default() -> bool {
    true
}

impl ServiceConfig {
    /// Service definition matching the stock deployment for `protocol`.
    pub fn standard(protocol: Protocol) -> Self {
        let (client_blades, server_blades) = match protocol {
            Protocol::Http => (vec![BladeKind::Dlp], vec![BladeKind::Mime]),
            Protocol::Ftp => (vec![], vec![]),
            Protocol::Smtp => (vec![BladeKind::Dlp], vec![BladeKind::Dlp]),
        };
        Self {
            name: protocol.to_string().to_lowercase(),
            protocol,
            port: protocol.default_port(),
            enabled: true,
            client_blades,
            server_blades,
        }
    }
}
