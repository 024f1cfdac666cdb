pub mod configuration;
pub mod controller;
pub mod error_handling;
pub mod firewall;
pub mod framing;
pub mod inspection;
pub mod network;
pub mod session_management;
