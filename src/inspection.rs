//! Content inspection blades.
//!
//! A blade looks at one complete [`Message`](crate::framing::Message) and
//! returns a [`Verdict`]. Blades are pure: they perform no I/O and keep no
//! state between messages, so one instance is shared by every session of a
//! listener. Each relay direction runs an ordered [`InspectorChain`]; the first
//! blade to block wins.

pub mod chain;
pub mod command_filter;
pub mod embedded_code;
pub mod inspector;
pub mod mime_type;

pub use chain::InspectorChain;
pub use command_filter::CommandAccessFilter;
pub use embedded_code::EmbeddedCodeDetector;
pub use inspector::{ContentInspector, Verdict};
pub use mime_type::MimeTypeBlocklist;
