//! Message framing.
//!
//! A [`MessageFramer`] turns the byte stream of one relay direction into whole
//! application messages. Two disciplines exist:
//!
//! - [`FramingMode::HeaderBody`] (HTTP): read up to the blank line ending the
//!   header block, then exactly `Content-Length` body bytes when the header declares one.
//! - [`FramingMode::Line`] (FTP, SMTP): read until at least one CRLF terminated line
//!   is available and yield every complete line as a single blob.
//!
//! A message is never yielded before it is complete. Bytes left unframed when
//! the peer closes are yielded once as a final opaque message.

pub mod framer;
pub mod message;

pub use framer::{FramingMode, MessageFramer};
pub use message::Message;
