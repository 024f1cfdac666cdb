use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::message::{parse_header_fields, Message};
use crate::configuration::types::Protocol;
use crate::error_handling::types::FramingError;

const HEADER_SEPARATOR: &[u8] = b"\r\n\r\n";
const LINE_SEPARATOR: &[u8] = b"\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingMode {
    /// Header block terminated by a blank line, optionally followed by a
    /// `Content-Length` delimited body.
    HeaderBody,
    /// CRLF terminated command/response lines.
    Line,
}

impl FramingMode {
    pub fn for_protocol(protocol: Protocol) -> Self {
        match protocol {
            Protocol::Http => FramingMode::HeaderBody,
            Protocol::Ftp | Protocol::Smtp => FramingMode::Line,
        }
    }
}

/// Reassembles messages from one direction of a session.
///
/// The framer owns the bytes read past the end of the previous message, so one
/// framer must be used per stream for the whole life of that stream.
pub struct MessageFramer {
    mode: FramingMode,
    buffer: Vec<u8>,
    chunk: Vec<u8>,
    max_message_bytes: usize,
    /// Prefix of `buffer` already searched for a separator
    scanned: usize,
    eof: bool,
}

impl MessageFramer {
    pub fn new(mode: FramingMode, read_chunk_size: usize, max_message_bytes: usize) -> Self {
        Self {
            mode,
            buffer: Vec::new(),
            chunk: vec![0u8; read_chunk_size.max(1)],
            max_message_bytes,
            scanned: 0,
            eof: false,
        }
    }

    pub fn mode(&self) -> FramingMode {
        self.mode
    }

    /// Reads from `reader` until one complete message is available.
    ///
    /// Once the peer has closed the stream, bytes of an unfinished header or
    /// line are returned as a last opaque message, then `Ok(None)` follows.
    ///
    /// # Errors
    /// - [`FramingError::ShortRead`] if the peer closes inside a declared body
    /// - [`FramingError::MessageTooLarge`] if the message would exceed the limit
    /// - [`FramingError::MalformedHeader`] for an unparsable `Content-Length`
    /// - [`FramingError::Io`] for read failures
    pub async fn next_message<R>(&mut self, reader: &mut R) -> Result<Option<Message>, FramingError>
    where
        R: AsyncRead + Unpin,
    {
        match self.mode {
            FramingMode::HeaderBody => self.next_http_message(reader).await,
            FramingMode::Line => self.next_lines(reader).await,
        }
    }

    async fn next_http_message<R>(&mut self, reader: &mut R) -> Result<Option<Message>, FramingError>
    where
        R: AsyncRead + Unpin,
    {
        let separator_at = loop {
            let from = self.scanned.saturating_sub(HEADER_SEPARATOR.len() - 1);
            if let Some(pos) = find_from(&self.buffer, HEADER_SEPARATOR, from) {
                break pos;
            }
            self.scanned = self.buffer.len();
            if self.fill(reader).await? == 0 {
                return Ok(self.closed());
            }
        };

        let header_len = separator_at + HEADER_SEPARATOR.len();
        let block = String::from_utf8_lossy(&self.buffer[..separator_at]).into_owned();
        let headers = parse_header_fields(&block);

        let content_length = match headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("Content-Length"))
        {
            Some((_, value)) => Some(value.parse::<usize>().map_err(|_| {
                FramingError::MalformedHeader(format!("invalid Content-Length {:?}", value))
            })?),
            None => None,
        };

        let total = match content_length {
            Some(length) => {
                let total = header_len.saturating_add(length);
                if total > self.max_message_bytes {
                    return Err(FramingError::MessageTooLarge(self.max_message_bytes));
                }
                while self.buffer.len() < total {
                    if self.fill(reader).await? == 0 {
                        return Err(FramingError::ShortRead {
                            expected: length,
                            received: self.buffer.len() - header_len,
                        });
                    }
                }
                total
            }
            // Without a declared length the message is whatever arrived with the header
            None => self.buffer.len(),
        };

        let raw: Vec<u8> = self.buffer.drain(..total).collect();
        self.scanned = 0;
        debug!(
            "framed HTTP message: {} header bytes, {} body bytes, {} bytes pending",
            header_len,
            raw.len() - header_len,
            self.buffer.len()
        );
        Ok(Some(Message::new(raw, header_len, headers)))
    }

    async fn next_lines<R>(&mut self, reader: &mut R) -> Result<Option<Message>, FramingError>
    where
        R: AsyncRead + Unpin,
    {
        let end = loop {
            let from = self.scanned.saturating_sub(LINE_SEPARATOR.len() - 1);
            if let Some(pos) = rfind_from(&self.buffer, LINE_SEPARATOR, from) {
                break pos + LINE_SEPARATOR.len();
            }
            self.scanned = self.buffer.len();
            if self.fill(reader).await? == 0 {
                return Ok(self.closed());
            }
        };

        let raw: Vec<u8> = self.buffer.drain(..end).collect();
        self.scanned = 0;
        debug!(
            "framed {} line bytes, {} bytes pending",
            raw.len(),
            self.buffer.len()
        );
        Ok(Some(Message::opaque(raw)))
    }

    /// One read into the pending buffer. Returns the number of bytes read.
    async fn fill<R>(&mut self, reader: &mut R) -> Result<usize, FramingError>
    where
        R: AsyncRead + Unpin,
    {
        if self.eof {
            return Ok(0);
        }
        if self.buffer.len() >= self.max_message_bytes {
            return Err(FramingError::MessageTooLarge(self.max_message_bytes));
        }

        let n = reader.read(&mut self.chunk).await?;
        if n == 0 {
            self.eof = true;
        }
        self.buffer.extend_from_slice(&self.chunk[..n]);

        let preview = &self.chunk[..std::cmp::min(n, 64)];
        trace!(
            "read {} bytes: {}{}",
            n,
            String::from_utf8_lossy(preview),
            if n > 64 { " ..." } else { "" }
        );
        Ok(n)
    }

    /// Remaining bytes after the peer closed, passed on as they are.
    fn closed(&mut self) -> Option<Message> {
        self.scanned = 0;
        if self.buffer.is_empty() {
            return None;
        }
        debug!(
            "peer closed with {} unframed bytes, passing them as a final message",
            self.buffer.len()
        );
        Some(Message::opaque(std::mem::take(&mut self.buffer)))
    }
}

/// First occurrence of `needle` starting at or after `from`.
fn find_from(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

/// Last occurrence of `needle` starting at or after `from`.
fn rfind_from(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .rposition(|window| window == needle)
        .map(|pos| pos + from)
}
