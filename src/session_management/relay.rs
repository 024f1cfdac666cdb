use log::{debug, trace, warn};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::ftp_data::FtpDataTracker;
use crate::error_handling::types::SessionError;
use crate::framing::{Message, MessageFramer};
use crate::inspection::{InspectorChain, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ClientToServer => write!(f, "client->server"),
            Direction::ServerToClient => write!(f, "server->client"),
        }
    }
}

/// Per direction counters kept in the session record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirectionStats {
    pub messages_forwarded: u64,
    pub messages_blocked: u64,
    pub bytes_forwarded: u64,
}

/// Everything one direction task needs besides its two stream halves.
pub struct DirectionContext {
    pub session_id: Uuid,
    pub direction: Direction,
    pub framer: MessageFramer,
    pub chain: InspectorChain,
    /// Only set for the client -> server direction of FTP sessions
    pub ftp_data: Option<FtpDataTracker>,
    pub idle_timeout: Option<Duration>,
    /// Shared by both directions of the session
    pub terminated: CancellationToken,
}

/// Outcome of a finished direction task.
#[derive(Debug)]
pub struct DirectionReport {
    pub direction: Direction,
    pub stats: DirectionStats,
    pub result: Result<(), SessionError>,
}

/// Frames, inspects and forwards messages from `reader` to `writer` until the
/// peer closes, an error occurs, or the session is terminated.
///
/// Whatever the reason, the shared `terminated` token is cancelled on exit so
/// the opposite direction stops too, and `writer` is shut down.
pub async fn relay_direction<R, W>(
    mut ctx: DirectionContext,
    mut reader: R,
    mut writer: W,
) -> DirectionReport
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut stats = DirectionStats::default();

    let result = loop {
        let next = tokio::select! {
            _ = ctx.terminated.cancelled() => None,
            next = read_message(&mut ctx.framer, &mut reader, ctx.idle_timeout) => Some(next),
        };

        let message = match next {
            None => {
                debug!("[{}] {} terminated", ctx.session_id, ctx.direction);
                break Ok(());
            }
            Some(Ok(Some(message))) => message,
            Some(Ok(None)) => {
                debug!("[{}] {} peer closed", ctx.session_id, ctx.direction);
                break Ok(());
            }
            Some(Err(e)) => break Err(e),
        };

        if let Verdict::Block(reason) = ctx.chain.evaluate(&message) {
            warn!(
                "[{}] {} dropped {} byte message: {}",
                ctx.session_id,
                ctx.direction,
                message.len(),
                reason
            );
            stats.messages_blocked += 1;
            continue;
        }

        if let Some(tracker) = &ctx.ftp_data {
            if let Err(e) = tracker.register_announced(&message.text()).await {
                break Err(e.into());
            }
        }

        trace!(
            "[{}] {} forwarding {:?}",
            ctx.session_id,
            ctx.direction,
            String::from_utf8_lossy(&message.raw()[..message.len().min(64)])
        );
        if let Err(e) = writer.write_all(message.raw()).await {
            break Err(SessionError::Io(e));
        }
        stats.messages_forwarded += 1;
        stats.bytes_forwarded += message.len() as u64;
    };

    ctx.terminated.cancel();
    if let Err(e) = writer.shutdown().await {
        trace!("[{}] {} shutdown: {}", ctx.session_id, ctx.direction, e);
    }

    DirectionReport {
        direction: ctx.direction,
        stats,
        result,
    }
}

async fn read_message<R>(
    framer: &mut MessageFramer,
    reader: &mut R,
    idle_timeout: Option<Duration>,
) -> Result<Option<Message>, SessionError>
where
    R: AsyncRead + Unpin,
{
    match idle_timeout {
        Some(limit) => match tokio::time::timeout(limit, framer.next_message(reader)).await {
            Ok(next) => Ok(next?),
            Err(_) => Err(SessionError::IdleTimeout),
        },
        None => Ok(framer.next_message(reader).await?),
    }
}
