//! Member sessions.
//!
//! A session is one connected participant. It owns two pumps:
//!
//! - the read pump turns inbound text frames into [`Inbound`] messages for
//!   the room and, when the connection dies, asks the room to remove it;
//! - the write pump drains the member's delivery channel onto the
//!   connection and keeps it alive with pings.
//!
//! [`run`] drives both pumps for one connection. Whichever side fails
//! first ends the session, and the room hears exactly one leave.
//!
//! The room never touches the connection directly. It holds the
//! [`MemberHandle`] (the sending half of the delivery channel); dropping that
//! handle is how a removed member's connection gets closed.

use std::{fmt, time::Duration};

use axum::extract::ws::Message as WsMessage;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    time::{Instant, interval_at, timeout},
};
use votr_core::{Inbound, SessionId};
use votr_proto::Message;

use crate::room::Membership;

/// Keepalive and buffering settings for member sessions.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Interval between pings sent to the client
    pub ping_interval: Duration,
    /// Maximum silence from the client before the session is dropped.
    /// Any inbound frame, pongs included, restarts the deadline.
    pub read_timeout: Duration,
    /// Maximum time a single frame write may take
    pub write_timeout: Duration,
    /// Largest inbound frame accepted, in bytes
    pub max_message_size: usize,
    /// Outbound messages buffered per member before new ones are dropped
    pub delivery_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(10),
            read_timeout: Duration::from_secs(20),
            write_timeout: Duration::from_secs(10),
            max_message_size: 512,
            delivery_capacity: 32,
        }
    }
}

/// Why a message could not be handed to a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// Member's buffer is full; this message is dropped for this member only
    Full,
    /// Member's write pump is gone
    Closed,
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("delivery buffer full"),
            Self::Closed => f.write_str("delivery channel closed"),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// Room-side handle of a member: its id and the sending half of its
/// delivery channel.
///
/// Deliberately not `Clone`. The room holds the only sender, so removing the
/// member from the room closes the channel and ends its write pump.
#[derive(Debug)]
pub struct MemberHandle {
    id: SessionId,
    delivery: mpsc::Sender<Message>,
}

impl MemberHandle {
    /// Session this handle delivers to.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Queue `message` for this member without waiting.
    ///
    /// A slow member never stalls the caller: when its buffer is full the
    /// message is refused instead.
    pub fn deliver(&self, message: Message) -> Result<(), DeliveryError> {
        self.delivery.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Receiving half of a member's delivery channel, drained by the write pump.
#[derive(Debug)]
pub struct Outbox {
    id: SessionId,
    receiver: mpsc::Receiver<Message>,
}

impl Outbox {
    /// Session this outbox belongs to.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Next delivered message, `None` once the room dropped the member.
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }
}

/// Create the delivery channel for session `id`.
///
/// The channel exists before the member is registered anywhere, so no
/// broadcast can target a member that has nowhere to receive it.
pub fn channel(id: SessionId, capacity: usize) -> (MemberHandle, Outbox) {
    let (delivery, receiver) = mpsc::channel(capacity.max(1));
    (MemberHandle { id, delivery }, Outbox { id, receiver })
}

/// Forward inbound frames to the room until the connection ends.
///
/// Text frames are decoded and sent to `incoming`; malformed ones are logged
/// and skipped. Ping, pong and binary frames only restart the read deadline.
/// On close, error, or deadline expiry exactly one `Leave` is sent to
/// `membership`.
pub async fn read_pump<S>(
    id: SessionId,
    mut stream: S,
    incoming: mpsc::Sender<Inbound>,
    membership: mpsc::Sender<Membership>,
    config: SessionConfig,
) where
    S: Stream<Item = Result<WsMessage, axum::Error>> + Unpin,
{
    loop {
        let frame = match timeout(config.read_timeout, stream.next()).await {
            Ok(Some(Ok(frame))) => frame,
            Ok(Some(Err(e))) => {
                tracing::debug!(session_id = %id, "Read error: {}", e);
                break;
            },
            Ok(None) => {
                tracing::debug!(session_id = %id, "Connection closed by peer");
                break;
            },
            Err(_) => {
                tracing::debug!(session_id = %id, "Read deadline expired");
                break;
            },
        };

        match frame {
            WsMessage::Text(text) => match Message::decode_limited(&text, config.max_message_size) {
                Ok(message) => {
                    if incoming.send(Inbound::new(id, message)).await.is_err() {
                        tracing::warn!(session_id = %id, "Room is gone");
                        break;
                    }
                },
                Err(e) => tracing::debug!(session_id = %id, "Dropping frame: {}", e),
            },
            WsMessage::Close(_) => {
                tracing::debug!(session_id = %id, "Close frame received");
                break;
            },
            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Binary(_) => {},
        }
    }

    let _ = membership.send(Membership::Leave(id)).await;
}

/// Write delivered messages and keepalive pings until the room drops the
/// member or a write fails.
pub async fn write_pump<S>(mut outbox: Outbox, mut sink: S, config: SessionConfig)
where
    S: Sink<WsMessage> + Unpin,
    S::Error: fmt::Display,
{
    let id = outbox.id;
    let mut ticker = interval_at(Instant::now() + config.ping_interval, config.ping_interval);

    loop {
        let frame = tokio::select! {
            delivered = outbox.recv() => match delivered {
                Some(message) => match message.encode() {
                    Ok(text) => WsMessage::Text(text),
                    Err(e) => {
                        tracing::warn!(session_id = %id, "Encode error: {}", e);
                        continue;
                    },
                },
                None => {
                    tracing::debug!(session_id = %id, "Removed from room, closing connection");
                    let _ = timeout(config.write_timeout, sink.send(WsMessage::Close(None))).await;
                    return;
                },
            },
            _ = ticker.tick() => {
                tracing::trace!(session_id = %id, "Ping");
                WsMessage::Ping(Vec::new())
            },
        };

        match timeout(config.write_timeout, sink.send(frame)).await {
            Ok(Ok(())) => {},
            Ok(Err(e)) => {
                tracing::debug!(session_id = %id, "Write error: {}", e);
                return;
            },
            Err(_) => {
                tracing::debug!(session_id = %id, "Write deadline expired");
                return;
            },
        }
    }
}

/// Run both pumps of one connection until the session ends.
///
/// If the read side ends first it has already asked the room to remove the
/// member; the write pump then finishes once the room drops the member's
/// handle, sending a close frame. If the write side ends first (write error
/// or deadline) the connection is dead, so the read pump is dropped and the
/// leave is sent here instead of after the read deadline.
pub async fn run<Si, St>(
    outbox: Outbox,
    sink: Si,
    stream: St,
    incoming: mpsc::Sender<Inbound>,
    membership: mpsc::Sender<Membership>,
    config: SessionConfig,
) where
    Si: Sink<WsMessage> + Unpin,
    Si::Error: fmt::Display,
    St: Stream<Item = Result<WsMessage, axum::Error>> + Unpin,
{
    let id = outbox.id;
    let reader = read_pump(id, stream, incoming, membership.clone(), config);
    let writer = write_pump(outbox, sink, config);
    tokio::pin!(reader, writer);

    let write_side_ended = tokio::select! {
        () = &mut reader => false,
        () = &mut writer => true,
    };

    if write_side_ended {
        tracing::debug!(session_id = %id, "Connection lost on write, leaving room");
        let _ = membership.send(Membership::Leave(id)).await;
    } else {
        writer.await;
    }
}
