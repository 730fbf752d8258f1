//! WebSocket connection to a blackjack room.
//!
//! A [`Connection`] owns one socket split into a reader task and a writer
//! task. Decoded snapshots and the final closure are delivered on a single
//! unbounded channel, so the consumer sees them strictly in arrival order.

use blackjack::{ClientAction, ParticipantId, Snapshot, messages};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Characters escaped inside a single URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Error, Eq, PartialEq)]
pub enum JoinError {
    #[error("Enter your name!")]
    MissingName,

    #[error("Enter a room ID!")]
    MissingRoom,
}

/// A validated `(room, name)` pair to join.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JoinTarget {
    name: ParticipantId,
    room: String,
}

impl JoinTarget {
    /// Trim and validate user input. Nothing touches the network here.
    pub fn new(name: &str, room: &str) -> Result<Self, JoinError> {
        let name = name.trim();
        let room = room.trim();
        if name.is_empty() {
            return Err(JoinError::MissingName);
        }
        if room.is_empty() {
            return Err(JoinError::MissingRoom);
        }
        Ok(Self {
            name: ParticipantId::new(name),
            room: room.to_string(),
        })
    }

    pub fn name(&self) -> &ParticipantId {
        &self.name
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    /// Room endpoint below `base_url`, e.g. `ws://host:8000/ws/<room>/<name>`.
    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/ws/{}/{}",
            base_url.trim_end_matches('/'),
            utf8_percent_encode(&self.room, PATH_SEGMENT),
            utf8_percent_encode(self.name.as_str(), PATH_SEGMENT)
        )
    }
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },
}

/// Why a connection ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CloseReason {
    /// The server closed the socket or the stream ended.
    ServerClosed,
    /// The socket failed while reading or writing.
    Transport(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerClosed => write!(f, "server closed connection"),
            Self::Transport(error) => write!(f, "connection error: {error}"),
        }
    }
}

#[derive(Debug)]
pub enum ConnectionEvent {
    Snapshot(Snapshot),
    Closed(CloseReason),
}

enum Outbound {
    Intent(ClientAction),
    Close,
}

/// Flip the open flag and report the closure, at most once per connection.
fn mark_closed(
    open: &AtomicBool,
    events: &mpsc::UnboundedSender<ConnectionEvent>,
    reason: CloseReason,
) {
    if open.swap(false, Ordering::SeqCst) {
        info!("Connection closed: {reason}");
        let _ = events.send(ConnectionEvent::Closed(reason));
    }
}

pub struct Connection {
    tx_outbound: mpsc::UnboundedSender<Outbound>,
    open: Arc<AtomicBool>,
    read_handle: JoinHandle<()>,
}

impl Connection {
    /// Connect to the target's room and start the reader and writer tasks.
    pub async fn open(
        base_url: &str,
        target: &JoinTarget,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ConnectionEvent>), ConnectionError> {
        let url = target.url(base_url);
        info!("Connecting to {url}");
        let (ws_stream, _) = connect_async(&url)
            .await
            .map_err(|source| ConnectionError::Connect {
                url: url.clone(),
                source: Box::new(source),
            })?;
        info!("Connected to room {} as {}", target.room(), target.name());

        let (mut write, mut read) = ws_stream.split();
        let open = Arc::new(AtomicBool::new(true));
        let (tx_event, rx_event) = mpsc::unbounded_channel::<ConnectionEvent>();
        let (tx_outbound, mut rx_outbound) = mpsc::unbounded_channel::<Outbound>();

        let write_open = open.clone();
        let write_events = tx_event.clone();
        tokio::spawn(async move {
            while let Some(outbound) = rx_outbound.recv().await {
                match outbound {
                    Outbound::Intent(action) => {
                        let json = match serde_json::to_string(&action) {
                            Ok(json) => json,
                            Err(e) => {
                                warn!("Failed to encode {action}: {e}");
                                continue;
                            }
                        };
                        debug!("Sending {json}");
                        if let Err(e) = write.send(Message::Text(json.into())).await {
                            let reason = CloseReason::Transport(e.to_string());
                            mark_closed(&write_open, &write_events, reason);
                            break;
                        }
                    }
                    Outbound::Close => {
                        let _ = write.close().await;
                        break;
                    }
                }
            }
        });

        let read_open = open.clone();
        let read_handle = tokio::spawn(async move {
            let mut reason = CloseReason::ServerClosed;
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => match messages::decode(&text) {
                        Ok(snapshot) => {
                            // Anything still in flight after a local close is stale.
                            if !read_open.load(Ordering::SeqCst) {
                                continue;
                            }
                            if tx_event.send(ConnectionEvent::Snapshot(snapshot)).is_err() {
                                break;
                            }
                        }
                        Err(e) => debug!("Ignoring inbound frame: {e}"),
                    },
                    Ok(Message::Close(_)) => break,
                    Err(e) => {
                        reason = CloseReason::Transport(e.to_string());
                        break;
                    }
                    _ => {}
                }
            }
            mark_closed(&read_open, &tx_event, reason);
        });

        let connection = Self {
            tx_outbound,
            open,
            read_handle,
        };
        Ok((connection, rx_event))
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Forward an intent. Silently dropped once the connection is not open.
    pub fn send_intent(&self, action: ClientAction) {
        if !self.is_open() {
            debug!("Dropping {action}: connection is not open");
            return;
        }
        let _ = self.tx_outbound.send(Outbound::Intent(action));
    }

    /// Close the socket. Later intents become no-ops and no closure event
    /// is reported for a close requested here.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            info!("Closing connection");
            let _ = self.tx_outbound.send(Outbound::Close);
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
        self.read_handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_target_trims_input() {
        let target = JoinTarget::new("  alice ", " lobby1\n").unwrap();
        assert_eq!(target.name().as_str(), "alice");
        assert_eq!(target.room(), "lobby1");
    }

    #[test]
    fn test_join_target_requires_name() {
        assert_eq!(JoinTarget::new("", "room"), Err(JoinError::MissingName));
        assert_eq!(JoinTarget::new("   ", "room"), Err(JoinError::MissingName));
    }

    #[test]
    fn test_join_target_requires_room() {
        assert_eq!(JoinTarget::new("alice", ""), Err(JoinError::MissingRoom));
        assert_eq!(JoinTarget::new("alice", " \t"), Err(JoinError::MissingRoom));
    }

    #[test]
    fn test_join_target_url() {
        let target = JoinTarget::new("alice", "room1").unwrap();
        assert_eq!(
            target.url("ws://127.0.0.1:8000"),
            "ws://127.0.0.1:8000/ws/room1/alice"
        );
        assert_eq!(
            target.url("ws://127.0.0.1:8000/"),
            "ws://127.0.0.1:8000/ws/room1/alice"
        );
    }

    #[test]
    fn test_join_target_url_escapes_segments() {
        let target = JoinTarget::new("Mary Jane", "a/b?c").unwrap();
        assert_eq!(
            target.url("ws://host"),
            "ws://host/ws/a%2Fb%3Fc/Mary%20Jane"
        );
    }

    #[test]
    fn test_close_reason_display() {
        assert_eq!(CloseReason::ServerClosed.to_string(), "server closed connection");
        assert!(
            CloseReason::Transport("reset".to_string())
                .to_string()
                .contains("reset")
        );
    }
}
