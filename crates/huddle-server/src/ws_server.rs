// WebSocket server pushing live feedback to admin views.
//
// Each connection joins one or more rooms (session tokens) by sending a join
// message. Events published to a room are forwarded to every connection that
// joined it. Nothing is buffered for rooms without listeners.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use huddle_core::{LiveEvent, Notifier, SessionId};
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

/// Updates buffered per subscriber before slow connections start skipping.
pub const HUB_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Hub
// ---------------------------------------------------------------------------

/// A serialized event addressed to one room.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomEnvelope {
    pub room: String,
    pub payload: String,
}

/// Fan-out point shared by the HTTP layer (as the store's [`Notifier`]) and
/// every WebSocket connection.
#[derive(Debug, Clone)]
pub struct LiveHub {
    tx: broadcast::Sender<Arc<RoomEnvelope>>,
}

impl LiveHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to a room. Returns the number of connections that
    /// will see it (before room filtering); zero when nobody is connected.
    pub fn publish(&self, room: &str, event: &LiveEvent) -> usize {
        let envelope = Arc::new(RoomEnvelope {
            room: room.to_string(),
            payload: event.to_json(),
        });
        match self.tx.send(envelope) {
            Ok(n) => n,
            Err(_) => {
                debug!("No live listeners; dropped update for room {room}");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<RoomEnvelope>> {
        self.tx.subscribe()
    }
}

impl Default for LiveHub {
    fn default() -> Self {
        Self::new(HUB_CAPACITY)
    }
}

impl Notifier for LiveHub {
    fn notify(&self, audience: &SessionId, event: LiveEvent) {
        self.publish(audience.as_str(), &event);
    }
}

// ---------------------------------------------------------------------------
// Client protocol
// ---------------------------------------------------------------------------

/// Messages a browser may send.
///
/// Wire shape: `{"type": "join", "room": "<session>", "username": "admin"}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join {
        room: String,
        #[serde(default = "anonymous")]
        username: String,
    },
}

fn anonymous() -> String {
    "Someone".to_string()
}

/// Apply one text frame from a client: joins add the room to `rooms` and
/// announce the newcomer to the room. Malformed frames are logged and ignored.
pub fn handle_client_text(text: &str, rooms: &mut HashSet<String>, hub: &LiveHub, addr: &str) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Join { room, username }) => {
            info!("Client {addr} ({username}) joined room {room}");
            rooms.insert(room.clone());
            hub.publish(
                &room,
                &LiveEvent::Status {
                    msg: format!("{username} has joined the session."),
                },
            );
        }
        Err(e) => {
            warn!("Ignoring malformed message from {addr}: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Server loop
// ---------------------------------------------------------------------------

/// Accept WebSocket connections forever, serving each on its own task.
pub async fn run(listener: TcpListener, hub: LiveHub) -> anyhow::Result<()> {
    let local_addr = listener.local_addr()?;
    info!("WebSocket server listening on {local_addr}");

    loop {
        let (stream, addr) = listener.accept().await?;
        let addr_str = addr.to_string();
        debug!("Accepted TCP connection from {addr_str}");

        let hub = hub.clone();
        tokio::spawn(async move {
            let ws_stream = match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!("WebSocket handshake failed for {addr_str}: {e}");
                    return;
                }
            };
            serve_connection(ws_stream, hub, &addr_str).await;
        });
    }
}

/// Drive one connection until the client closes it or errors: read join
/// frames and forward updates for joined rooms.
pub async fn serve_connection<S>(ws: WebSocketStream<S>, hub: LiveHub, addr: &str)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut write, mut read) = ws.split();
    // Subscribe before reading so a client sees its own join announcement.
    let mut updates = hub.subscribe();
    let mut rooms: HashSet<String> = HashSet::new();

    loop {
        tokio::select! {
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    handle_client_text(text.as_str(), &mut rooms, &hub, addr);
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Client {addr} disconnected");
                    break;
                }
                Some(Err(e)) => {
                    warn!("WebSocket error from {addr}: {e}");
                    break;
                }
                Some(Ok(_)) => {
                    // Binary, Ping, Pong and raw frames carry nothing for us.
                }
            },
            update = updates.recv() => match update {
                Ok(envelope) if rooms.contains(&envelope.room) => {
                    if let Err(e) = write.send(Message::Text(envelope.payload.clone().into())).await {
                        warn!("Failed to push update to {addr}: {e}");
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Client {addr} lagged behind; skipped {skipped} update(s)");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}
