use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use ghostline_core::types::{AnonId, Timestamp};
use tokio::sync::{mpsc, RwLock};

/// Outbound frames buffered per connection before new ones are dropped.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 16;

/// Channel sender half for pushing frames to one WebSocket connection.
pub type WsSender = mpsc::Sender<Message>;

/// Metadata for a single live chat connection.
pub struct WsConnection {
    /// The identity on the other end of this conversation.
    pub peer: AnonId,
    /// Channel sender for outbound frames to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// Live chat connections addressed by identity.
///
/// One identity may hold several connections (multiple tabs or devices);
/// every frame sent to the identity goes to all of them. Senders never
/// block: a full queue drops the frame for that connection only.
pub struct Hub {
    connections: RwLock<HashMap<AnonId, HashMap<String, WsConnection>>>,
}

impl Hub {
    /// Create a new, empty hub.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection under `anon_id`.
    ///
    /// Returns a sender for frames addressed to this connection alone and
    /// the receiver the connection's send task drains.
    pub async fn register(
        &self,
        conn_id: &str,
        anon_id: &str,
        peer: &str,
    ) -> (WsSender, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let conn = WsConnection {
            peer: peer.to_string(),
            sender: tx.clone(),
            connected_at: chrono::Utc::now(),
        };
        self.connections
            .write()
            .await
            .entry(anon_id.to_string())
            .or_default()
            .insert(conn_id.to_string(), conn);
        (tx, rx)
    }

    /// Remove a connection. Unknown ids are ignored.
    pub async fn unregister(&self, anon_id: &str, conn_id: &str) {
        let mut conns = self.connections.write().await;
        if let Some(set) = conns.get_mut(anon_id) {
            set.remove(conn_id);
            if set.is_empty() {
                conns.remove(anon_id);
            }
        }
    }

    /// Deliver `message` to every live connection of `anon_id`.
    ///
    /// Returns the number of connections that accepted the frame.
    pub async fn send_to(&self, anon_id: &str, message: Message) -> usize {
        let senders: Vec<WsSender> = match self.connections.read().await.get(anon_id) {
            Some(set) => set.values().map(|c| c.sender.clone()).collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for sender in senders {
            match sender.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::debug!(anon_id, "Outbound queue full, dropping frame");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }

    /// Return the current number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.connections
            .read()
            .await
            .values()
            .map(HashMap::len)
            .sum()
    }

    /// Send a Ping frame to every connection.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values().flat_map(HashMap::values) {
            let _ = conn.sender.try_send(Message::Ping(Bytes::new()));
        }
    }

    /// Send a Close frame to every connection, then clear the registry.
    ///
    /// Used during graceful shutdown.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let mut count = 0usize;
        for conn in conns.values().flat_map(HashMap::values) {
            let _ = conn.sender.try_send(Message::Close(None));
            count += 1;
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}
