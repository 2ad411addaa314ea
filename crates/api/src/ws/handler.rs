use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::error::AppResult;
use crate::state::AppState;
use crate::ws::hub::{Hub, WsSender};
use crate::ws::message::{ClientMessage, ServerMessage};
use crate::ws::ticket::{TicketError, TicketPair};

/// Inbound frames larger than this close the connection.
const MAX_MESSAGE_BYTES: usize = 64 * 1024;

/// A connection with no inbound frame (pongs included) for this long is
/// dropped.
const READ_DEADLINE: Duration = Duration::from_secs(60);

/// A single outbound write that takes longer than this ends the connection.
const WRITE_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    #[serde(default)]
    pub ticket: Option<String>,
}

/// GET /api/v1/ws/chat?ticket=...
///
/// Burns the ticket and re-checks trust before upgrading; any failure is
/// answered with a plain HTTP error and no upgrade.
pub async fn chat_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<ChatQuery>,
    State(state): State<AppState>,
) -> AppResult<Response> {
    let token = query
        .ticket
        .filter(|t| !t.trim().is_empty())
        .ok_or(TicketError::MissingTicket)?;

    let pair = state.tickets.consume(token.trim()).await?;
    if !state.trust.is_accepted(&pair.me, &pair.peer).await? {
        return Err(TicketError::NotTrusted.into());
    }

    let hub = Arc::clone(&state.hub);
    Ok(ws
        .max_message_size(MAX_MESSAGE_BYTES)
        .max_frame_size(MAX_MESSAGE_BYTES)
        .on_upgrade(move |socket| handle_socket(socket, hub, pair)))
}

/// Manage a single chat connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with the hub under the initiating identity.
///   2. Spawns a sender task that drains the connection's queue.
///   3. Processes inbound frames on the current task.
///   4. Unregisters, then stops the sender task.
async fn handle_socket(socket: WebSocket, hub: Arc<Hub>, pair: TicketPair) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let TicketPair { me, peer } = pair;
    tracing::info!(conn_id = %conn_id, anon_id = %me, "Chat connected");

    let (direct, mut rx) = hub.register(&conn_id, &me, &peer).await;

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match tokio::time::timeout(WRITE_DEADLINE, sink.send(msg)).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => {
                    tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                    break;
                }
                Err(_) => {
                    tracing::debug!(conn_id = %sender_conn_id, "Write deadline exceeded");
                    break;
                }
            }
        }
    });

    reply(&direct, ServerMessage::system(&me, &peer, "connected"));

    loop {
        // A stalled or closed writer tears the whole connection down.
        let next = tokio::select! {
            read = tokio::time::timeout(READ_DEADLINE, stream.next()) => match read {
                Ok(next) => next,
                Err(_) => {
                    tracing::debug!(conn_id = %conn_id, "Read deadline exceeded");
                    break;
                }
            },
            _ = &mut send_task => break,
        };
        match next {
            Some(Ok(Message::Text(text))) => {
                match ClientMessage::parse(text.as_str()) {
                    Ok(msg) => {
                        let frame = ServerMessage::chat(&me, &peer, &msg.text);
                        if let Some(frame) = frame.to_frame() {
                            hub.send_to(&peer, frame.clone()).await;
                            hub.send_to(&me, frame).await;
                        }
                    }
                    Err(e) => reply(&direct, ServerMessage::error(e.detail())),
                }
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(Message::Pong(_))) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    hub.unregister(&me, &conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, anon_id = %me, "Chat disconnected");
}

/// Queue a frame for this connection only; dropped if its queue is full.
fn reply(direct: &WsSender, message: ServerMessage) {
    if let Some(frame) = message.to_frame() {
        let _ = direct.try_send(frame);
    }
}
