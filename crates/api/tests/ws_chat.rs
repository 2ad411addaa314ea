//! End-to-end tests for the chat WebSocket against a real listener.

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use common::{body_json, make_trusted, post_json_auth, sign_in, Identity};
use futures::{SinkExt, StreamExt};
use ghostline_api::state::AppState;
use ghostline_api::ws::message::{ServerMessage, ServerMessageKind};
use serde_json::json;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Serve the app on an ephemeral port. The returned router shares its state.
async fn spawn_server() -> (SocketAddr, axum::Router, AppState) {
    let (app, state) = common::build_test_app_with(common::test_config());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = app.clone();
    tokio::spawn(async move {
        axum::serve(listener, server).await.unwrap();
    });
    (addr, app, state)
}

async fn ticket(app: &axum::Router, me: &Identity, peer: &Identity) -> String {
    let response = post_json_auth(
        app.clone(),
        "/api/v1/ws/ticket",
        &me.token,
        json!({ "peer": peer.anon_id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["ticket"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn connect(addr: SocketAddr, ticket: &str) -> Result<Client, tungstenite::Error> {
    let url = format!("ws://{addr}/api/v1/ws/chat?ticket={ticket}");
    connect_async(url).await.map(|(stream, _)| stream)
}

fn rejection_status(err: tungstenite::Error) -> u16 {
    match err {
        tungstenite::Error::Http(response) => response.status().as_u16(),
        other => panic!("expected an HTTP rejection, got {other:?}"),
    }
}

/// Next server frame, skipping pings.
async fn next_frame(client: &mut Client) -> ServerMessage {
    loop {
        let msg = tokio::time::timeout(RECV_TIMEOUT, client.next())
            .await
            .expect("frame within timeout")
            .expect("stream open")
            .expect("frame ok");
        match msg {
            Message::Text(text) => return serde_json::from_str(&text).expect("server frame"),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame {other:?}"),
        }
    }
}

async fn trusted_pair(app: &axum::Router) -> (Identity, Identity) {
    let a = sign_in(app, "alice-device").await;
    let b = sign_in(app, "bob-device").await;
    make_trusted(app, &a, &b).await;
    (a, b)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn trusted_pair_exchanges_messages() {
    let (addr, app, state) = spawn_server().await;
    let (a, b) = trusted_pair(&app).await;

    let mut alice = connect(addr, &ticket(&app, &a, &b).await).await.unwrap();
    let hello = next_frame(&mut alice).await;
    assert_eq!(hello.kind, ServerMessageKind::Sys);
    assert_eq!(hello.text.as_deref(), Some("connected"));

    let mut bob = connect(addr, &ticket(&app, &b, &a).await).await.unwrap();
    next_frame(&mut bob).await;
    assert_eq!(state.hub.connection_count().await, 2);

    alice
        .send(Message::text(r#"{"type":"msg","text":"hello bob"}"#))
        .await
        .unwrap();

    let received = next_frame(&mut bob).await;
    assert_eq!(received.kind, ServerMessageKind::Msg);
    assert_eq!(received.from.as_deref(), Some(a.anon_id.as_str()));
    assert_eq!(received.to.as_deref(), Some(b.anon_id.as_str()));
    assert_eq!(received.text.as_deref(), Some("hello bob"));

    // The sender gets its own copy.
    let echo = next_frame(&mut alice).await;
    assert_eq!(echo.text.as_deref(), Some("hello bob"));
}

#[tokio::test]
async fn malformed_frames_get_error_replies() {
    let (addr, app, _state) = spawn_server().await;
    let (a, b) = trusted_pair(&app).await;

    let mut alice = connect(addr, &ticket(&app, &a, &b).await).await.unwrap();
    next_frame(&mut alice).await;

    alice.send(Message::text("{oops")).await.unwrap();
    let reply = next_frame(&mut alice).await;
    assert_eq!(reply.kind, ServerMessageKind::Err);
    assert_eq!(reply.detail.as_deref(), Some("bad json"));

    alice
        .send(Message::text(r#"{"type":"typing"}"#))
        .await
        .unwrap();
    let reply = next_frame(&mut alice).await;
    assert_eq!(reply.kind, ServerMessageKind::Err);
    assert_eq!(reply.detail.as_deref(), Some("unknown message type"));
}

#[tokio::test]
async fn ticket_is_single_use() {
    let (addr, app, _state) = spawn_server().await;
    let (a, b) = trusted_pair(&app).await;
    let t = ticket(&app, &a, &b).await;

    let _first = connect(addr, &t).await.unwrap();
    let second = connect(addr, &t).await.unwrap_err();
    assert_eq!(rejection_status(second), 401);
}

#[tokio::test]
async fn missing_or_unknown_ticket_is_rejected() {
    let (addr, _app, _state) = spawn_server().await;

    let url = format!("ws://{addr}/api/v1/ws/chat");
    let err = connect_async(url).await.unwrap_err();
    assert_eq!(rejection_status(err), 400);

    let err = connect(addr, "wst_unknown").await.unwrap_err();
    assert_eq!(rejection_status(err), 401);
}

#[tokio::test]
async fn ticket_without_trust_is_rejected_at_connect() {
    let (addr, app, state) = spawn_server().await;
    let a = sign_in(&app, "alice-device").await;
    let b = sign_in(&app, "bob-device").await;

    // A ticket that outlived the trust it was issued under.
    let issued = state.tickets.create(&a.anon_id, &b.anon_id).await;

    let err = connect(addr, &issued.token).await.unwrap_err();
    assert_eq!(rejection_status(err), 403);
}

#[tokio::test]
async fn disconnect_unregisters_connection() {
    let (addr, app, state) = spawn_server().await;
    let (a, b) = trusted_pair(&app).await;

    let mut alice = connect(addr, &ticket(&app, &a, &b).await).await.unwrap();
    next_frame(&mut alice).await;
    assert_eq!(state.hub.connection_count().await, 1);

    alice.close(None).await.unwrap();

    let mut remaining = 1;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        remaining = state.hub.connection_count().await;
        if remaining == 0 {
            break;
        }
    }
    assert_eq!(remaining, 0);
}
