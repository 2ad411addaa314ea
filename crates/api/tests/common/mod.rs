#![allow(dead_code)]

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use ghostline_api::auth::jwt::JwtConfig;
use ghostline_api::config::{ServerConfig, SessionConfig};
use ghostline_api::router::build_app_router;
use ghostline_api::state::AppState;
use ghostline_core::proof::{compute_proof, proof_message};
use ghostline_db::Stores;

pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Build a test `ServerConfig` with fixed secrets and an admin token.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "integration-test-jwt-secret".to_string(),
            ttl_mins: 30,
        },
        sessions: SessionConfig::default(),
        anon_hmac_key: "integration-test-anon-key".to_string(),
        admin_token: Some(ADMIN_TOKEN.to_string()),
        database_url: None,
    }
}

/// Full router plus the state behind it, over a fresh in-memory store.
///
/// The touch worker is not spawned; activity updates are dropped.
pub fn build_test_app_with(config: ServerConfig) -> (Router, AppState) {
    let (state, _touch_worker) = AppState::new(config.clone(), Stores::in_memory());
    let app = build_app_router(state.clone(), &config);
    (app, state)
}

pub fn build_test_app() -> Router {
    build_test_app_with(test_config()).0
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.expect("router is infallible")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json_auth(app: Router, uri: &str, token: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_raw(app: Router, uri: &str, raw: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(raw.to_string()))
        .unwrap();
    send(app, request).await
}

// ---------------------------------------------------------------------------
// Device helpers
// ---------------------------------------------------------------------------

/// Secret bytes a test device derives its verifier from.
pub fn device_key(device_id: &str) -> Vec<u8> {
    format!("secret-of-{device_id}").into_bytes()
}

pub fn device_verifier(device_id: &str) -> String {
    STANDARD.encode(device_key(device_id))
}

pub async fn challenge(app: Router, device_id: &str) -> String {
    let response = post_json(
        app,
        "/api/v1/session/challenge",
        json!({ "device_public_id": device_id }),
    )
    .await;
    assert_eq!(response.status(), 200);
    let json = body_json(response).await;
    json["nonce"].as_str().expect("nonce").to_string()
}

/// Bootstrap body signed with the device's key at the current time.
pub fn bootstrap_body(device_id: &str, nonce: &str) -> Value {
    let ts = Utc::now().timestamp();
    let proof = compute_proof(&device_key(device_id), &proof_message(device_id, nonce, ts));
    json!({
        "device_public_id": device_id,
        "nonce": nonce,
        "ts": ts,
        "proof": proof,
        "device_secret_hash": device_verifier(device_id),
    })
}

/// A signed-in identity.
pub struct Identity {
    pub token: String,
    pub anon_id: String,
    pub username: String,
}

/// Run the full challenge/bootstrap exchange for `device_id`.
pub async fn sign_in(app: &Router, device_id: &str) -> Identity {
    let nonce = challenge(app.clone(), device_id).await;
    let response = post_json(
        app.clone(),
        "/api/v1/session/bootstrap",
        bootstrap_body(device_id, &nonce),
    )
    .await;
    assert_eq!(response.status(), 200);
    let json = body_json(response).await;
    Identity {
        token: json["token"].as_str().expect("token").to_string(),
        anon_id: json["anon_id"].as_str().expect("anon_id").to_string(),
        username: json["username"].as_str().expect("username").to_string(),
    }
}

/// Make `a` and `b` trusted: `a` hands out a card, `b` redeems it, `a` accepts.
pub async fn make_trusted(app: &Router, a: &Identity, b: &Identity) {
    let card = body_json(
        post_json_auth(app.clone(), "/api/v1/link-cards", &a.token, json!({})).await,
    )
    .await;
    let code = card["code"].as_str().expect("code");

    let request = body_json(
        post_json_auth(
            app.clone(),
            "/api/v1/trust/request",
            &b.token,
            json!({ "code": code }),
        )
        .await,
    )
    .await;
    let request_id = request["request_id"].as_str().expect("request_id");

    let response = post_json_auth(
        app.clone(),
        "/api/v1/trust/respond",
        &a.token,
        json!({ "request_id": request_id, "decision": "accepted" }),
    )
    .await;
    assert_eq!(response.status(), 200);
}
