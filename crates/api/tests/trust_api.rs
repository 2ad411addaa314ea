//! HTTP-level integration tests for link cards and the trust handshake.

mod common;

use axum::http::StatusCode;
use common::{body_json, get_auth, make_trusted, post_json_auth, sign_in};
use serde_json::{json, Value};

async fn create_card(app: &axum::Router, token: &str, body: Value) -> Value {
    let response = post_json_auth(app.clone(), "/api/v1/link-cards", token, body).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn redeem(app: &axum::Router, token: &str, code: &str) -> axum::http::Response<axum::body::Body> {
    post_json_auth(
        app.clone(),
        "/api/v1/trust/request",
        token,
        json!({ "code": code }),
    )
    .await
}

// ---------------------------------------------------------------------------
// Link cards
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_card_defaults_to_a_day() {
    let app = common::build_test_app();
    let owner = sign_in(&app, "owner").await;

    let card = create_card(&app, &owner.token, json!({})).await;
    assert_eq!(card["status"], "active");
    assert!(!card["code"].as_str().unwrap().is_empty());

    let expires_at = chrono::DateTime::parse_from_rfc3339(card["expires_at"].as_str().unwrap())
        .unwrap()
        .with_timezone(&chrono::Utc);
    let remaining = expires_at - chrono::Utc::now();
    assert!(remaining > chrono::Duration::minutes(1435));
    assert!(remaining <= chrono::Duration::minutes(1440));
}

#[tokio::test]
async fn create_card_honours_ttl() {
    let app = common::build_test_app();
    let owner = sign_in(&app, "owner").await;

    let card = create_card(&app, &owner.token, json!({ "ttl_minutes": 5 })).await;
    let expires_at = chrono::DateTime::parse_from_rfc3339(card["expires_at"].as_str().unwrap())
        .unwrap()
        .with_timezone(&chrono::Utc);
    assert!(expires_at - chrono::Utc::now() <= chrono::Duration::minutes(5));
}

#[tokio::test]
async fn create_card_caps_huge_ttl() {
    let app = common::build_test_app();
    let owner = sign_in(&app, "owner").await;

    let card = create_card(&app, &owner.token, json!({ "ttl_minutes": i64::MAX })).await;
    let expires_at = chrono::DateTime::parse_from_rfc3339(card["expires_at"].as_str().unwrap())
        .unwrap()
        .with_timezone(&chrono::Utc);
    assert!(expires_at - chrono::Utc::now() <= chrono::Duration::days(30));
}

#[tokio::test]
async fn link_cards_require_auth() {
    let app = common::build_test_app();
    let response = common::post_json(app, "/api/v1/link-cards", json!({})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn mine_lists_only_own_cards_with_status() {
    let app = common::build_test_app();
    let owner = sign_in(&app, "owner").await;
    let other = sign_in(&app, "other").await;

    let first = create_card(&app, &owner.token, json!({})).await;
    let second = create_card(&app, &owner.token, json!({})).await;
    create_card(&app, &other.token, json!({})).await;

    let redeemed = redeem(&app, &other.token, first["code"].as_str().unwrap()).await;
    assert_eq!(redeemed.status(), StatusCode::OK);

    let response = get_auth(app, "/api/v1/link-cards/mine", &owner.token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cards = body_json(response).await;
    let cards = cards.as_array().unwrap();
    assert_eq!(cards.len(), 2);

    let status_of = |code: &Value| {
        cards
            .iter()
            .find(|c| c["code"] == *code)
            .map(|c| c["status"].clone())
            .unwrap()
    };
    assert_eq!(status_of(&first["code"]), "used");
    assert_eq!(status_of(&second["code"]), "active");
}

#[tokio::test]
async fn revoked_card_cannot_be_redeemed() {
    let app = common::build_test_app();
    let owner = sign_in(&app, "owner").await;
    let other = sign_in(&app, "other").await;

    let card = create_card(&app, &owner.token, json!({})).await;
    let code = card["code"].as_str().unwrap();

    // Only the owner may revoke.
    let uri = format!("/api/v1/link-cards/{code}/revoke");
    let response = post_json_auth(app.clone(), &uri, &other.token, json!({})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_json_auth(app.clone(), &uri, &owner.token, json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "revoked");

    let response = post_json_auth(app.clone(), &uri, &owner.token, json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = redeem(&app, &other.token, code).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "code not active");
}

// ---------------------------------------------------------------------------
// Trust handshake
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_handshake_establishes_mutual_trust() {
    let app = common::build_test_app();
    let owner = sign_in(&app, "owner").await;
    let redeemer = sign_in(&app, "redeemer").await;

    let card = create_card(&app, &owner.token, json!({})).await;
    let response = redeem(&app, &redeemer.token, card["code"].as_str().unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let request = body_json(response).await;
    assert_eq!(request["status"], "pending");
    let request_id = request["request_id"].as_str().unwrap();

    // The owner sees it as incoming, the redeemer as outgoing.
    let status = body_json(get_auth(app.clone(), "/api/v1/trust/status", &owner.token).await).await;
    assert_eq!(status["incoming"].as_array().unwrap().len(), 1);
    assert!(status["outgoing"].as_array().unwrap().is_empty());
    assert_eq!(status["incoming"][0]["from_anon"], redeemer.anon_id.as_str());
    assert_eq!(status["incoming"][0]["to_anon"], owner.anon_id.as_str());
    assert_eq!(status["incoming"][0]["code"], card["code"]);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/trust/respond",
        &owner.token,
        json!({ "request_id": request_id, "decision": "accepted" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let resolved = body_json(response).await;
    assert_eq!(resolved["status"], "accepted");

    let status =
        body_json(get_auth(app.clone(), "/api/v1/trust/status", &redeemer.token).await).await;
    assert_eq!(status["outgoing"][0]["status"], "accepted");

    // Both directions may now open a chat.
    for (me, peer) in [(&owner, &redeemer), (&redeemer, &owner)] {
        let response = post_json_auth(
            app.clone(),
            "/api/v1/ws/ticket",
            &me.token,
            json!({ "peer": peer.anon_id }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn card_is_single_use() {
    let app = common::build_test_app();
    let owner = sign_in(&app, "owner").await;
    let first = sign_in(&app, "first").await;
    let second = sign_in(&app, "second").await;

    let card = create_card(&app, &owner.token, json!({})).await;
    let code = card["code"].as_str().unwrap();

    assert_eq!(redeem(&app, &first.token, code).await.status(), StatusCode::OK);
    let response = redeem(&app, &second.token, code).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "code not active");
}

#[tokio::test]
async fn owner_cannot_redeem_own_card() {
    let app = common::build_test_app();
    let owner = sign_in(&app, "owner").await;
    let card = create_card(&app, &owner.token, json!({})).await;

    let response = redeem(&app, &owner.token, card["code"].as_str().unwrap()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "cannot trust yourself");
}

#[tokio::test]
async fn unknown_and_empty_codes() {
    let app = common::build_test_app();
    let caller = sign_in(&app, "caller").await;

    let response = redeem(&app, &caller.token, "NOPE-NOPE").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "code not found");

    let response = redeem(&app, &caller.token, "   ").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "code required");
}

#[tokio::test]
async fn only_the_recipient_resolves_and_only_once() {
    let app = common::build_test_app();
    let owner = sign_in(&app, "owner").await;
    let redeemer = sign_in(&app, "redeemer").await;

    let card = create_card(&app, &owner.token, json!({})).await;
    let request = body_json(redeem(&app, &redeemer.token, card["code"].as_str().unwrap()).await).await;
    let request_id = request["request_id"].as_str().unwrap();

    let respond = |token: String, decision: &'static str| {
        let app = app.clone();
        let request_id = request_id.to_string();
        async move {
            post_json_auth(
                app,
                "/api/v1/trust/respond",
                &token,
                json!({ "request_id": request_id, "decision": decision }),
            )
            .await
        }
    };

    let response = respond(redeemer.token.clone(), "accepted").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "forbidden");

    let response = respond(owner.token.clone(), "declined").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "declined");

    let response = respond(owner.token.clone(), "accepted").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "already resolved");

    // Declined requests grant no trust.
    let response = post_json_auth(
        app.clone(),
        "/api/v1/ws/ticket",
        &owner.token,
        json!({ "peer": redeemer.anon_id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "not trusted");
}

#[tokio::test]
async fn respond_validates_input() {
    let app = common::build_test_app();
    let caller = sign_in(&app, "caller").await;

    let response = post_json_auth(
        app.clone(),
        "/api/v1/trust/respond",
        &caller.token,
        json!({ "request_id": "tr_x", "decision": "maybe" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "request_id and valid decision required"
    );

    let response = post_json_auth(
        app,
        "/api/v1/trust/respond",
        &caller.token,
        json!({ "request_id": "tr_missing", "decision": "accepted" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "trust request not found");
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ticket_requires_peer_other_than_self() {
    let app = common::build_test_app();
    let me = sign_in(&app, "me").await;

    let response = post_json_auth(app.clone(), "/api/v1/ws/ticket", &me.token, json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "peer required");

    let response = post_json_auth(
        app,
        "/api/v1/ws/ticket",
        &me.token,
        json!({ "peer": me.anon_id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "peer cannot be self");
}

#[tokio::test]
async fn ticket_for_trusted_peer() {
    let app = common::build_test_app();
    let a = sign_in(&app, "a").await;
    let b = sign_in(&app, "b").await;
    make_trusted(&app, &a, &b).await;

    let response = post_json_auth(
        app,
        "/api/v1/ws/ticket",
        &a.token,
        json!({ "peer": b.anon_id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["ticket"].is_string());
    assert_eq!(json["expires_in"], 30);
}
