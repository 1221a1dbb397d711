/// Integration tests: drive the real router end to end, token-in-body
/// transport included, and check the authorization chain route by route.

use std::sync::Arc;

use argon2::{Algorithm, Argon2, Params, Version};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use courier_api::AppStateInner;
use courier_api::identity;
use courier_db::Database;

const SECRET: &str = "test-secret";

fn app() -> Router {
    // Low-cost hashing so the suite stays fast
    let argon2 = Argon2::new(
        Algorithm::Argon2id,
        Version::V0x13,
        Params::new(1024, 1, 1, None).unwrap(),
    );

    let state = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        secret_key: SECRET.into(),
        argon2,
    });

    courier_api::router(state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, value)
}

async fn register(app: &Router, username: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/register",
        json!({
            "username": username,
            "password": "password1",
            "first_name": "First",
            "last_name": "Last",
            "phone": "+15551234567",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "register {} failed: {}", username, body);
    body["token"].as_str().unwrap().to_string()
}

async fn send_message(app: &Router, token: &str, to: &str, text: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/messages",
        json!({ "_token": token, "to_username": to, "body": text }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "send failed: {}", body);
    body["message"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn register_then_login_round_trip() {
    let app = app();

    let (status, body) = send(
        &app,
        "POST",
        "/register",
        json!({
            "username": "alice",
            "password": "password1",
            "first_name": "Alice",
            "last_name": "Anderson",
            "phone": "+15551234567",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "alice");
    // The hash must never appear in a response
    assert!(body["user"].get("password").is_none());

    let token = body["token"].as_str().unwrap();
    assert_eq!(identity::verify_token(SECRET, token).unwrap().username, "alice");

    let (status, body) = send(
        &app,
        "POST",
        "/login",
        json!({ "username": "alice", "password": "password1" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();
    assert_eq!(identity::verify_token(SECRET, token).unwrap().username, "alice");
}

#[tokio::test]
async fn login_failures_are_uniform() {
    let app = app();
    register(&app, "alice").await;

    let wrong_password = send(
        &app,
        "POST",
        "/login",
        json!({ "username": "alice", "password": "wrong" }),
    )
    .await;
    let unknown_user = send(
        &app,
        "POST",
        "/login",
        json!({ "username": "ghost", "password": "password1" }),
    )
    .await;

    assert_eq!(wrong_password.0, StatusCode::BAD_REQUEST);
    // Identical status and body: no hint whether the username exists
    assert_eq!(wrong_password, unknown_user);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = app();
    register(&app, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/register",
        json!({
            "username": "alice",
            "password": "different",
            "first_name": "Other",
            "last_name": "Alice",
            "phone": "+15557654321",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);
}

#[tokio::test]
async fn anonymous_requests_are_rejected() {
    let app = app();

    // No token at all
    let (status, body) = send(&app, "GET", "/users", json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);

    // An invalid token degrades to anonymous, then fails the login check
    let (status, _) = send(&app, "GET", "/users", json!({ "_token": "garbage" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A token signed with the wrong key is just as anonymous
    let forged = identity::issue_token("other-secret", &courier_types::api::Claims {
        username: "alice".into(),
    })
    .unwrap();
    let (status, _) = send(&app, "GET", "/users", json!({ "_token": forged })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn self_routes_reject_other_identities() {
    let app = app();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    let (status, _) = send(&app, "GET", "/users/alice/to", json!({ "_token": alice })).await;
    assert_eq!(status, StatusCode::OK);

    // Bob's token never satisfies alice's path parameter
    for uri in ["/users/alice/to", "/users/alice/from"] {
        let (status, body) = send(&app, "GET", uri, json!({ "_token": bob })).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], 401);
    }

    // Anonymous gets the same denial
    let (status, _) = send(&app, "GET", "/users/alice/to", json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn users_are_listed_and_fetched() {
    let app = app();
    let alice = register(&app, "alice").await;
    register(&app, "bob").await;

    let (status, body) = send(&app, "GET", "/users", json!({ "_token": alice })).await;
    assert_eq!(status, StatusCode::OK);
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["username"], "alice");
    assert!(users[0].get("password").is_none());

    let (status, body) = send(&app, "GET", "/users/bob", json!({ "_token": alice })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "bob");
    assert!(body["user"]["join_at"].is_string());

    let (status, _) = send(&app, "GET", "/users/ghost", json!({ "_token": alice })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_parties_can_read_a_message() {
    let app = app();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    let carol = register(&app, "carol").await;

    let id = send_message(&app, &bob, "alice", "hi alice").await;
    let uri = format!("/messages/{}", id);

    // Uninvolved user: denied
    let (status, body) = send(&app, "GET", &uri, json!({ "_token": carol })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);

    // Both parties: allowed, with profiles expanded and no hash anywhere
    for token in [&alice, &bob] {
        let (status, body) = send(&app, "GET", &uri, json!({ "_token": token })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"]["from_user"]["username"], "bob");
        assert_eq!(body["message"]["to_user"]["username"], "alice");
        assert!(body["message"]["from_user"].get("password").is_none());
    }

    let (status, _) = send(&app, "GET", "/messages/9999", json!({ "_token": alice })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sender_comes_from_the_token() {
    let app = app();
    register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    // A forged sender field in the body is ignored
    let (status, body) = send(
        &app,
        "POST",
        "/messages",
        json!({
            "_token": bob,
            "from_username": "alice",
            "to_username": "alice",
            "body": "hello",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"]["from_username"], "bob");

    // Unknown recipient
    let (status, _) = send(
        &app,
        "POST",
        "/messages",
        json!({ "_token": bob, "to_username": "ghost", "body": "hello" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Empty body text
    let (status, _) = send(
        &app,
        "POST",
        "/messages",
        json!({ "_token": bob, "to_username": "alice", "body": "" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_the_recipient_marks_read_and_only_once() {
    let app = app();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    let id = send_message(&app, &bob, "alice", "hi alice").await;
    let uri = format!("/messages/{}/read", id);

    // The sender cannot mark their own message read
    let (status, body) = send(&app, "POST", &uri, json!({ "_token": bob })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);

    // The recipient can
    let (status, body) = send(&app, "POST", &uri, json!({ "_token": alice })).await;
    assert_eq!(status, StatusCode::OK);
    let first_read_at = body["message"]["read_at"].as_str().unwrap().to_string();

    // A second mark is a no-op: the original timestamp survives
    let (status, body) = send(&app, "POST", &uri, json!({ "_token": alice })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"]["read_at"], first_read_at.as_str());

    // The inbox listing reflects the read receipt
    let (status, body) = send(&app, "GET", "/users/alice/to", json!({ "_token": alice })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"][0]["from_user"]["username"], "bob");
    assert!(body["messages"][0]["read_at"].is_string());
}
