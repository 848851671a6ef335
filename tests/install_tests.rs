mod common;

use axum::Router;
use axum::http::StatusCode;
use serde_json::Value;
use tower::ServiceExt;

use taskgate::repos::MemoryStore;

use common::*;

const ADMIN: &str = r#"{"name":"root","password":"password123"}"#;

async fn call(app: &Router, req: axum::http::Request<axum::body::Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    (status, body_json(res).await)
}

#[tokio::test]
async fn fresh_system_reports_need_install() {
    let app = router(&MemoryStore::new()).await;

    let (status, body) = call(&app, get("/api/v1/install/status", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 10600);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn install_then_login_as_admin() {
    let store = MemoryStore::new();
    let app = router(&store).await;

    let (status, body) = call(&app, post_json("/api/v1/install", ADMIN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["name"], "root");

    let (_, body) = call(&app, get("/api/v1/install/status", None)).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["installed"], true);

    let (status, body) = call(&app, post_json("/api/v1/user/login", ADMIN)).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    // Seeded policy was reloaded, so the fresh admin is admitted.
    let bearer = format!("Bearer {token}");
    let (status, body) = call(&app, get("/api/v1/host", Some(&bearer))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
}

#[tokio::test]
async fn repeated_install_reports_is_install_without_mutation() {
    let store = MemoryStore::new();
    let app = router(&store).await;
    call(&app, post_json("/api/v1/install", ADMIN)).await;
    let rules_before = store.rules();

    let (status, body) = call(
        &app,
        post_json("/api/v1/install", r#"{"name":"intruder","password":"password456"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 10601);
    assert_eq!(store.user_count(), 1);
    assert!(store.user_by_name("intruder").is_none());
    assert_eq!(store.rules(), rules_before);
}

#[tokio::test]
async fn installed_flag_is_checked_before_payload() {
    let store = MemoryStore::new();
    let app = router(&store).await;
    call(&app, post_json("/api/v1/install", ADMIN)).await;

    let (_, body) = call(&app, post_json("/api/v1/install", "{not json")).await;

    assert_eq!(body["code"], 10601);
}

#[tokio::test]
async fn malformed_payload_is_bad_request() {
    let store = MemoryStore::new();
    let app = router(&store).await;

    let (status, body) = call(&app, post_json("/api/v1/install", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 10400);

    let (status, _) = call(
        &app,
        post_json("/api/v1/install", r#"{"name":"root","password":"short"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!store.installed());
}

#[tokio::test]
async fn failed_install_leaves_system_uninstalled() {
    let store = MemoryStore::new();
    let app = router(&store).await;
    store.set_fail_install_midway(true);

    let (status, body) = call(&app, post_json("/api/v1/install", ADMIN)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 10602);
    assert!(!store.installed());
    assert_eq!(store.user_count(), 0);
    assert!(store.rules().is_empty());

    store.set_fail_install_midway(false);
    let (_, body) = call(&app, get("/api/v1/install/status", None)).await;
    assert_eq!(body["code"], 10600);
}

#[tokio::test]
async fn unreadable_flag_is_internal_error() {
    let store = MemoryStore::new();
    let app = router(&store).await;
    store.set_failing(true);

    let (status, body) = call(&app, get("/api/v1/install/status", None)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 10500);
}

#[tokio::test]
async fn wrong_password_is_rejected_at_login() {
    let store = MemoryStore::new();
    let app = router(&store).await;
    call(&app, post_json("/api/v1/install", ADMIN)).await;

    let (status, body) = call(
        &app,
        post_json("/api/v1/user/login", r#"{"name":"root","password":"wrong-password"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 10402);
}

#[tokio::test]
async fn version_endpoint_reports_current_version() {
    let app = router(&MemoryStore::new()).await;

    let (status, body) = call(&app, get("/api/v1/install/version", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["current"], env!("CARGO_PKG_VERSION"));
    assert!(body["data"]["latest"].is_null());
}
