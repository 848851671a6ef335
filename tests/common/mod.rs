#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;

use taskgate::app::server::Server;
use taskgate::config::{ServerConfig, WorkerConfig};
use taskgate::repos::{MemoryStore, Storage, UserRow};
use taskgate::services::alarm::LogAlarm;
use taskgate::services::auth::JwtIssuer;
use taskgate::services::auth::access_jwt::AccessTokenClaims;
use taskgate::services::auth::password::hash_password;

pub const JWT_SECRET: &str = "integration-secret-0123456789";
pub const CLUSTER_SECRET: &str = "cluster-secret";

fn lookup(
    defaults: &[(&str, &str)],
    overrides: &[(&str, &str)],
) -> impl Fn(&str) -> Option<String> + use<> {
    let vars: HashMap<String, String> = defaults
        .iter()
        .chain(overrides)
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

pub fn server_config(overrides: &[(&str, &str)]) -> ServerConfig {
    let defaults = [
        ("DATABASE_URL", "memory:"),
        ("JWT_SECRET", JWT_SECRET),
        ("CLUSTER_SECRET", CLUSTER_SECRET),
        ("DB_MAX_QUERY_TIME_MS", "200"),
    ];
    ServerConfig::from_lookup(lookup(&defaults, overrides)).unwrap()
}

pub fn worker_config(server_url: &str, overrides: &[(&str, &str)]) -> WorkerConfig {
    let defaults = [
        ("SERVER_URL", server_url),
        ("CLUSTER_SECRET", CLUSTER_SECRET),
        ("WORKER_HOST", "127.0.0.1"),
        ("WORKER_PORT", "0"),
        ("REGISTRY_BACKOFF_BASE_MS", "20"),
        ("REGISTRY_BACKOFF_MAX_MS", "100"),
        ("HEARTBEAT_INTERVAL_SECONDS", "0"),
    ];
    WorkerConfig::from_lookup(lookup(&defaults, overrides)).unwrap()
}

pub async fn build_server(store: &MemoryStore) -> Server {
    Server::build(
        &server_config(&[]),
        Storage::memory(store.clone()),
        Arc::new(LogAlarm),
    )
    .await
    .unwrap()
}

pub async fn router(store: &MemoryStore) -> Router {
    build_server(store).await.router()
}

pub fn seed_user(store: &MemoryStore, id: &str, name: &str, role: &str, password: &str) {
    store.insert_user(UserRow {
        id: id.into(),
        name: name.into(),
        role: role.into(),
        password_hash: hash_password(password),
    });
}

pub fn token_for(uid: &str, username: &str) -> String {
    JwtIssuer::new(JWT_SECRET, 3600)
        .issue(uid, username)
        .unwrap()
        .token
}

pub fn expired_token_for(uid: &str, username: &str) -> String {
    let now = Utc::now().timestamp();
    JwtIssuer::new(JWT_SECRET, 3600)
        .sign(&AccessTokenClaims {
            uid: uid.into(),
            username: username.into(),
            iat: now - 120,
            exp: now - 60,
        })
        .unwrap()
}

pub fn get(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut req = Request::builder().method("GET").uri(uri);
    if let Some(value) = authorization {
        req = req.header(header::AUTHORIZATION, value);
    }
    req.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(res: Response<Body>) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
