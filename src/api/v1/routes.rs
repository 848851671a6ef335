/*
 * Responsibility
 * - v1 URL layout (mounted at /api/v1)
 * - the gate is applied by the caller to the whole tree; exclusions live in middleware::auth::exclusion
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::v1::handlers::{
    host::list_hosts,
    install::{query_is_install, query_version, start_install},
    user::{info, login, logout},
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user/login", post(login))
        .route("/user/logout", post(logout))
        .route("/user/info", get(info))
        .route("/host", get(list_hosts))
        .route("/install", post(start_install))
        .route("/install/status", get(query_is_install))
        .route("/install/version", get(query_version))
}
