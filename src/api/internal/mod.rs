/*
 * Responsibility
 * - worker -> server endpoints (mounted at /internal/v1)
 * - outside the user gate; the caller wraps them in the cluster-token guard
 */
use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::{ConnectInfo, State, rejection::JsonRejection},
    routing::post,
};

use crate::{
    error::AppError,
    repos::host_repo::HostRecord,
    response::ApiResponse,
    services::registry::RegistryRequest,
    state::AppState,
};

const VERSION_MAX_CHARS: usize = 64;

pub fn routes() -> Router<AppState> {
    Router::new().route("/host/registry", post(register_host))
}

fn validate(req: &RegistryRequest) -> Result<(), &'static str> {
    let version = req.version.trim();
    if version.is_empty() {
        return Err("version is required");
    }
    if version.chars().count() > VERSION_MAX_CHARS {
        return Err("version must be <= 64 chars");
    }
    if req.port == 0 {
        return Err("port must be >= 1");
    }
    Ok(())
}

pub async fn register_host(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    payload: Result<Json<RegistryRequest>, JsonRejection>,
) -> Result<ApiResponse<HostRecord>, AppError> {
    let Json(req) = payload?;
    validate(&req).map_err(AppError::bad_request)?;

    // The worker never reports its own ip; the peer address is authoritative.
    let record = state
        .registry
        .record(peer.ip(), req.version.trim(), req.port)
        .await?;

    Ok(ApiResponse::ok(record))
}
