/*
 * Responsibility
 * - GET / (reachability; excluded from the gate)
 * - fallback for unknown routes behind the gate
 */
use serde::Serialize;

use crate::{error::AppError, response::ApiResponse, services::version::VERSION};

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
}

pub async fn root() -> ApiResponse<ServiceInfo> {
    ApiResponse::ok(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: VERSION,
    })
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}
