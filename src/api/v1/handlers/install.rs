/*
 * Responsibility
 * - GET  /install/status  (QueryIsInstall)
 * - POST /install         (StartInstall)
 * - GET  /install/version
 * - all three sit outside the gate; the install flag is re-checked before any payload work
 */
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};

use crate::{
    api::v1::dto::install::{CreateAdminUser, InstallResponse, InstallStatusResponse},
    error::AppError,
    response::{ApiResponse, RespCode},
    services::install::{InstallError, InstallStatus},
    services::version::VersionInfo,
    state::AppState,
};

pub async fn query_is_install(State(state): State<AppState>) -> Result<Response, AppError> {
    let res = match state.install.status().await? {
        InstallStatus::Required => ApiResponse::status(RespCode::NeedInstall).into_response(),
        InstallStatus::Installed => {
            ApiResponse::ok(InstallStatusResponse { installed: true }).into_response()
        }
    };
    Ok(res)
}

pub async fn start_install(
    State(state): State<AppState>,
    payload: Result<Json<CreateAdminUser>, JsonRejection>,
) -> Result<Response, AppError> {
    if state.install.status().await? == InstallStatus::Installed {
        return Ok(ApiResponse::status(RespCode::IsInstall).into_response());
    }

    let Json(req) = payload?;
    req.validate().map_err(AppError::bad_request)?;

    match state.install.install(req.name.trim(), &req.password).await {
        Ok(admin) => Ok(ApiResponse::ok(InstallResponse {
            uid: admin.id,
            name: admin.name,
        })
        .into_response()),
        Err(InstallError::AlreadyInstalled) => {
            Ok(ApiResponse::status(RespCode::IsInstall).into_response())
        }
        Err(InstallError::Store(e)) => {
            tracing::error!(error = %e, "install routine failed");
            Err(AppError::Install)
        }
    }
}

pub async fn query_version(State(state): State<AppState>) -> ApiResponse<VersionInfo> {
    let latest = state.latest_version.borrow().clone();
    ApiResponse::ok(VersionInfo::new(latest))
}
