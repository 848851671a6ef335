/*
 * Responsibility
 * - login issues an access token for name + password
 * - logout is stateless (tokens simply expire)
 * - info returns the AuthCtx resolved by the gate
 */
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::{
    api::v1::dto::user::{LoginRequest, LoginResponse},
    api::v1::extractors::{AuthCtx, AuthCtxExtractor},
    error::AppError,
    repos::error::within,
    response::{ApiResponse, RespCode},
    services::auth::password::verify_password,
    state::AppState,
};

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<ApiResponse<LoginResponse>, AppError> {
    let Json(req) = payload?;
    req.validate().map_err(AppError::bad_request)?;

    let user = within(state.max_query_time, state.users.find_by_name(req.name.trim()))
        .await?
        .filter(|u| verify_password(&req.password, &u.password_hash))
        .ok_or(AppError::InvalidCredentials)?;

    let issued = state.issuer.issue(&user.id, &user.name)?;
    tracing::info!(uid = %user.id, "user logged in");

    Ok(ApiResponse::ok(LoginResponse {
        token: issued.token,
        token_type: "Bearer",
        expires_at: issued.expires_at,
    }))
}

pub async fn logout() -> ApiResponse<()> {
    ApiResponse::status(RespCode::Success)
}

pub async fn info(AuthCtxExtractor(ctx): AuthCtxExtractor) -> ApiResponse<AuthCtx> {
    ApiResponse::ok(ctx)
}
