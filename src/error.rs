/*
 * Responsibility
 * - AppError shared by handlers and the request gate
 * - IntoResponse (HTTP status / envelope / challenge header); the only place error responses are built
 * - RepoError / JSON rejection conversions
 */
use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::repos::error::RepoError;
use crate::response::{RespCode, envelope};
use crate::services::auth::authorizer::DenyReason;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(DenyReason),
    #[error("incorrect user name or password")]
    InvalidCredentials,
    #[error("not found")]
    NotFound,
    #[error("installation failed")]
    Install,
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn resp_code(&self) -> RespCode {
        match self {
            AppError::BadRequest(_) => RespCode::ErrBadRequest,
            AppError::Unauthorized(_) => RespCode::ErrUnauthorized,
            AppError::InvalidCredentials => RespCode::ErrUserPassword,
            AppError::NotFound => RespCode::ErrNotFound,
            AppError::Install => RespCode::ErrInstall,
            AppError::Internal => RespCode::ErrInternalServer,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut res = envelope::<()>(self.resp_code(), None);

        if let AppError::Unauthorized(reason) = &self {
            let challenge = format!("Bearer realm=\"{}\"", reason.challenge());
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                res.headers_mut().insert(header::WWW_AUTHENTICATE, value);
            }
        }

        res
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        tracing::error!(error = %e, "store call failed");
        AppError::Internal
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::bad_request(e.body_text())
    }
}
