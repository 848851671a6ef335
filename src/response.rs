/*
 * Responsibility
 * - stable response-code enumeration shared by every endpoint
 * - `{ code, msg, data }` envelope and its IntoResponse
 * - the RespCode is also stored in response extensions for the access log
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespCode {
    Success,
    ErrBadRequest,
    ErrUnauthorized,
    ErrUserPassword,
    ErrNotFound,
    ErrInternalServer,
    NeedInstall,
    IsInstall,
    ErrInstall,
}

impl RespCode {
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::ErrBadRequest => 10400,
            Self::ErrUnauthorized => 10401,
            Self::ErrUserPassword => 10402,
            Self::ErrNotFound => 10404,
            Self::ErrInternalServer => 10500,
            Self::NeedInstall => 10600,
            Self::IsInstall => 10601,
            Self::ErrInstall => 10602,
        }
    }

    pub fn msg(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::ErrBadRequest => "bad request",
            Self::ErrUnauthorized => "unauthorized",
            Self::ErrUserPassword => "incorrect user name or password",
            Self::ErrNotFound => "not found",
            Self::ErrInternalServer => "internal server error",
            Self::NeedInstall => "installation required",
            Self::IsInstall => "already installed",
            Self::ErrInstall => "installation failed",
        }
    }

    pub fn http_status(self) -> StatusCode {
        match self {
            Self::Success | Self::NeedInstall | Self::IsInstall => StatusCode::OK,
            Self::ErrBadRequest => StatusCode::BAD_REQUEST,
            Self::ErrUnauthorized | Self::ErrUserPassword => StatusCode::UNAUTHORIZED,
            Self::ErrNotFound => StatusCode::NOT_FOUND,
            Self::ErrInternalServer | Self::ErrInstall => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Serialize for RespCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

#[derive(Debug, Serialize)]
struct Envelope<T> {
    code: RespCode,
    msg: &'static str,
    data: Option<T>,
}

#[derive(Debug)]
pub struct ApiResponse<T> {
    code: RespCode,
    data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: RespCode::Success,
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Envelope carrying only a code (`data: null`).
    pub fn status(code: RespCode) -> Self {
        Self { code, data: None }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        envelope(self.code, self.data)
    }
}

pub(crate) fn envelope<T: Serialize>(code: RespCode, data: Option<T>) -> Response {
    let body = Envelope {
        code,
        msg: code.msg(),
        data,
    };

    let mut res = (code.http_status(), Json(body)).into_response();
    res.extensions_mut().insert(code);
    res
}
