use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;
use tracing::error;

use crate::error::AppError;
use crate::services::auth::access_jwt::AccessTokenClaims;

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs access tokens with the shared HS256 secret.
#[derive(Clone)]
pub struct JwtIssuer {
    ttl_seconds: u64,
    encoding_key: EncodingKey,
}

impl JwtIssuer {
    pub fn new(secret: &str, ttl_seconds: u64) -> Self {
        Self {
            ttl_seconds,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    pub fn issue(&self, uid: &str, username: &str) -> Result<IssuedToken, AppError> {
        let now = Utc::now();
        let ttl = i64::try_from(self.ttl_seconds).map_err(|_| AppError::Internal)?;
        let exp = now.timestamp() + ttl;

        let claims = AccessTokenClaims {
            uid: uid.to_string(),
            username: username.to_string(),
            iat: now.timestamp(),
            exp,
        };

        let token = self.sign(&claims)?;
        let expires_at = DateTime::from_timestamp(exp, 0).ok_or(AppError::Internal)?;

        Ok(IssuedToken { token, expires_at })
    }

    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, AppError> {
        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("JWT".to_string());
        jsonwebtoken::encode(&header, claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, "failed to sign JWT");
            AppError::Internal
        })
    }
}
