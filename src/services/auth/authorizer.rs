//! Authorization decision pipeline.
//!
//! `Authorizer::authorize` turns (credential, path, method) into a `Decision`.
//! It never builds HTTP responses; the request gate owns that mapping.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::api::v1::extractors::AuthCtx;
use crate::repos::error::{RepoError, within};
use crate::repos::user_repo::UserStore;
use crate::services::auth::access_jwt::TokenVerifier;
use crate::services::policy::{PolicyEngine, PolicyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    // authentication failures
    MissingCredential,
    InvalidToken,
    InvalidClusterToken,
    // authorization failures
    UnknownSubject,
    PolicyDenied,
}

impl DenyReason {
    /// Text carried in the `WWW-Authenticate` challenge. Authorization
    /// denials share one generic text so no detail leaks.
    pub fn challenge(self) -> &'static str {
        match self {
            Self::MissingCredential => "missing bearer credential",
            Self::InvalidToken => "invalid or expired token",
            Self::InvalidClusterToken => "invalid cluster token",
            Self::UnknownSubject | Self::PolicyDenied => "unauthorized",
        }
    }

    pub fn is_authentication(self) -> bool {
        matches!(
            self,
            Self::MissingCredential | Self::InvalidToken | Self::InvalidClusterToken
        )
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MissingCredential => "missing credential",
            Self::InvalidToken => "invalid token",
            Self::InvalidClusterToken => "invalid cluster token",
            Self::UnknownSubject => "unknown subject",
            Self::PolicyDenied => "policy denied",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("user store: {0}")]
    Store(#[from] RepoError),
    #[error("policy engine: {0}")]
    Policy(#[from] PolicyError),
}

#[derive(Debug)]
pub enum Decision {
    Allow(AuthCtx),
    Deny(DenyReason),
    Fault(AuthzError),
}

pub struct Authorizer {
    verifier: TokenVerifier,
    users: Arc<dyn UserStore>,
    policy: Arc<dyn PolicyEngine>,
    max_query_time: Duration,
}

impl Authorizer {
    pub fn new(
        verifier: TokenVerifier,
        users: Arc<dyn UserStore>,
        policy: Arc<dyn PolicyEngine>,
        max_query_time: Duration,
    ) -> Self {
        Self {
            verifier,
            users,
            policy,
            max_query_time,
        }
    }

    pub async fn authorize(&self, authorization: Option<&str>, path: &str, method: &str) -> Decision {
        let Some(value) = authorization.filter(|v| !v.trim().is_empty()) else {
            return Decision::Deny(DenyReason::MissingCredential);
        };

        let token = match self.verifier.verify_header(value) {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(error = %err, "access token verification failed");
                return Decision::Deny(DenyReason::InvalidToken);
            }
        };

        match within(self.max_query_time, self.users.exists(&token.uid)).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(uid = %token.uid, "token subject no longer exists");
                return Decision::Deny(DenyReason::UnknownSubject);
            }
            Err(err) => return Decision::Fault(err.into()),
        }

        // Role is resolved on every request, never taken from the token.
        let role = match within(self.max_query_time, self.users.role_of(&token.uid)).await {
            Ok(Some(role)) => role,
            Ok(None) => return Decision::Deny(DenyReason::UnknownSubject),
            Err(err) => return Decision::Fault(err.into()),
        };

        match self.policy.enforce(&token.uid, &role, path, method).await {
            Ok(true) => Decision::Allow(AuthCtx::new(token.uid, token.username, role)),
            Ok(false) => {
                tracing::warn!(uid = %token.uid, %role, path, method, "policy denied request");
                Decision::Deny(DenyReason::PolicyDenied)
            }
            Err(err) => Decision::Fault(err.into()),
        }
    }
}
