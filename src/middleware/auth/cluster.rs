//! Shared-secret guard for worker -> server calls (`X-Cluster-Token`).

use std::fmt;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};
use sha2::{Digest, Sha256};

use crate::error::AppError;
use crate::services::auth::DenyReason;
use crate::services::auth::password::constant_time_eq;

pub const CLUSTER_TOKEN_HEADER: &str = "x-cluster-token";

#[derive(Clone)]
pub struct ClusterSecret {
    digest: [u8; 32],
}

impl fmt::Debug for ClusterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClusterSecret(..)")
    }
}

impl ClusterSecret {
    pub fn new(secret: &str) -> Self {
        Self {
            digest: Sha256::digest(secret.as_bytes()).into(),
        }
    }

    // Digests have a fixed length, so the comparison time does not depend on the input.
    pub fn verify(&self, presented: &str) -> bool {
        let presented: [u8; 32] = Sha256::digest(presented.as_bytes()).into();
        constant_time_eq(&self.digest, &presented)
    }
}

pub fn apply<S>(router: Router<S>, secret: ClusterSecret) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(secret, cluster_middleware))
}

async fn cluster_middleware(
    State(secret): State<ClusterSecret>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let presented = req
        .headers()
        .get(CLUSTER_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if presented.is_empty() || !secret.verify(presented) {
        tracing::warn!(path = %req.uri().path(), "cluster token rejected");
        return Err(AppError::Unauthorized(DenyReason::InvalidClusterToken));
    }

    Ok(next.run(req).await)
}
