//! Request gate: admission control in front of every management handler.
//!
//! - excluded routes go straight to the handler, the credential is never read
//! - otherwise the authorizer decides; Allow stores `AuthCtx` in request
//!   extensions and runs the handler, Deny / Fault short-circuit with an
//!   `AppError` response and no downstream code runs

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{OriginalUri, State},
    http::{Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::middleware::auth::exclusion::ExclusionSet;
use crate::services::auth::{Authorizer, Decision};

#[derive(Clone)]
pub struct Gate {
    exclusions: Arc<ExclusionSet>,
    authorizer: Arc<Authorizer>,
}

impl Gate {
    pub fn new(exclusions: ExclusionSet, authorizer: Arc<Authorizer>) -> Self {
        Self {
            exclusions: Arc::new(exclusions),
            authorizer,
        }
    }
}

/// Applies the gate to every route (and fallback) registered on `router` so far.
///
/// Example:
/// ```ignore
/// let app = Router::new().nest("/api/v1", api::v1::routes());
/// let app = middleware::auth::gate::apply(app, gate);
/// ```
pub fn apply<S>(router: Router<S>, gate: Gate) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(gate, gate_middleware))
}

async fn gate_middleware(
    State(gate): State<Gate>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    // Nested routers see a stripped uri; policy is written against full paths.
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map_or_else(|| req.uri().path(), |u| u.0.path())
        .to_owned();

    if gate.exclusions.is_excluded(&path) {
        return Ok(next.run(req).await);
    }

    let method = req.method().as_str().to_owned();
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let decision = gate
        .authorizer
        .authorize(authorization.as_deref(), &path, &method)
        .await;

    match decision {
        Decision::Allow(ctx) => {
            tracing::debug!(uid = %ctx.uid, %path, %method, "request admitted");
            // middleware -> extractor
            req.extensions_mut().insert(ctx);
            Ok(next.run(req).await)
        }
        Decision::Deny(reason) => {
            tracing::warn!(%reason, %path, %method, "request denied");
            Err(AppError::Unauthorized(reason))
        }
        Decision::Fault(err) => {
            tracing::error!(error = %err, %path, %method, "authorization fault");
            Err(AppError::Internal)
        }
    }
}
