//! HTTP-level middleware applied to the whole router.
//!
//! - Request-Id generation + propagation (`x-request-id`)
//! - access log with the business `code` carried in response extensions
//! - body size limit
//! - request timeout (from `REQUEST_TIMEOUT_SECONDS`)

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::error_handling::HandleErrorLayer;
use axum::http::{Response, StatusCode, header::HeaderName};
use tower::timeout::TimeoutLayer;
use tower::{BoxError, ServiceBuilder};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::response::RespCode;

const BODY_LIMIT_BYTES: usize = 1024 * 1024;

pub fn apply(router: Router, request_timeout: Duration) -> Router {
    let request_id_header = HeaderName::from_static("x-request-id");

    let layers = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|err: BoxError| async move {
            if err.is::<tower::timeout::error::Elapsed>() {
                StatusCode::REQUEST_TIMEOUT
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }))
        .layer(SetRequestIdLayer::new(
            request_id_header.clone(),
            MakeRequestUuid,
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http().on_response(
            |res: &Response<Body>, latency: Duration, _span: &Span| {
                let code = res.extensions().get::<RespCode>().map(|c| c.code());
                tracing::info!(
                    status = res.status().as_u16(),
                    code,
                    latency_ms = latency.as_millis() as u64,
                    "request finished"
                );
            },
        ));

    router.layer(layers)
}
