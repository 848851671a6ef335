//! Worker bootstrap.
//!
//! The listener is bound before registration so the advertised port is the
//! one actually serving (an ephemeral `WORKER_PORT=0` included). Registration
//! runs in the background; `/health` answers from the first request on.

use std::path::Path;
use std::time::Duration;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::app::{BootstrapError, init_panic_hook, init_tracing, shutdown_signal};
use crate::config::WorkerConfig;
use crate::middleware;
use crate::services::executor::{ExecutorPool, PoolStatus};
use crate::services::registry::{RegistryClient, RegistryRequest, spawn_registration};
use crate::services::supervisor::{TaskHealth, health_channel};
use crate::services::version::VERSION;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
struct WorkerState {
    registration: watch::Receiver<TaskHealth>,
    pool: ExecutorPool,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    registration: TaskHealth,
    pool: PoolStatus,
}

pub async fn run(path: &Path) -> Result<(), BootstrapError> {
    let config = WorkerConfig::load(path)?;
    init_tracing(&config.log)?;
    init_panic_hook(!config.app_env.is_production());
    tracing::info!(?config, "starting worker");

    let pool = ExecutorPool::new(config.pool_size);

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .map_err(|source| BootstrapError::Bind {
            addr: config.listen_addr,
            source,
        })?;

    serve(&config, pool, listener).await
}

pub async fn serve(
    config: &WorkerConfig,
    pool: ExecutorPool,
    listener: TcpListener,
) -> Result<(), BootstrapError> {
    let local = listener
        .local_addr()
        .map_err(|source| BootstrapError::Bind {
            addr: config.listen_addr,
            source,
        })?;
    tracing::info!(addr = %local, "worker listening");

    let client = RegistryClient::new(&config.server_url, config.cluster_secret.clone())?;
    let (health, registration) = health_channel();
    spawn_registration(
        client,
        RegistryRequest {
            version: VERSION.to_string(),
            port: local.port(),
        },
        config.retry,
        config.heartbeat_interval,
        health,
    );

    let app = router(WorkerState { registration, pool });
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(BootstrapError::Serve)
}

fn router(state: WorkerState) -> Router {
    let app = Router::new()
        .route("/health", get(health))
        .with_state(state);
    middleware::http::apply(app, REQUEST_TIMEOUT)
}

// Always 200: registration trouble is reported, never fatal.
async fn health(State(state): State<WorkerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: VERSION,
        registration: state.registration.borrow().clone(),
        pool: state.pool.status(),
    })
}
