/*
 * Responsibility
 * - process-level setup shared by both roles (tracing, panic hook)
 * - BootstrapError: one variant per fatal startup step
 */
use std::net::SocketAddr;
use std::{io, panic, process};

use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{ConfigError, LogConfig, LogFormat};
use crate::repos::error::RepoError;
use crate::services::policy::PolicyError;
use crate::services::registry::RegistryError;

pub mod server;
pub mod worker;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("logging: {0}")]
    Logging(String),
    #[error("storage: {0}")]
    Storage(#[source] RepoError),
    #[error("policy engine: {0}")]
    Policy(#[from] PolicyError),
    #[error("bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("scheduler: {0}")]
    Scheduler(#[source] RepoError),
    #[error("registry client: {0}")]
    Registry(#[from] RegistryError),
    #[error("serve: {0}")]
    Serve(#[source] io::Error),
}

pub fn init_tracing(log: &LogConfig) -> Result<(), BootstrapError> {
    // Ex:
    // RUST_LOG=info,taskgate=debug,tower_http=debug taskgate server -c taskgate.env
    let filter =
        EnvFilter::try_new(&log.filter).map_err(|e| BootstrapError::Logging(e.to_string()))?;
    let registry = tracing_subscriber::registry().with(filter);

    let res = match log.format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    };
    res.map_err(|e| BootstrapError::Logging(e.to_string()))
}

pub fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // stderr can be hidden depending on how the process is launched
        tracing::error!(?info, "panic");

        // development fails fast so panics get noticed
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub(crate) async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
