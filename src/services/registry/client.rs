//! Worker side of the registration handshake.
//!
//! The worker advertises `(version, port)` where `port` is the port its
//! listener actually bound. Registration runs in a background task under the
//! supervisor: bounded retries first, then a heartbeat that re-registers to
//! keep `last_seen` fresh. Nothing here blocks the worker from serving.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use url::Url;

use crate::middleware::auth::cluster::CLUSTER_TOKEN_HEADER;
use crate::services::supervisor::{RetryPolicy, TaskHealth, retry};

pub const REGISTRY_PATH: &str = "/internal/v1/host/registry";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRequest {
    pub version: String,
    pub port: u16,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid server url: {0}")]
    Url(#[from] url::ParseError),
    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server rejected registration ({status}): {body}")]
    Rejected { status: StatusCode, body: String },
}

#[derive(Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    endpoint: Url,
    cluster_secret: String,
}

impl RegistryClient {
    pub fn new(server_url: &Url, cluster_secret: impl Into<String>) -> Result<Self, RegistryError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            endpoint: server_url.join(REGISTRY_PATH)?,
            cluster_secret: cluster_secret.into(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn register(&self, request: &RegistryRequest) -> Result<(), RegistryError> {
        let res = self
            .http
            .post(self.endpoint.clone())
            .header(CLUSTER_TOKEN_HEADER, &self.cluster_secret)
            .json(request)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(RegistryError::Rejected { status, body });
        }

        tracing::info!(
            endpoint = %self.endpoint,
            version = %request.version,
            port = request.port,
            "registered with server"
        );
        Ok(())
    }
}

/// Spawns the supervised registration loop. Progress is published on `health`.
pub fn spawn_registration(
    client: RegistryClient,
    request: RegistryRequest,
    policy: RetryPolicy,
    heartbeat: Option<Duration>,
    health: watch::Sender<TaskHealth>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            // Errors are already logged and published as health.
            let _ = retry("registry", &policy, &health, || client.register(&request)).await;

            match heartbeat {
                Some(interval) => tokio::time::sleep(interval).await,
                None => break,
            }
        }
    })
}
