//! Management server bootstrap.
//!
//! Order, each fatal step aborting startup: configuration, logging, alarm
//! sink, storage, policy engine, version check (background, best effort),
//! listener, scheduler, serve. Nothing is rolled back on failure.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::api;
use crate::api::v1::handlers::health::{not_found, root};
use crate::app::{BootstrapError, init_panic_hook, init_tracing, shutdown_signal};
use crate::config::ServerConfig;
use crate::middleware::auth::{ClusterSecret, ExclusionSet, Gate};
use crate::middleware::{self, auth};
use crate::repos::Storage;
use crate::services::alarm::{AlarmSink, LogAlarm};
use crate::services::auth::{Authorizer, JwtIssuer, TokenVerifier};
use crate::services::install::InstallService;
use crate::services::policy::{PolicyEngine, RulePolicyEngine};
use crate::services::registry::HostRegistry;
use crate::services::scheduler::HostScheduler;
use crate::services::supervisor::health_channel;
use crate::services::version::{VersionChecker, spawn_version_check};
use crate::state::AppState;

pub async fn run(path: &Path) -> Result<(), BootstrapError> {
    let config = ServerConfig::load(path)?;
    init_tracing(&config.log)?;
    init_panic_hook(!config.app_env.is_production());
    tracing::info!(?config, "starting server");

    let alarm: Arc<dyn AlarmSink> = Arc::new(LogAlarm);
    let storage = Storage::connect(&config.storage)
        .await
        .map_err(BootstrapError::Storage)?;

    let server = Server::build(&config, storage, alarm).await?;

    let listener = TcpListener::bind(config.addr)
        .await
        .map_err(|source| BootstrapError::Bind {
            addr: config.addr,
            source,
        })?;

    server.serve(listener).await
}

/// A fully wired server that has not started listening yet.
pub struct Server {
    router: Router,
    scheduler: Arc<HostScheduler>,
}

impl Server {
    pub async fn build(
        config: &ServerConfig,
        storage: Storage,
        alarm: Arc<dyn AlarmSink>,
    ) -> Result<Self, BootstrapError> {
        let max_query_time = config.storage.max_query_time;

        let policy: Arc<dyn PolicyEngine> =
            Arc::new(RulePolicyEngine::load(storage.policy.clone()).await?);

        let (latest_tx, latest_rx) = watch::channel(None);
        match &config.version_check_url {
            Some(url) => match VersionChecker::new(url.clone()) {
                Ok(checker) => {
                    let (health, _) = health_channel();
                    spawn_version_check(checker, alarm.clone(), latest_tx, health);
                }
                Err(e) => tracing::warn!(error = %e, "version check disabled"),
            },
            None => tracing::debug!("no VERSION_CHECK_URL; version check skipped"),
        }

        let scheduler = Arc::new(HostScheduler::new(
            storage.hosts.clone(),
            config.host_online_ttl,
            max_query_time,
        ));

        let authorizer = Arc::new(Authorizer::new(
            TokenVerifier::new(&config.jwt_secret),
            storage.users.clone(),
            policy.clone(),
            max_query_time,
        ));
        let gate = Gate::new(ExclusionSet::default(), authorizer);

        let state = AppState {
            users: storage.users.clone(),
            issuer: Arc::new(JwtIssuer::new(
                &config.jwt_secret,
                config.access_token_ttl_seconds,
            )),
            install: Arc::new(InstallService::new(
                storage.install.clone(),
                policy,
                max_query_time,
            )),
            registry: Arc::new(HostRegistry::new(storage.hosts, alarm, max_query_time)),
            scheduler: scheduler.clone(),
            latest_version: latest_rx,
            max_query_time,
        };

        let router = build_router(
            state,
            gate,
            ClusterSecret::new(&config.cluster_secret),
            config,
        );

        Ok(Self { router, scheduler })
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn serve(self, listener: TcpListener) -> Result<(), BootstrapError> {
        self.scheduler
            .init()
            .await
            .map_err(BootstrapError::Scheduler)?;

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, "server listening");
        }

        // Connect info feeds the worker ip into registration.
        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(BootstrapError::Serve)
    }
}

fn build_router(state: AppState, gate: Gate, cluster: ClusterSecret, config: &ServerConfig) -> Router {
    let gated = Router::new()
        .route("/", get(root))
        .nest("/api/v1", api::v1::routes())
        .fallback(not_found);
    let gated = auth::gate::apply(gated, gate);

    let internal = Router::new().nest("/internal/v1", api::internal::routes());
    let internal = auth::cluster::apply(internal, cluster);

    let app = gated.merge(internal).with_state(state);
    middleware::http::apply(app, config.request_timeout)
}
