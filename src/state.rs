/*
 * Responsibility
 * - shared context handed to every handler (AppState)
 * - clone is cheap: everything sits behind Arc or a watch receiver
 */
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::repos::user_repo::UserStore;
use crate::services::auth::JwtIssuer;
use crate::services::install::InstallService;
use crate::services::registry::HostRegistry;
use crate::services::scheduler::HostScheduler;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub issuer: Arc<JwtIssuer>,
    pub install: Arc<InstallService>,
    pub registry: Arc<HostRegistry>,
    pub scheduler: Arc<HostScheduler>,
    // Latest release tag seen by the background version check.
    pub latest_version: watch::Receiver<Option<String>>,
    pub max_query_time: Duration,
}
