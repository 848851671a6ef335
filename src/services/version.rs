//! Best-effort check for a newer release.
//!
//! `VERSION_CHECK_URL` must answer with a release document carrying
//! `tag_name` (e.g. a GitHub "latest release" endpoint). The result is
//! published on a watch channel; failures only show up in logs and health.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use url::Url;

use crate::services::alarm::{Alarm, AlarmSink};
use crate::services::supervisor::{RetryPolicy, TaskHealth, retry};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

pub const CHECK_RETRY: RetryPolicy = RetryPolicy {
    max_attempts: 3,
    base_delay: Duration::from_secs(2),
    max_delay: Duration::from_secs(30),
};

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("version check request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("release tag {0:?} is not a version")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub current: &'static str,
    pub latest: Option<String>,
    pub update_available: bool,
}

impl VersionInfo {
    pub fn new(latest: Option<String>) -> Self {
        let update_available = latest.as_deref().is_some_and(|l| is_newer(l, VERSION));
        Self {
            current: VERSION,
            latest,
            update_available,
        }
    }
}

/// `major.minor.patch` with an optional leading `v`; pre-release and build
/// suffixes are ignored.
pub fn parse_version(raw: &str) -> Option<(u64, u64, u64)> {
    let core = raw.trim().trim_start_matches('v');
    let core = core.split(['-', '+']).next()?;
    let mut parts = core.split('.').map(|p| p.parse::<u64>().ok());
    let major = parts.next()??;
    let minor = parts.next().unwrap_or(Some(0))?;
    let patch = parts.next().unwrap_or(Some(0))?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}

pub fn is_newer(candidate: &str, current: &str) -> bool {
    match (parse_version(candidate), parse_version(current)) {
        (Some(c), Some(r)) => c > r,
        _ => false,
    }
}

#[derive(Clone)]
pub struct VersionChecker {
    http: reqwest::Client,
    url: Url,
}

impl VersionChecker {
    pub fn new(url: Url) -> Result<Self, VersionError> {
        let http = reqwest::Client::builder()
            .timeout(CHECK_TIMEOUT)
            .user_agent(concat!("taskgate/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, url })
    }

    pub async fn latest(&self) -> Result<String, VersionError> {
        let release: Release = self
            .http
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if parse_version(&release.tag_name).is_none() {
            return Err(VersionError::Malformed(release.tag_name));
        }
        Ok(release.tag_name)
    }
}

/// Runs one supervised check in the background.
pub fn spawn_version_check(
    checker: VersionChecker,
    alarm: Arc<dyn AlarmSink>,
    latest: watch::Sender<Option<String>>,
    health: watch::Sender<TaskHealth>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Ok(tag) = retry("version_check", &CHECK_RETRY, &health, || checker.latest()).await else {
            return;
        };

        tracing::info!(current = VERSION, latest = %tag, "version check finished");
        if is_newer(&tag, VERSION) {
            alarm.notify(Alarm::UpdateAvailable {
                current: VERSION.to_string(),
                latest: tag.clone(),
            });
        }
        latest.send_replace(Some(tag));
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tags() {
        assert_eq!(parse_version("v1.2.3"), Some((1, 2, 3)));
        assert_eq!(parse_version("1.2"), Some((1, 2, 0)));
        assert_eq!(parse_version("2.0.0-rc.1"), Some((2, 0, 0)));
        assert_eq!(parse_version("latest"), None);
        assert_eq!(parse_version("1.2.3.4"), None);
    }

    #[test]
    fn compares_numerically() {
        assert!(is_newer("v0.10.0", "0.9.9"));
        assert!(!is_newer("v0.1.0", "0.1.0"));
        assert!(!is_newer("garbage", "0.1.0"));
    }

    #[test]
    fn info_without_check_result() {
        let info = VersionInfo::new(None);
        assert_eq!(info.current, VERSION);
        assert!(!info.update_available);
    }
}
