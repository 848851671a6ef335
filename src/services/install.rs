//! First-run installation.
//!
//! The flag read and the install routine both run under the store deadline.
//! The routine itself (admin + seed policy + flag) is one unit in the store,
//! so a failure leaves the system uninstalled and a lost race reports
//! `AlreadyInstalled`.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::repos::error::{RepoError, RepoResult, within};
use crate::repos::install_repo::{InstallOutcome, InstallStore, NewAdmin};
use crate::services::auth::password::hash_password;
use crate::services::policy::{PolicyEngine, default_policy};

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    Required,
    Installed,
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("system is already installed")]
    AlreadyInstalled,
    #[error("install store: {0}")]
    Store(#[from] RepoError),
}

pub struct InstallService {
    store: Arc<dyn InstallStore>,
    policy: Arc<dyn PolicyEngine>,
    max_query_time: Duration,
}

impl InstallService {
    pub fn new(
        store: Arc<dyn InstallStore>,
        policy: Arc<dyn PolicyEngine>,
        max_query_time: Duration,
    ) -> Self {
        Self {
            store,
            policy,
            max_query_time,
        }
    }

    pub async fn status(&self) -> RepoResult<InstallStatus> {
        let installed = within(self.max_query_time, self.store.is_installed()).await?;
        Ok(if installed {
            InstallStatus::Installed
        } else {
            InstallStatus::Required
        })
    }

    /// Creates the admin account and seeds the default policy.
    /// Callers validate `name` / `password` beforehand.
    pub async fn install(&self, name: &str, password: &str) -> Result<NewAdmin, InstallError> {
        let admin = NewAdmin {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            role: ADMIN_ROLE.to_string(),
            password_hash: hash_password(password),
        };
        let seed = default_policy();

        match within(self.max_query_time, self.store.install(&admin, &seed)).await? {
            InstallOutcome::AlreadyInstalled => return Err(InstallError::AlreadyInstalled),
            InstallOutcome::Installed => {}
        }
        tracing::info!(uid = %admin.id, name = %admin.name, "system installed");

        // Installed state is committed; a failed reload only delays the new rules.
        if let Err(e) = self.policy.reload().await {
            tracing::error!(error = %e, "policy reload after install failed");
        }

        Ok(admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::memory::MemoryStore;
    use crate::services::policy::RulePolicyEngine;

    async fn service(store: &MemoryStore) -> (InstallService, Arc<RulePolicyEngine>) {
        let engine = Arc::new(RulePolicyEngine::load(Arc::new(store.clone())).await.unwrap());
        let svc = InstallService::new(
            Arc::new(store.clone()),
            engine.clone(),
            Duration::from_millis(200),
        );
        (svc, engine)
    }

    #[tokio::test]
    async fn install_creates_admin_and_reloads_policy() {
        let store = MemoryStore::new();
        let (svc, engine) = service(&store).await;
        assert_eq!(svc.status().await.unwrap(), InstallStatus::Required);

        let admin = svc.install("root", "password123").await.unwrap();

        assert_eq!(svc.status().await.unwrap(), InstallStatus::Installed);
        let row = store.user_by_name("root").unwrap();
        assert_eq!(row.id, admin.id);
        assert_eq!(row.role, ADMIN_ROLE);
        assert_ne!(row.password_hash, "password123");
        assert!(
            engine
                .enforce(&admin.id, ADMIN_ROLE, "/api/v1/host", "GET")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn second_install_is_rejected_without_mutation() {
        let store = MemoryStore::new();
        let (svc, _) = service(&store).await;
        svc.install("root", "password123").await.unwrap();

        let err = svc.install("other", "password456").await.unwrap_err();

        assert!(matches!(err, InstallError::AlreadyInstalled));
        assert_eq!(store.user_count(), 1);
        assert!(store.user_by_name("other").is_none());
    }

    #[tokio::test]
    async fn failed_routine_leaves_system_uninstalled() {
        let store = MemoryStore::new();
        let (svc, _) = service(&store).await;
        store.set_fail_install_midway(true);

        let err = svc.install("root", "password123").await.unwrap_err();

        assert!(matches!(err, InstallError::Store(_)));
        assert!(!store.installed());
        assert_eq!(store.user_count(), 0);
        assert!(store.rules().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_flag_read_times_out() {
        let store = MemoryStore::new();
        let (svc, _) = service(&store).await;
        store.set_delay(Some(Duration::from_secs(5)));

        let err = svc.status().await.unwrap_err();
        assert!(err.is_timeout());
    }
}
