//! In-process implementation of every store seam.
//!
//! Selected with `DATABASE_URL=memory:` for local development, and used by the
//! test suites. Failure and latency can be injected to exercise fault paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::repos::error::{RepoError, RepoResult};
use crate::repos::host_repo::{HostRecord, HostStore};
use crate::repos::install_repo::{InstallOutcome, InstallStore, NewAdmin};
use crate::repos::policy_repo::{PolicyRule, PolicyStore};
use crate::repos::user_repo::{UserRow, UserStore};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<String, UserRow>,
    rules: Vec<PolicyRule>,
    installed: bool,
    hosts: BTreeMap<String, HostRecord>,
}

#[derive(Debug, Default, Clone)]
struct Faults {
    failing: bool,
    delay: Option<Duration>,
    fail_install_midway: bool,
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<MemoryState>,
    faults: Mutex<Faults>,
}

/// Cheap to clone; clones share state.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn faults(&self) -> Faults {
        self.inner
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update_faults(&self, f: impl FnOnce(&mut Faults)) {
        let mut faults = self.inner.faults.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut faults);
    }

    // Applied before every store call.
    async fn gate(&self) -> RepoResult<()> {
        let faults = self.faults();
        if let Some(delay) = faults.delay {
            tokio::time::sleep(delay).await;
        }
        if faults.failing {
            return Err(RepoError::Unavailable("memory store failing".into()));
        }
        Ok(())
    }

    /// Every call fails with `RepoError::Unavailable` while set.
    pub fn set_failing(&self, failing: bool) {
        self.update_faults(|f| f.failing = failing);
    }

    /// Every call sleeps this long before answering.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.update_faults(|f| f.delay = delay);
    }

    /// `install` fails after staging the admin user, before seeding policy.
    pub fn set_fail_install_midway(&self, fail: bool) {
        self.update_faults(|f| f.fail_install_midway = fail);
    }

    pub fn insert_user(&self, user: UserRow) {
        self.state().users.insert(user.id.clone(), user);
    }

    pub fn remove_user(&self, uid: &str) -> Option<UserRow> {
        self.state().users.remove(uid)
    }

    pub fn user_by_name(&self, name: &str) -> Option<UserRow> {
        self.state().users.values().find(|u| u.name == name).cloned()
    }

    pub fn user_count(&self) -> usize {
        self.state().users.len()
    }

    pub fn set_rules(&self, rules: Vec<PolicyRule>) {
        self.state().rules = rules;
    }

    pub fn rules(&self) -> Vec<PolicyRule> {
        self.state().rules.clone()
    }

    pub fn installed(&self) -> bool {
        self.state().installed
    }

    pub fn hosts(&self) -> Vec<HostRecord> {
        self.state().hosts.values().cloned().collect()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn exists(&self, uid: &str) -> RepoResult<bool> {
        self.gate().await?;
        Ok(self.state().users.contains_key(uid))
    }

    async fn role_of(&self, uid: &str) -> RepoResult<Option<String>> {
        self.gate().await?;
        Ok(self.state().users.get(uid).map(|u| u.role.clone()))
    }

    async fn find_by_name(&self, name: &str) -> RepoResult<Option<UserRow>> {
        self.gate().await?;
        Ok(self.user_by_name(name))
    }
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn load_rules(&self) -> RepoResult<Vec<PolicyRule>> {
        self.gate().await?;
        Ok(self.rules())
    }
}

#[async_trait]
impl InstallStore for MemoryStore {
    async fn is_installed(&self) -> RepoResult<bool> {
        self.gate().await?;
        Ok(self.installed())
    }

    async fn install(&self, admin: &NewAdmin, seed: &[PolicyRule]) -> RepoResult<InstallOutcome> {
        self.gate().await?;
        let fail_midway = self.faults().fail_install_midway;

        let mut state = self.state();
        if state.installed {
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        // Stage on copies; the live state only changes on the final swap.
        let mut users = state.users.clone();
        users.insert(
            admin.id.clone(),
            UserRow {
                id: admin.id.clone(),
                name: admin.name.clone(),
                role: admin.role.clone(),
                password_hash: admin.password_hash.clone(),
            },
        );

        if fail_midway {
            return Err(RepoError::Unavailable("install interrupted".into()));
        }

        let mut rules = state.rules.clone();
        for rule in seed {
            if !rules.contains(rule) {
                rules.push(rule.clone());
            }
        }

        state.users = users;
        state.rules = rules;
        state.installed = true;

        Ok(InstallOutcome::Installed)
    }
}

#[async_trait]
impl HostStore for MemoryStore {
    async fn upsert(&self, record: &HostRecord) -> RepoResult<bool> {
        self.gate().await?;
        let previous = self.state().hosts.insert(record.addr.clone(), record.clone());
        Ok(previous.is_none())
    }

    async fn list(&self) -> RepoResult<Vec<HostRecord>> {
        self.gate().await?;
        Ok(self.hosts())
    }
}
