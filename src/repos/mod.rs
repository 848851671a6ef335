/*
 * Responsibility
 * - store seams (traits) and their Postgres / in-memory implementations
 * - Storage bundles the handles the server wires into its services
 */
use std::sync::Arc;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::StorageConfig;

pub mod error;
pub mod host_repo;
pub mod install_repo;
pub mod memory;
pub mod policy_repo;
pub mod user_repo;

pub use error::{RepoError, RepoResult, within};
pub use host_repo::{HostRecord, HostStore};
pub use install_repo::{InstallOutcome, InstallStore, NewAdmin};
pub use memory::MemoryStore;
pub use policy_repo::{PolicyRule, PolicyStore};
pub use user_repo::{UserRow, UserStore};

const MEMORY_URL: &str = "memory:";

#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserStore>,
    pub policy: Arc<dyn PolicyStore>,
    pub install: Arc<dyn InstallStore>,
    pub hosts: Arc<dyn HostStore>,
}

impl Storage {
    /// Connects and migrates. `memory:` selects the in-process store.
    pub async fn connect(config: &StorageConfig) -> RepoResult<Self> {
        if config.database_url == MEMORY_URL {
            tracing::warn!("using in-memory storage; state is lost on exit");
            return Ok(Self::memory(MemoryStore::new()));
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.max_query_time)
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self::postgres(pool))
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(user_repo::PgUserRepo::new(pool.clone())),
            policy: Arc::new(policy_repo::PgPolicyRepo::new(pool.clone())),
            install: Arc::new(install_repo::PgInstallRepo::new(pool.clone())),
            hosts: Arc::new(host_repo::PgHostRepo::new(pool)),
        }
    }

    pub fn memory(store: MemoryStore) -> Self {
        Self {
            users: Arc::new(store.clone()),
            policy: Arc::new(store.clone()),
            install: Arc::new(store.clone()),
            hosts: Arc::new(store),
        }
    }
}
