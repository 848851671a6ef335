/*
 * Responsibility
 * - the scheduling engine's view of registered workers
 * - liveness is derived from last_seen at read time
 */
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use crate::repos::error::{RepoResult, within};
use crate::repos::host_repo::{HostRecord, HostStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostStatus {
    #[serde(flatten)]
    pub record: HostRecord,
    pub online: bool,
}

pub struct HostScheduler {
    store: Arc<dyn HostStore>,
    online_ttl: chrono::Duration,
    max_query_time: Duration,
}

impl HostScheduler {
    pub fn new(store: Arc<dyn HostStore>, online_ttl: Duration, max_query_time: Duration) -> Self {
        Self {
            store,
            online_ttl: chrono::Duration::from_std(online_ttl).unwrap_or(chrono::Duration::MAX),
            max_query_time,
        }
    }

    /// Verifies the registration store is readable. Returns the number of online hosts.
    pub async fn init(&self) -> RepoResult<usize> {
        let hosts = self.hosts().await?;
        let online = hosts.iter().filter(|h| h.online).count();
        tracing::info!(known = hosts.len(), online, "scheduler initialised");
        Ok(online)
    }

    pub async fn hosts(&self) -> RepoResult<Vec<HostStatus>> {
        let now = Utc::now();
        let records = within(self.max_query_time, self.store.list()).await?;
        Ok(records
            .into_iter()
            .map(|record| HostStatus {
                online: record.is_online(now, self.online_ttl),
                record,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::memory::MemoryStore;

    #[tokio::test]
    async fn annotates_liveness() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .upsert(&HostRecord::new("10.0.0.1", 9000, "1.0.0", now))
            .await
            .unwrap();
        store
            .upsert(&HostRecord::new(
                "10.0.0.2",
                9000,
                "1.0.0",
                now - chrono::Duration::minutes(10),
            ))
            .await
            .unwrap();
        let scheduler = HostScheduler::new(
            Arc::new(store),
            Duration::from_secs(90),
            Duration::from_secs(1),
        );

        let hosts = scheduler.hosts().await.unwrap();
        let online: Vec<_> = hosts.iter().filter(|h| h.online).map(|h| h.record.ip.as_str()).collect();
        assert_eq!(online, vec!["10.0.0.1"]);
        assert_eq!(scheduler.init().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn init_fails_on_unreadable_store() {
        let store = MemoryStore::new();
        store.set_failing(true);
        let scheduler = HostScheduler::new(
            Arc::new(store),
            Duration::from_secs(90),
            Duration::from_secs(1),
        );
        assert!(scheduler.init().await.is_err());
    }

    #[test]
    fn status_serializes_flat() {
        let now = Utc::now();
        let status = HostStatus {
            record: HostRecord::new("10.0.0.1", 9000, "1.0.0", now),
            online: true,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["addr"], "10.0.0.1:9000");
        assert_eq!(json["online"], true);
    }
}
