use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::repos::error::{RepoResult, within};
use crate::repos::host_repo::{HostRecord, HostStore};
use crate::services::alarm::{Alarm, AlarmSink};

/// Server-side sink for worker registration messages.
pub struct HostRegistry {
    store: Arc<dyn HostStore>,
    alarm: Arc<dyn AlarmSink>,
    max_query_time: Duration,
}

impl HostRegistry {
    pub fn new(store: Arc<dyn HostStore>, alarm: Arc<dyn AlarmSink>, max_query_time: Duration) -> Self {
        Self {
            store,
            alarm,
            max_query_time,
        }
    }

    /// Upserts the record for `ip:port`, refreshing `last_seen`.
    pub async fn record(&self, ip: IpAddr, version: &str, port: u16) -> RepoResult<HostRecord> {
        // v4-mapped peers (dual-stack listeners) are stored as plain v4.
        let ip = ip.to_canonical();
        let record = HostRecord::new(ip.to_string(), port, version, Utc::now());

        let joined = within(self.max_query_time, self.store.upsert(&record)).await?;
        if joined {
            self.alarm.notify(Alarm::HostJoined {
                addr: record.addr.clone(),
                version: record.version.clone(),
            });
        } else {
            tracing::debug!(addr = %record.addr, version = %record.version, "worker heartbeat");
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;
    use std::sync::Mutex;

    use crate::repos::memory::MemoryStore;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Alarm>>);

    impl AlarmSink for Recorder {
        fn notify(&self, alarm: Alarm) {
            self.0.lock().unwrap().push(alarm);
        }
    }

    #[tokio::test]
    async fn alarms_once_per_new_address() {
        let store = MemoryStore::new();
        let alarms = Arc::new(Recorder::default());
        let registry = HostRegistry::new(Arc::new(store.clone()), alarms.clone(), Duration::from_secs(1));
        let ip: IpAddr = "10.1.2.3".parse().unwrap();

        registry.record(ip, "1.0.0", 9100).await.unwrap();
        let second = registry.record(ip, "1.0.1", 9100).await.unwrap();

        assert_eq!(second.version, "1.0.1");
        assert_eq!(store.hosts().len(), 1);
        assert_eq!(
            *alarms.0.lock().unwrap(),
            vec![Alarm::HostJoined {
                addr: "10.1.2.3:9100".into(),
                version: "1.0.0".into()
            }]
        );
    }

    #[tokio::test]
    async fn mapped_v4_peer_is_canonicalised() {
        let store = MemoryStore::new();
        let registry = HostRegistry::new(
            Arc::new(store.clone()),
            Arc::new(Recorder::default()),
            Duration::from_secs(1),
        );
        let mapped = IpAddr::V6(Ipv6Addr::from([0, 0, 0, 0, 0, 0xffff, 0x0a01, 0x0203]));

        let rec = registry.record(mapped, "1.0.0", 9100).await.unwrap();
        assert_eq!(rec.addr, "10.1.2.3:9100");
    }
}
