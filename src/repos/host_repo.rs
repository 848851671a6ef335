/*
 * Responsibility
 * - worker registration records, keyed by "ip:port"
 * - repeated registration from the same address updates the row in place
 */
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::repos::error::RepoResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostRecord {
    pub addr: String,
    pub ip: String,
    pub port: u16,
    pub version: String,
    pub last_seen: DateTime<Utc>,
}

impl HostRecord {
    pub fn new(ip: impl Into<String>, port: u16, version: impl Into<String>, now: DateTime<Utc>) -> Self {
        let ip = ip.into();
        Self {
            addr: host_addr(&ip, port),
            ip,
            port,
            version: version.into(),
            last_seen: now,
        }
    }

    pub fn is_online(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.last_seen <= ttl
    }
}

pub fn host_addr(ip: &str, port: u16) -> String {
    // IPv6 literals need brackets to stay unambiguous.
    if ip.contains(':') {
        format!("[{ip}]:{port}")
    } else {
        format!("{ip}:{port}")
    }
}

#[async_trait]
pub trait HostStore: Send + Sync {
    // Returns true when the address was not known before.
    async fn upsert(&self, record: &HostRecord) -> RepoResult<bool>;

    async fn list(&self) -> RepoResult<Vec<HostRecord>>;
}

#[derive(Debug, FromRow)]
struct HostRow {
    addr: String,
    ip: String,
    port: i32,
    version: String,
    last_seen: DateTime<Utc>,
}

impl From<HostRow> for HostRecord {
    fn from(row: HostRow) -> Self {
        Self {
            addr: row.addr,
            ip: row.ip,
            port: u16::try_from(row.port).unwrap_or_default(),
            version: row.version,
            last_seen: row.last_seen,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PgHostRepo {
    pool: PgPool,
}

impl PgHostRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HostStore for PgHostRepo {
    async fn upsert(&self, record: &HostRecord) -> RepoResult<bool> {
        // xmax = 0 only for freshly inserted tuples
        let inserted = sqlx::query_scalar::<_, bool>(
            r#"
            INSERT INTO hosts (addr, ip, port, version, last_seen)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (addr) DO UPDATE
            SET version = EXCLUDED.version,
                last_seen = EXCLUDED.last_seen
            RETURNING (xmax = 0)
            "#,
        )
        .bind(&record.addr)
        .bind(&record.ip)
        .bind(i32::from(record.port))
        .bind(&record.version)
        .bind(record.last_seen)
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }

    async fn list(&self) -> RepoResult<Vec<HostRecord>> {
        let rows = sqlx::query_as::<_, HostRow>(
            r#"
            SELECT addr, ip, port, version, last_seen
            FROM hosts
            ORDER BY addr
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(HostRecord::from).collect())
    }
}
