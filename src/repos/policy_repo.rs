use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::repos::error::RepoResult;

/// `(subject-or-role, path pattern, action) -> allow`
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct PolicyRule {
    pub subject: String,
    pub path: String,
    pub action: String,
}

impl PolicyRule {
    pub fn new(
        subject: impl Into<String>,
        path: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            path: path.into(),
            action: action.into(),
        }
    }
}

#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn load_rules(&self) -> RepoResult<Vec<PolicyRule>>;
}

#[derive(Clone, Debug)]
pub struct PgPolicyRepo {
    pool: PgPool,
}

impl PgPolicyRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PolicyStore for PgPolicyRepo {
    async fn load_rules(&self) -> RepoResult<Vec<PolicyRule>> {
        let rows = sqlx::query_as::<_, PolicyRule>(
            r#"
            SELECT subject, path, action
            FROM policy_rules
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
