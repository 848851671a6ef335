/*
 * Responsibility
 * - users table access (read-only from the request path)
 * - UserStore is the seam the authorizer and login handler depend on
 */
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use crate::repos::error::RepoResult;

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub role: String,
    pub password_hash: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn exists(&self, uid: &str) -> RepoResult<bool>;

    // None when the user has been removed.
    async fn role_of(&self, uid: &str) -> RepoResult<Option<String>>;

    async fn find_by_name(&self, name: &str) -> RepoResult<Option<UserRow>>;
}

#[derive(Clone, Debug)]
pub struct PgUserRepo {
    pool: PgPool,
}

impl PgUserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserRepo {
    async fn exists(&self, uid: &str) -> RepoResult<bool> {
        let found = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)
            "#,
        )
        .bind(uid)
        .fetch_one(&self.pool)
        .await?;

        Ok(found)
    }

    async fn role_of(&self, uid: &str) -> RepoResult<Option<String>> {
        let role = sqlx::query_scalar::<_, String>(
            r#"
            SELECT role
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }

    async fn find_by_name(&self, name: &str) -> RepoResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, role, password_hash
            FROM users
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
