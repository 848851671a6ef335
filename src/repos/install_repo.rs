use async_trait::async_trait;
use sqlx::PgPool;

use crate::repos::error::RepoResult;
use crate::repos::policy_repo::PolicyRule;

/// Admin identity created by the install routine.
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub id: String,
    pub name: String,
    pub role: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    AlreadyInstalled,
}

#[async_trait]
pub trait InstallStore: Send + Sync {
    async fn is_installed(&self) -> RepoResult<bool>;

    // Create admin, seed policy and flip the flag as one unit.
    // Re-checks the flag inside the unit so concurrent installs cannot both win.
    async fn install(&self, admin: &NewAdmin, seed: &[PolicyRule]) -> RepoResult<InstallOutcome>;
}

#[derive(Clone, Debug)]
pub struct PgInstallRepo {
    pool: PgPool,
}

impl PgInstallRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InstallStore for PgInstallRepo {
    async fn is_installed(&self) -> RepoResult<bool> {
        let installed = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT installed
            FROM install_state
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(installed.unwrap_or(false))
    }

    async fn install(&self, admin: &NewAdmin, seed: &[PolicyRule]) -> RepoResult<InstallOutcome> {
        // Dropping `tx` without commit rolls everything back.
        let mut tx = self.pool.begin().await?;

        let installed = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT installed
            FROM install_state
            WHERE id = 1
            FOR UPDATE
            "#,
        )
        .fetch_one(&mut *tx)
        .await?;

        if installed {
            tx.rollback().await?;
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        sqlx::query(
            r#"
            INSERT INTO users (id, name, role, password_hash)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&admin.id)
        .bind(&admin.name)
        .bind(&admin.role)
        .bind(&admin.password_hash)
        .execute(&mut *tx)
        .await?;

        for rule in seed {
            sqlx::query(
                r#"
                INSERT INTO policy_rules (subject, path, action)
                VALUES ($1, $2, $3)
                ON CONFLICT (subject, path, action) DO NOTHING
                "#,
            )
            .bind(&rule.subject)
            .bind(&rule.path)
            .bind(&rule.action)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            UPDATE install_state
            SET installed = true, installed_at = now()
            WHERE id = 1
            "#,
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(InstallOutcome::Installed)
    }
}
