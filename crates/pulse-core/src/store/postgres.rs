//! PostgreSQL-backed stores
//!
//! Schema lives in `migrations/`. Roles are a lookup table joined on read;
//! the role name is lowercased so it matches the labels carried in tokens.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;
use uuid::Uuid;

use super::{BlacklistStore, UserStore};
use crate::config::DatabaseConfig;
use crate::models::{normalize_role, CredentialRecord, EnsuredUser, NewUser, Principal};
use crate::{Result, StoreError};

/// Open a connection pool
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.pool_size)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(&config.url)
        .await
        .map_err(|e| StoreError::Database(format!("PostgreSQL connection failed: {e}")))?;

    tracing::info!(pool_size = config.pool_size, "connected to PostgreSQL");
    Ok(pool)
}

/// User row joined with its role name
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    is_verified: bool,
}

impl From<UserRow> for CredentialRecord {
    fn from(row: UserRow) -> Self {
        CredentialRecord {
            principal: Principal {
                id: row.id,
                username: row.username,
                email: row.email,
                role: normalize_role(&row.role),
                is_verified: row.is_verified,
            },
            password_hash: row.password_hash,
        }
    }
}

/// Users table access
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT
                u.id, u.username, u.email, u.password AS password_hash,
                r.name AS role, u.is_verified
            FROM users u
            JOIN roles r ON u.role_id = r.id
            WHERE u.email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to fetch user: {e}")))?;

        Ok(row.map(CredentialRecord::from))
    }

    async fn ensure_user(&self, user: NewUser) -> Result<EnsuredUser> {
        let role = normalize_role(&user.role);

        let inserted: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO users (id, username, email, password, role_id)
            SELECT $1, $2, $3, $4, r.id FROM roles r WHERE lower(r.name) = $5
            ON CONFLICT (email) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&role)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to create user: {e}")))?;

        if inserted.is_none() {
            tracing::debug!(email = %user.email, "user already exists, insert skipped");
        }

        let record = self.find_by_email(&user.email).await?.ok_or_else(|| {
            StoreError::Database(format!("Role '{role}' does not exist; run migrations first"))
        })?;

        Ok(EnsuredUser {
            principal: record.into_principal(),
            created: inserted.is_some(),
        })
    }
}

/// `token_blacklist` table access
#[derive(Clone)]
pub struct PgBlacklistStore {
    pool: PgPool,
}

impl PgBlacklistStore {
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlacklistStore for PgBlacklistStore {
    async fn is_blacklisted(&self, jti: &str) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM token_blacklist WHERE jti = $1)",
        )
        .bind(jti)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to check blacklist: {e}")))
    }

    async fn blacklist(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "INSERT INTO token_blacklist (jti, expires_at) VALUES ($1, $2) ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to blacklist token: {e}")))?;

        Ok(())
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM token_blacklist WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to sweep blacklist: {e}")))?;

        tracing::debug!(removed = result.rows_affected(), "blacklist rows deleted");
        Ok(result.rows_affected())
    }
}
