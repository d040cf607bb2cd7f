//! Persistence seams for the auth core
//!
//! The user table and the revocation list are owned by external storage.
//! The auth core talks to them only through these traits, and every call
//! is expected to be bounded with [`bounded`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;

use crate::models::{CredentialRecord, EnsuredUser, NewUser};
use crate::{Result, StoreError};

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryBlacklistStore, InMemoryUserStore};
pub use postgres::{connect, PgBlacklistStore, PgUserStore};

/// Read access to users and their credentials
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by login email
    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>>;

    /// Insert a user unless the email is already taken
    async fn ensure_user(&self, user: NewUser) -> Result<EnsuredUser>;
}

/// Revoked token identifiers keyed by `jti`.
///
/// Entries keep the token's original expiry so they can be swept once the
/// token would be rejected by its own `exp` anyway.
#[async_trait]
pub trait BlacklistStore: Send + Sync {
    /// Whether the identifier has been revoked
    async fn is_blacklisted(&self, jti: &str) -> Result<bool>;

    /// Record a revocation. Inserting an existing `jti` succeeds without change.
    async fn blacklist(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// Delete entries with `expires_at < now`, returning how many were removed
    async fn sweep(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Run a store call with an upper time bound.
///
/// An elapsed deadline is reported as [`StoreError::Timeout`] so callers
/// treat it exactly like a storage failure.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_through_result() {
        let ok = bounded(Duration::from_millis(100), async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err: Result<()> = bounded(Duration::from_millis(100), async {
            Err(StoreError::Database("boom".to_string()))
        })
        .await;
        assert!(matches!(err, Err(StoreError::Database(_))));
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let limit = Duration::from_millis(20);
        let result: Result<()> = bounded(limit, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(StoreError::Timeout(d)) if d == limit));
    }
}
