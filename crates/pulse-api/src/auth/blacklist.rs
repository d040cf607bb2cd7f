//! Token revocation on top of a [`BlacklistStore`]
//!
//! Every store call is bounded by the configured timeout. Reads fail
//! closed: if the store cannot answer, the caller gets
//! [`AuthError::StoreUnavailable`] and must not treat the token as valid.

use super::error::AuthError;
use super::jwt::Claims;
use crate::audit::{audit_log, AuditEvent};
use chrono::{DateTime, Utc};
use pulse_core::{bounded, BlacklistStore, Clock, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct TokenBlacklist {
    store: Arc<dyn BlacklistStore>,
    timeout: Duration,
}

impl TokenBlacklist {
    pub fn new(store: Arc<dyn BlacklistStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Whether `jti` has been revoked
    pub async fn is_revoked(&self, jti: &str) -> Result<bool, AuthError> {
        bounded(self.timeout, self.store.is_blacklisted(jti))
            .await
            .map_err(|e| {
                tracing::error!(jti = %jti, error = %e, "blacklist lookup failed, rejecting token");
                AuthError::from(e)
            })
    }

    /// Revoke a token until its own expiry
    pub async fn revoke(&self, claims: &Claims) -> Result<(), StoreError> {
        // An `exp` chrono cannot represent still has to be revoked; keep it forever.
        let expires_at = claims.expires_at().unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.revoke_jti(&claims.jti, expires_at).await
    }

    /// Revoke a bare identifier. Revoking an already revoked `jti` succeeds.
    pub async fn revoke_jti(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        bounded(self.timeout, self.store.blacklist(jti, expires_at)).await
    }

    /// Purge entries that expired before `now`
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        bounded(self.timeout, self.store.sweep(now)).await
    }

    /// Cheap readiness check against the backing store
    pub async fn probe(&self) -> Result<(), StoreError> {
        bounded(self.timeout, self.store.is_blacklisted("readiness-probe"))
            .await
            .map(|_| ())
    }
}

/// Run [`TokenBlacklist::sweep`] every `interval` until `shutdown` fires.
///
/// Missed ticks are skipped, not replayed. A failed sweep is logged and
/// retried on the next tick.
pub fn spawn_sweeper(
    blacklist: TokenBlacklist,
    clock: Arc<dyn Clock>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(interval_secs = interval.as_secs(), "blacklist sweeper started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    match blacklist.sweep(clock.now()).await {
                        Ok(removed) => audit_log(&AuditEvent::BlacklistSweep { removed }),
                        Err(e) => tracing::warn!(error = %e, "blacklist sweep failed"),
                    }
                }
            }
        }

        tracing::info!("blacklist sweeper stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::TokenType;
    use async_trait::async_trait;
    use pulse_core::store::InMemoryBlacklistStore;
    use pulse_core::ManualClock;

    struct FailingStore;

    #[async_trait]
    impl BlacklistStore for FailingStore {
        async fn is_blacklisted(&self, _jti: &str) -> pulse_core::Result<bool> {
            Err(StoreError::Database("connection refused".into()))
        }
        async fn blacklist(&self, _jti: &str, _at: DateTime<Utc>) -> pulse_core::Result<()> {
            Err(StoreError::Database("connection refused".into()))
        }
        async fn sweep(&self, _now: DateTime<Utc>) -> pulse_core::Result<u64> {
            Err(StoreError::Database("connection refused".into()))
        }
    }

    struct HangingStore;

    #[async_trait]
    impl BlacklistStore for HangingStore {
        async fn is_blacklisted(&self, _jti: &str) -> pulse_core::Result<bool> {
            std::future::pending().await
        }
        async fn blacklist(&self, _jti: &str, _at: DateTime<Utc>) -> pulse_core::Result<()> {
            std::future::pending().await
        }
        async fn sweep(&self, _now: DateTime<Utc>) -> pulse_core::Result<u64> {
            std::future::pending().await
        }
    }

    fn claims(jti: &str, exp: i64) -> Claims {
        Claims {
            sub: "a@x.com".to_string(),
            role: "viewer".to_string(),
            token_type: TokenType::Access,
            jti: jti.to_string(),
            iat: exp - 60,
            exp,
        }
    }

    fn memory() -> (TokenBlacklist, Arc<InMemoryBlacklistStore>) {
        let store = Arc::new(InMemoryBlacklistStore::new());
        (
            TokenBlacklist::new(store.clone(), Duration::from_millis(200)),
            store,
        )
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let (blacklist, store) = memory();
        let c = claims("jti-1", 1_700_000_000);

        blacklist.revoke(&c).await.unwrap();
        blacklist.revoke(&c).await.unwrap();

        assert!(blacklist.is_revoked("jti-1").await.unwrap());
        assert!(!blacklist.is_revoked("jti-2").await.unwrap());
        assert_eq!(store.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_entry_keeps_token_expiry() {
        let (blacklist, store) = memory();
        blacklist.revoke(&claims("jti-1", 1_700_000_000)).await.unwrap();

        let entries = store.entries().await;
        assert_eq!(entries[0].expires_at.timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn test_unrepresentable_expiry_kept_forever() {
        let (blacklist, store) = memory();
        blacklist.revoke(&claims("jti-1", i64::MAX)).await.unwrap();

        let entries = store.entries().await;
        assert_eq!(entries[0].expires_at, DateTime::<Utc>::MAX_UTC);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_stale_entries() {
        let (blacklist, _) = memory();
        blacklist.revoke(&claims("old", 1_000)).await.unwrap();
        blacklist.revoke(&claims("new", 5_000)).await.unwrap();

        let now = DateTime::from_timestamp(2_000, 0).unwrap();
        assert_eq!(blacklist.sweep(now).await.unwrap(), 1);

        assert!(!blacklist.is_revoked("old").await.unwrap());
        assert!(blacklist.is_revoked("new").await.unwrap());
    }

    #[tokio::test]
    async fn test_lookup_fails_closed_on_store_error() {
        let blacklist = TokenBlacklist::new(Arc::new(FailingStore), Duration::from_millis(200));

        let result = blacklist.is_revoked("jti-1").await;
        assert!(matches!(result, Err(AuthError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_lookup_fails_closed_on_timeout() {
        let blacklist = TokenBlacklist::new(Arc::new(HangingStore), Duration::from_millis(20));

        let result = blacklist.is_revoked("jti-1").await;
        assert!(matches!(result, Err(AuthError::StoreUnavailable(_))));

        let revoke = blacklist.revoke(&claims("jti-1", 1_000)).await;
        assert!(matches!(revoke, Err(StoreError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_probe() {
        let (ok, _) = memory();
        assert!(ok.probe().await.is_ok());

        let failing = TokenBlacklist::new(Arc::new(FailingStore), Duration::from_millis(200));
        assert!(failing.probe().await.is_err());
    }

    #[tokio::test]
    async fn test_sweeper_runs_and_stops() {
        let (blacklist, store) = memory();
        blacklist.revoke(&claims("old", 1_000)).await.unwrap();

        let clock: Arc<dyn Clock> =
            Arc::new(ManualClock::new(DateTime::from_timestamp(2_000, 0).unwrap()));
        let shutdown = CancellationToken::new();
        let handle = spawn_sweeper(
            blacklist,
            clock,
            Duration::from_millis(10),
            shutdown.clone(),
        );

        // first tick fires immediately
        for _ in 0..50 {
            if store.entries().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(store.entries().await.is_empty());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
