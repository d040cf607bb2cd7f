//! In-process stores for tests and single-node development

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BlacklistStore, UserStore};
use crate::models::{
    normalize_role, BlacklistEntry, CredentialRecord, EnsuredUser, NewUser, Principal,
};
use crate::Result;

/// Users keyed by email
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, CredentialRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user
    pub async fn insert(&self, record: CredentialRecord) {
        self.users
            .write()
            .await
            .insert(record.principal.email.clone(), record);
    }

    /// Remove a user, returning whether it existed
    pub async fn remove(&self, email: &str) -> bool {
        self.users.write().await.remove(email).is_some()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn ensure_user(&self, user: NewUser) -> Result<EnsuredUser> {
        let mut users = self.users.write().await;
        if let Some(existing) = users.get(&user.email) {
            return Ok(EnsuredUser {
                principal: existing.principal.clone(),
                created: false,
            });
        }

        let principal = Principal {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email.clone(),
            role: normalize_role(&user.role),
            is_verified: false,
        };
        users.insert(
            user.email,
            CredentialRecord {
                principal: principal.clone(),
                password_hash: user.password_hash,
            },
        );

        Ok(EnsuredUser {
            principal,
            created: true,
        })
    }
}

/// Revocation list held in memory
#[derive(Debug, Default)]
pub struct InMemoryBlacklistStore {
    entries: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryBlacklistStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of current entries
    pub async fn entries(&self) -> Vec<BlacklistEntry> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(jti, expires_at)| BlacklistEntry {
                jti: jti.clone(),
                expires_at: *expires_at,
            })
            .collect()
    }
}

#[async_trait]
impl BlacklistStore for InMemoryBlacklistStore {
    async fn is_blacklisted(&self, jti: &str) -> Result<bool> {
        Ok(self.entries.read().await.contains_key(jti))
    }

    async fn blacklist(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.entries
            .write()
            .await
            .entry(jti.to_string())
            .or_insert(expires_at);
        Ok(())
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at >= now);
        Ok((before - entries.len()) as u64)
    }
}
