//! Domain models for principals and credentials
//!
//! These are projections of rows owned by the user store. The auth core
//! only reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known role labels
pub mod roles {
    /// Full access, shortest token lifetime
    pub const ADMIN: &str = "admin";
    /// Read-only access
    pub const VIEWER: &str = "viewer";
}

/// Normalize a role label as stored in tokens and compared by the gate
pub fn normalize_role(role: &str) -> String {
    role.trim().to_lowercase()
}

/// Authenticated user projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Opaque user identifier
    pub id: Uuid,
    /// Display name
    pub username: String,
    /// Login identifier, carried as the token subject
    pub email: String,
    /// Role label (admin, viewer, ...)
    pub role: String,
    /// Whether the email has been verified
    pub is_verified: bool,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == roles::ADMIN
    }
}

/// Principal plus its password hash.
///
/// Only the authentication service sees this type; it is never serialized
/// and its `Debug` output omits the hash.
#[derive(Clone)]
pub struct CredentialRecord {
    pub principal: Principal,
    pub password_hash: String,
}

impl CredentialRecord {
    pub fn into_principal(self) -> Principal {
        self.principal
    }
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("principal", &self.principal)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

/// User to be inserted by operator tooling
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

/// Result of an idempotent user insert
#[derive(Debug, Clone)]
pub struct EnsuredUser {
    pub principal: Principal,
    /// False when a user with the same email already existed
    pub created: bool,
}

/// One row of the revocation list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    /// Revoked token identifier
    pub jti: String,
    /// The token's own expiry, after which the row may be swept
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: &str) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            role: role.to_string(),
            is_verified: true,
        }
    }

    #[test]
    fn test_normalize_role() {
        assert_eq!(normalize_role(" Admin "), "admin");
        assert_eq!(normalize_role("viewer"), "viewer");
    }

    #[test]
    fn test_is_admin() {
        assert!(principal("admin").is_admin());
        assert!(!principal("viewer").is_admin());
    }

    #[test]
    fn test_credential_debug_hides_hash() {
        let record = CredentialRecord {
            principal: principal("viewer"),
            password_hash: "$argon2id$v=19$secret".to_string(),
        };
        let rendered = format!("{record:?}");
        assert!(!rendered.contains("argon2id"));
        assert!(rendered.contains("a@x.com"));
    }
}
