//! Security audit logging for token lifecycle events
//!
//! Every security-relevant action (login, refresh, logout, rejected
//! tokens, role denials, blacklist sweeps) is logged at INFO level with
//! the "audit" target, so operators can route it separately from
//! application logs with `RUST_LOG=audit=info`.
//!
//! Events never carry passwords, hashes or raw tokens. Token identity is
//! recorded by `jti` only.
//!
//! # Example
//!
//! ```ignore
//! use pulse_api::audit::{audit_log, AuditEvent, ClientInfo};
//!
//! audit_log(&AuditEvent::LoginFailure {
//!     email: "a@x.com".to_string(),
//!     reason: "invalid_password".to_string(),
//!     client: ClientInfo::from_headers(&headers),
//! });
//! ```

use axum::http::HeaderMap;
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// Where a request came from, as far as the headers tell
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip_address: extract_ip_address(headers),
            user_agent: extract_user_agent(headers),
        }
    }
}

/// Security audit events
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Credentials accepted and a token pair issued
    LoginSuccess {
        user_id: Uuid,
        email: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    /// Credentials rejected. `reason` keeps the internal distinction
    /// (`user_not_found` / `invalid_password`) the response hides.
    LoginFailure {
        email: String,
        reason: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    /// New access token minted from a refresh token
    TokenRefresh {
        user_id: Uuid,
        email: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    /// Refresh token refused
    RefreshRejected {
        reason: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    /// Logout completed; records which tokens actually reached the blacklist
    Logout {
        email: String,
        access_revoked: bool,
        refresh_revoked: bool,
        #[serde(flatten)]
        client: ClientInfo,
    },

    /// Request presented a missing, invalid, revoked or wrong-type token
    InvalidToken {
        reason: String,
        resource: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    /// Authenticated principal lacks a permitted role
    AccessDenied {
        email: String,
        role: String,
        resource: String,
        required_roles: Vec<String>,
        #[serde(flatten)]
        client: ClientInfo,
    },

    /// Expired revocations purged
    BlacklistSweep { removed: u64 },

    /// Operator bootstrap of an administrator account
    AdminBootstrap { email: String, created: bool },
}

/// Log a security audit event with structured fields
///
/// The full event is also attached as a JSON string for log aggregators.
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::LoginSuccess { user_id, email, client } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                email = %email,
                ip_address = ?client.ip_address,
                "Login successful"
            );
        }
        AuditEvent::LoginFailure { email, reason, client } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                email = %email,
                reason = %reason,
                ip_address = ?client.ip_address,
                "Login failed"
            );
        }
        AuditEvent::TokenRefresh { user_id, email, client } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                email = %email,
                ip_address = ?client.ip_address,
                "Token refresh"
            );
        }
        AuditEvent::RefreshRejected { reason, client } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                reason = %reason,
                ip_address = ?client.ip_address,
                "Refresh rejected"
            );
        }
        AuditEvent::Logout {
            email,
            access_revoked,
            refresh_revoked,
            client,
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                email = %email,
                access_revoked = %access_revoked,
                refresh_revoked = %refresh_revoked,
                ip_address = ?client.ip_address,
                "User logout"
            );
        }
        AuditEvent::InvalidToken { reason, resource, client } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                reason = %reason,
                resource = %resource,
                ip_address = ?client.ip_address,
                "Invalid token"
            );
        }
        AuditEvent::AccessDenied {
            email,
            role,
            resource,
            client,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                email = %email,
                role = %role,
                resource = %resource,
                ip_address = ?client.ip_address,
                "Access denied"
            );
        }
        AuditEvent::BlacklistSweep { removed } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                removed = %removed,
                "Blacklist sweep"
            );
        }
        AuditEvent::AdminBootstrap { email, created } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                email = %email,
                created = %created,
                "Admin bootstrap"
            );
        }
    }
}

/// Extract the client IP from proxy headers
///
/// The first entry of `X-Forwarded-For` wins, then `X-Real-IP`.
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            if let Some(first_ip) = xff_str.split(',').next() {
                let first_ip = first_ip.trim();
                if !first_ip.is_empty() {
                    return Some(first_ip.to_string());
                }
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|ip| ip.to_str().ok())
        .map(|s| s.trim().to_string())
}

pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}
