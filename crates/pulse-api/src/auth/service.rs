//! Authentication service
//!
//! Orchestrates credential checks and the token lifecycle:
//! - Login: credential lookup, password verification, token pair issue
//! - Refresh: refresh token validation and access token re-issue
//! - Logout: revocation of the access token and the presented refresh token

use super::blacklist::TokenBlacklist;
use super::error::AuthError;
use super::issuer::{IssuedToken, TokenIssuer};
use super::jwt::{Claims, JwtError, TokenCodec, TokenType};
use super::password::verify_password_blocking;
use pulse_core::{bounded, AppConfig, BlacklistStore, Clock, Principal, UserStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

/// Login request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Login email
    #[schema(example = "admin@example.com")]
    pub email: String,
    /// Plaintext password
    #[schema(example = "SecureP@ssw0rd!")]
    pub password: String,
}

/// Refresh request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Logout request; the access token travels in the Authorization header
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// Token pair returned by login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Always "bearer"
    #[schema(example = "bearer")]
    pub token_type: String,
    /// Access token lifetime in seconds
    #[schema(example = 900)]
    pub expires_in: i64,
}

/// Access token returned by refresh
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessTokenResponse {
    pub access_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
    #[schema(example = 900)]
    pub expires_in: i64,
}

/// Public projection of a principal
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    pub id: uuid::Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
    pub is_verified: bool,
}

impl From<Principal> for UserInfo {
    fn from(p: Principal) -> Self {
        Self {
            id: p.id,
            username: p.username,
            email: p.email,
            role: p.role,
            is_verified: p.is_verified,
        }
    }
}

/// Which tokens a logout managed to revoke
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogoutReport {
    pub access_revoked: bool,
    pub refresh_revoked: bool,
}

const BEARER: &str = "bearer";

fn access_response(token: IssuedToken) -> AccessTokenResponse {
    AccessTokenResponse {
        expires_in: token.expires_in(),
        access_token: token.token,
        token_type: BEARER.to_string(),
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    blacklist: TokenBlacklist,
    issuer: TokenIssuer,
    codec: Arc<TokenCodec>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl AuthService {
    /// Build the service from a validated configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Application configuration (signing secret, lifetimes, timeouts)
    /// * `users` - User and credential store
    /// * `blacklist` - Revocation store
    /// * `clock` - Time source for issue and expiry
    pub fn new(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        blacklist: Arc<dyn BlacklistStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, JwtError> {
        let codec = Arc::new(TokenCodec::from_config(&config.auth)?);
        let store_timeout = config.blacklist.store_timeout();

        Ok(Self {
            users,
            blacklist: TokenBlacklist::new(blacklist, store_timeout),
            issuer: TokenIssuer::new(codec.clone(), config, clock.clone()),
            codec,
            clock,
            store_timeout,
        })
    }

    pub fn blacklist(&self) -> &TokenBlacklist {
        &self.blacklist
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Verify and decode a token at the current time
    pub fn decode(&self, token: &str) -> Option<Claims> {
        self.codec.decode(token, self.clock.timestamp())
    }

    /// Look up the live principal behind a token subject
    pub async fn resolve_principal(&self, email: &str) -> Result<Option<Principal>, AuthError> {
        let record = bounded(self.store_timeout, self.users.find_by_email(email)).await?;
        Ok(record.map(|r| r.into_principal()))
    }

    /// Check an email/password pair
    ///
    /// # Returns
    ///
    /// * `Ok(Principal)` - Credentials match
    /// * `Err(AuthError::UserNotFound)` - No such email
    /// * `Err(AuthError::InvalidPassword)` - Hash mismatch
    /// * `Err(AuthError::StoreUnavailable)` - Lookup failed or timed out
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let record = bounded(self.store_timeout, self.users.find_by_email(email))
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let matches = verify_password_blocking(password.to_string(), record.password_hash.clone())
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        if !matches {
            return Err(AuthError::InvalidPassword);
        }

        Ok(record.into_principal())
    }

    /// Authenticate and issue an access/refresh pair
    pub async fn login(&self, request: &LoginRequest) -> Result<(Principal, TokenResponse), AuthError> {
        let email = request.email.trim();
        if email.is_empty() || request.password.is_empty() {
            return Err(AuthError::InvalidRequest(
                "email and password are required".to_string(),
            ));
        }

        let principal = self.authenticate(email, &request.password).await?;
        let (access, refresh) = self.issuer.issue_pair(&principal)?;

        let response = TokenResponse {
            expires_in: access.expires_in(),
            access_token: access.token,
            refresh_token: refresh.token,
            token_type: BEARER.to_string(),
        };

        Ok((principal, response))
    }

    /// Mint a new access token from a refresh token
    ///
    /// The refresh token itself is not rotated and stays valid until it
    /// expires or is revoked by logout.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(Principal, AccessTokenResponse), AuthError> {
        let claims = self.decode(refresh_token).ok_or(AuthError::TokenInvalid)?;

        if claims.token_type != TokenType::Refresh {
            return Err(AuthError::TokenTypeMismatch);
        }

        if claims.jti.is_empty() {
            return Err(AuthError::TokenInvalid);
        }

        if self.blacklist.is_revoked(&claims.jti).await? {
            return Err(AuthError::TokenRevoked);
        }

        let principal = self
            .resolve_principal(&claims.sub)
            .await?
            .ok_or(AuthError::PrincipalNotFound)?;

        let access = self.issuer.issue_access_token(&principal)?;
        Ok((principal, access_response(access)))
    }

    /// Revoke the caller's access token and the presented refresh token
    ///
    /// Both revocations run concurrently and independently. Failures are
    /// logged and reported in the [`LogoutReport`], never returned.
    pub async fn logout(&self, access: &Claims, refresh_token: &str) -> LogoutReport {
        let revoke_access = async {
            if access.jti.is_empty() {
                tracing::warn!(sub = %access.sub, "access token has no jti, not revoked");
                return false;
            }
            match self.blacklist.revoke(access).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(jti = %access.jti, error = %e, "failed to revoke access token");
                    false
                }
            }
        };

        let revoke_refresh = async {
            let claims = match self.decode(refresh_token) {
                Some(claims) => claims,
                None => {
                    tracing::info!(sub = %access.sub, "logout with invalid refresh token, skipping");
                    return false;
                }
            };

            if claims.token_type != TokenType::Refresh || claims.jti.is_empty() {
                tracing::info!(sub = %access.sub, token_type = %claims.token_type, "logout with non-refresh token, skipping");
                return false;
            }

            match self.blacklist.revoke(&claims).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(jti = %claims.jti, error = %e, "failed to revoke refresh token");
                    false
                }
            }
        };

        let (access_revoked, refresh_revoked) = tokio::join!(revoke_access, revoke_refresh);

        LogoutReport {
            access_revoked,
            refresh_revoked,
        }
    }
}
