//! Access and refresh token minting

use super::jwt::{Claims, JwtError, TokenCodec, TokenType};
use pulse_core::{AppConfig, Clock, Principal};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// A freshly signed token together with the claims inside it
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

impl IssuedToken {
    /// Seconds from issue until expiry
    pub fn expires_in(&self) -> i64 {
        self.claims.exp - self.claims.iat
    }
}

/// Mints tokens for authenticated principals.
///
/// Access token lifetime follows the role policy in `auth.role_access_expiration_mins`;
/// refresh tokens always live `auth.refresh_expiration_days`.
#[derive(Clone)]
pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
    config: Arc<AppConfig>,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(codec: Arc<TokenCodec>, config: Arc<AppConfig>, clock: Arc<dyn Clock>) -> Self {
        Self {
            codec,
            config,
            clock,
        }
    }

    pub fn issue_access_token(&self, principal: &Principal) -> Result<IssuedToken, JwtError> {
        let lifetime = self.config.auth.access_expiration_for_role(&principal.role);
        self.issue(principal, TokenType::Access, lifetime)
    }

    pub fn issue_refresh_token(&self, principal: &Principal) -> Result<IssuedToken, JwtError> {
        let lifetime = self.config.auth.refresh_expiration();
        self.issue(principal, TokenType::Refresh, lifetime)
    }

    /// Access token first, refresh token second
    pub fn issue_pair(&self, principal: &Principal) -> Result<(IssuedToken, IssuedToken), JwtError> {
        Ok((
            self.issue_access_token(principal)?,
            self.issue_refresh_token(principal)?,
        ))
    }

    fn issue(
        &self,
        principal: &Principal,
        token_type: TokenType,
        lifetime: Duration,
    ) -> Result<IssuedToken, JwtError> {
        let iat = self.clock.timestamp();
        let lifetime = i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX);

        let claims = Claims {
            sub: principal.email.clone(),
            role: principal.role.clone(),
            token_type,
            // 128 random bits, never shared between two tokens
            jti: Uuid::new_v4().simple().to_string(),
            iat,
            exp: iat.saturating_add(lifetime),
        };

        let token = self.codec.encode(&claims)?;
        tracing::debug!(
            sub = %claims.sub,
            token_type = %token_type,
            jti = %claims.jti,
            exp = claims.exp,
            "token issued"
        );

        Ok(IssuedToken { token, claims })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pulse_core::ManualClock;
    use std::collections::HashSet;

    const SECRET: &str = "issuer-test-secret-with-32-bytes-or-more";

    fn setup() -> (TokenIssuer, Arc<TokenCodec>, Arc<ManualClock>) {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = SECRET.to_string();
        let codec = Arc::new(TokenCodec::from_config(&config.auth).unwrap());
        let clock = Arc::new(ManualClock::new(
            chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let issuer = TokenIssuer::new(codec.clone(), Arc::new(config), clock.clone());
        (issuer, codec, clock)
    }

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
    fn test_access_lifetime_follows_role() {
        let (issuer, _, _) = setup();

        let admin = issuer.issue_access_token(&principal("admin")).unwrap();
        let viewer = issuer.issue_access_token(&principal("viewer")).unwrap();
        let other = issuer.issue_access_token(&principal("auditor")).unwrap();

        assert_eq!(admin.expires_in(), 15 * 60);
        assert_eq!(viewer.expires_in(), 120 * 60);
        assert_eq!(other.expires_in(), 30 * 60);
        assert!(admin.expires_in() < viewer.expires_in());
    }

    #[test]
    fn test_refresh_lifetime_in_days() {
        let (issuer, _, _) = setup();
        let refresh = issuer.issue_refresh_token(&principal("admin")).unwrap();

        assert_eq!(refresh.claims.token_type, TokenType::Refresh);
        assert_eq!(refresh.expires_in(), 7 * 24 * 3600);
    }

    #[test]
    fn test_pair_has_distinct_types_and_ids() {
        let (issuer, codec, clock) = setup();
        let (access, refresh) = issuer.issue_pair(&principal("viewer")).unwrap();

        let access_claims = codec.decode(&access.token, clock.timestamp()).unwrap();
        let refresh_claims = codec.decode(&refresh.token, clock.timestamp()).unwrap();

        assert_eq!(access_claims.token_type, TokenType::Access);
        assert_eq!(refresh_claims.token_type, TokenType::Refresh);
        assert_ne!(access_claims.jti, refresh_claims.jti);
        assert_eq!(access_claims.sub, "a@x.com");
        assert_eq!(access_claims.role, "viewer");
    }

    #[test]
    fn test_every_token_gets_a_fresh_jti() {
        let (issuer, _, _) = setup();
        let p = principal("viewer");

        let ids: HashSet<String> = (0..50)
            .map(|_| issuer.issue_access_token(&p).unwrap().claims.jti)
            .collect();
        assert_eq!(ids.len(), 50);
        assert!(ids.iter().all(|id| id.len() == 32));
    }

    #[test]
    fn test_issued_token_expires_with_clock() {
        let (issuer, codec, clock) = setup();
        let access = issuer.issue_access_token(&principal("admin")).unwrap();

        clock.advance(std::time::Duration::from_secs(15 * 60 - 1));
        assert!(codec.decode(&access.token, clock.timestamp()).is_some());

        clock.advance(std::time::Duration::from_secs(1));
        assert!(codec.decode(&access.token, clock.timestamp()).is_none());
    }
}
