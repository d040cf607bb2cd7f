//! JWT token encoding and decoding
//!
//! Tokens are HMAC-signed (HS256/384/512) and carry a subject, role, token
//! type, unique id and absolute expiry. Expiry is checked against the
//! caller-supplied time rather than the system clock, so the codec behaves
//! the same under a manual clock in tests.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use pulse_core::AuthConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which operation a token is good for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT Claims structure
///
/// Decoding is strict: a payload missing any of `sub`, `role`, `type`,
/// `jti` or `exp`, or carrying them with the wrong JSON type, is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the principal's email
    pub sub: String,
    /// Role label at issue time (admin, viewer, ...)
    pub role: String,
    /// Access or refresh
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// JWT ID - unit of revocation
    pub jti: String,
    /// Issued at (Unix epoch seconds)
    #[serde(default)]
    pub iat: i64,
    /// Expiration (Unix epoch seconds)
    pub exp: i64,
}

impl Claims {
    /// Expiry as a timestamp; `None` if `exp` is outside the representable range
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// A token is expired once the current second reaches `exp`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}

/// JWT encoding errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Signs and verifies tokens with a server-held secret.
///
/// Built once at startup from the validated configuration and shared
/// behind an `Arc`; holds no mutable state.
#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Create a codec for an HMAC algorithm name (`HS256`, `HS384`, `HS512`)
    ///
    /// # Arguments
    ///
    /// * `secret` - Shared signing secret
    /// * `algorithm` - Algorithm name as it appears in the JWT header
    ///
    /// # Returns
    ///
    /// * `Ok(TokenCodec)` - Ready to encode and decode
    /// * `Err(JwtError::UnsupportedAlgorithm)` - For anything but the HMAC family
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pulse_api::auth::jwt::TokenCodec;
    ///
    /// let codec = TokenCodec::new("a-secret-of-at-least-thirty-two-bytes!!", "HS256")
    ///     .expect("HS256 is supported");
    /// ```
    pub fn new(secret: &str, algorithm: &str) -> Result<Self, JwtError> {
        let algorithm = Algorithm::from_str(algorithm)
            .ok()
            .filter(|alg| matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512))
            .ok_or_else(|| JwtError::UnsupportedAlgorithm(algorithm.to_string()))?;

        let mut validation = Validation::new(algorithm);
        // Expiry is compared against the injected clock in `decode`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Create a codec from the `auth` configuration section
    pub fn from_config(config: &AuthConfig) -> Result<Self, JwtError> {
        Self::new(&config.jwt_secret, &config.jwt_algorithm)
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Sign claims into a compact `header.payload.signature` token
    pub fn encode(&self, claims: &Claims) -> Result<String, JwtError> {
        let token = encode(&Header::new(self.algorithm), claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verify and decode a token
    ///
    /// Returns `None` for a bad signature, a malformed token, claims that do
    /// not match the schema, or `now >= exp`. The reason is logged at debug
    /// level and never returned, so every failure looks the same to callers.
    ///
    /// # Arguments
    ///
    /// * `token` - Compact JWT string
    /// * `now` - Current Unix time in seconds
    pub fn decode(&self, token: &str, now: i64) -> Option<Claims> {
        let claims = match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                tracing::debug!(reason = ?e.kind(), "token rejected");
                return None;
            }
        };

        if claims.is_expired_at(now) {
            tracing::debug!(jti = %claims.jti, exp = claims.exp, now, "token rejected: expired");
            return None;
        }

        Some(claims)
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}
