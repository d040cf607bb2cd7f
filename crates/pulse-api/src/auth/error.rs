//! Authentication and authorization failures
//!
//! Variants stay distinct internally so logs can say exactly what went
//! wrong; the HTTP layer collapses them to a handful of outward messages.

use super::jwt::JwtError;
use pulse_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No user with the given email")]
    UserNotFound,

    #[error("Password does not match")]
    InvalidPassword,

    #[error("No bearer token presented")]
    MissingCredentials,

    #[error("Token is invalid or expired")]
    TokenInvalid,

    #[error("Token type mismatch")]
    TokenTypeMismatch,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Token subject no longer exists")]
    PrincipalNotFound,

    #[error("Role not permitted for this operation")]
    Forbidden,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Short machine-readable reason used in audit and log records
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::UserNotFound => "user_not_found",
            AuthError::InvalidPassword => "invalid_password",
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::TokenInvalid => "token_invalid",
            AuthError::TokenTypeMismatch => "token_type_mismatch",
            AuthError::TokenRevoked => "token_revoked",
            AuthError::PrincipalNotFound => "principal_not_found",
            AuthError::Forbidden => "forbidden",
            AuthError::StoreUnavailable(_) => "store_unavailable",
            AuthError::InvalidRequest(_) => "invalid_request",
            AuthError::Internal(_) => "internal",
        }
    }

    /// Whether this is a bad email/password pair
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, AuthError::UserNotFound | AuthError::InvalidPassword)
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::StoreUnavailable(err.to_string())
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
