//! Per-request authorization decision
//!
//! Runs the access-token checks in a fixed order and stops at the first
//! failure:
//!
//! 1. bearer token present
//! 2. signature, schema and expiry ([`TokenCodec::decode`](super::jwt::TokenCodec::decode))
//! 3. token type is `access`
//! 4. `jti` not revoked (when the policy asks for it)
//! 5. subject resolves to a live principal
//! 6. principal role allowed (role-gated routes only)

use super::error::AuthError;
use super::jwt::{Claims, TokenType};
use super::service::AuthService;
use axum::http::{header, HeaderMap};
use pulse_core::models::roles;
use pulse_core::Principal;

/// What to answer when a valid token names a principal that no longer exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPrincipal {
    /// 404 "User not found"
    NotFound,
    /// 401, indistinguishable from a bad token
    Unauthorized,
}

/// Route-level authorization requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    pub check_revocation: bool,
    /// `None` admits any authenticated principal
    pub allowed_roles: Option<&'static [&'static str]>,
    pub missing_principal: MissingPrincipal,
}

impl AccessPolicy {
    /// Any authenticated principal
    pub const AUTHENTICATED: Self = Self {
        check_revocation: true,
        allowed_roles: None,
        missing_principal: MissingPrincipal::NotFound,
    };

    /// A well-formed, unexpired access token. No revocation read and no
    /// principal lookup, so it keeps working while the stores are down.
    pub const TOKEN_ONLY: Self = Self {
        check_revocation: false,
        allowed_roles: None,
        missing_principal: MissingPrincipal::Unauthorized,
    };

    /// Administrators only
    pub const ADMIN: Self = Self {
        check_revocation: true,
        allowed_roles: Some(&[roles::ADMIN]),
        missing_principal: MissingPrincipal::NotFound,
    };
}

/// The principal behind a request plus the token it presented.
///
/// Inserted into request extensions by the auth middleware; handlers take
/// it with `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub principal: Principal,
    pub claims: Claims,
}

/// Token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively; an empty token counts as absent.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Whether `role` is one of `allowed`. Comparison ignores ASCII case.
pub fn authorize(role: &str, allowed: &[&str]) -> bool {
    allowed.iter().any(|r| r.eq_ignore_ascii_case(role))
}

/// Run the full check sequence for one request.
///
/// A revocation lookup that fails or times out is returned as
/// [`AuthError::StoreUnavailable`]; it is never read as "not revoked".
pub async fn authorize_request(
    service: &AuthService,
    headers: &HeaderMap,
    policy: &AccessPolicy,
) -> Result<AuthenticatedUser, AuthError> {
    let user = authenticate_request(service, headers, policy).await?;
    check_role(&user, policy)?;
    Ok(user)
}

/// Steps 1 to 4: the access token's own claims, without principal lookup
pub async fn verify_access_token(
    service: &AuthService,
    headers: &HeaderMap,
    policy: &AccessPolicy,
) -> Result<Claims, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::MissingCredentials)?;

    let claims = service.decode(token).ok_or(AuthError::TokenInvalid)?;

    if claims.token_type != TokenType::Access {
        return Err(AuthError::TokenTypeMismatch);
    }

    if policy.check_revocation && service.blacklist().is_revoked(&claims.jti).await? {
        return Err(AuthError::TokenRevoked);
    }

    Ok(claims)
}

/// Steps 1 to 5: everything up to and including principal lookup
pub async fn authenticate_request(
    service: &AuthService,
    headers: &HeaderMap,
    policy: &AccessPolicy,
) -> Result<AuthenticatedUser, AuthError> {
    let claims = verify_access_token(service, headers, policy).await?;

    let principal = match service.resolve_principal(&claims.sub).await? {
        Some(principal) => principal,
        None => {
            return Err(match policy.missing_principal {
                MissingPrincipal::NotFound => AuthError::PrincipalNotFound,
                MissingPrincipal::Unauthorized => AuthError::TokenInvalid,
            })
        }
    };

    Ok(AuthenticatedUser { principal, claims })
}

/// Step 6. Uses the live principal's role, not the role baked into the token.
pub fn check_role(user: &AuthenticatedUser, policy: &AccessPolicy) -> Result<(), AuthError> {
    match policy.allowed_roles {
        Some(allowed) if !authorize(&user.principal.role, allowed) => Err(AuthError::Forbidden),
        _ => Ok(()),
    }
}
