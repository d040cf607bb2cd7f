//! Authentication API handlers
//!
//! Login, refresh and logout, plus the endpoints that exercise the
//! authorization gate (current user, admin probe).

use crate::audit::{audit_log, AuditEvent, ClientInfo};
use crate::auth::{
    AccessTokenResponse, AuthenticatedUser, Claims, LoginRequest, LogoutRequest, MissingPrincipal,
    RefreshRequest, TokenResponse, UserInfo,
};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Admin probe response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminGreeting {
    #[schema(example = "Welcome Admin user: admin@example.com")]
    pub message: String,
}

/// Login with email and password
///
/// Returns an access token and a refresh token. Unknown email and wrong
/// password produce the same response.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 400, description = "Missing email or password", body = crate::error::ApiError),
        (status = 401, description = "Incorrect username or password", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let client = ClientInfo::from_headers(&headers);

    match state.auth.login(&request).await {
        Ok((principal, tokens)) => {
            audit_log(&AuditEvent::LoginSuccess {
                user_id: principal.id,
                email: principal.email,
                client,
            });
            Ok(Json(tokens))
        }
        Err(err) => {
            if err.is_credential_failure() {
                audit_log(&AuditEvent::LoginFailure {
                    email: request.email.trim().to_string(),
                    reason: err.reason().to_string(),
                    client,
                });
            }
            Err(err.into())
        }
    }
}

/// Exchange a refresh token for a new access token
///
/// The refresh token is not rotated.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 401, description = "Invalid, wrong-type or revoked refresh token", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<AccessTokenResponse>, AppError> {
    let client = ClientInfo::from_headers(&headers);

    match state.auth.refresh(&request.refresh_token).await {
        Ok((principal, token)) => {
            audit_log(&AuditEvent::TokenRefresh {
                user_id: principal.id,
                email: principal.email,
                client,
            });
            Ok(Json(token))
        }
        Err(err) => {
            audit_log(&AuditEvent::RefreshRejected {
                reason: err.reason().to_string(),
                client,
            });
            Err(AppError::from_auth(err, MissingPrincipal::Unauthorized))
        }
    }
}

/// Logout current session
///
/// Revokes the bearer access token and the refresh token in the body.
/// Always answers 204 once the access token is accepted. A malformed or
/// missing refresh token is skipped, and revocation failures are only logged.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    request_body(content = LogoutRequest, description = "Refresh token to revoke"),
    responses(
        (status = 204, description = "Logged out"),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let refresh_token = serde_json::from_slice::<LogoutRequest>(&body)
        .map(|r| r.refresh_token)
        .unwrap_or_default();

    let report = state.auth.logout(&claims, &refresh_token).await;

    audit_log(&AuditEvent::Logout {
        email: claims.sub,
        access_revoked: report.access_revoked,
        refresh_revoked: report.refresh_revoked,
        client: ClientInfo::from_headers(&headers),
    });

    StatusCode::NO_CONTENT
}

/// Get current user profile
#[utoipa::path(
    get,
    path = "/api/v1/auth/users/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user profile", body = UserInfo),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me_handler(Extension(user): Extension<AuthenticatedUser>) -> Json<UserInfo> {
    Json(user.principal.into())
}

/// Admin-only probe
#[utoipa::path(
    get,
    path = "/api/v1/auth/admin/test",
    tag = "auth",
    responses(
        (status = 200, description = "Caller is an admin", body = AdminGreeting),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
        (status = 403, description = "Operation not permitted", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn admin_test_handler(
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<AdminGreeting> {
    Json(AdminGreeting {
        message: format!("Welcome Admin user: {}", user.claims.sub),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_greeting_serialization() {
        let greeting = AdminGreeting {
            message: "Welcome Admin user: root@x.com".to_string(),
        };

        let json = serde_json::to_value(&greeting).unwrap();
        assert_eq!(json["message"], "Welcome Admin user: root@x.com");
    }

    #[test]
    fn test_token_response_shape() {
        let response = TokenResponse {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            token_type: "bearer".to_string(),
            expires_in: 900,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["token_type"], "bearer");
        assert_eq!(json["expires_in"], 900);
    }
}
