//! Authentication middleware for protecting routes
//!
//! Runs the request authorization gate with a route policy. On success the
//! [`AuthenticatedUser`](super::gate::AuthenticatedUser) is added to request extensions; on failure the
//! request is answered here and audited.

use super::error::AuthError;
use super::gate::{authenticate_request, check_role, verify_access_token, AccessPolicy};
use crate::audit::{audit_log, AuditEvent, ClientInfo};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Require a valid, unrevoked access token for a live principal
///
/// # Usage
///
/// ```ignore
/// use axum::{middleware, routing::get, Router};
/// use pulse_api::auth::auth_middleware;
///
/// let app = Router::new()
///     .route("/users/me", get(me))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
///
/// In handlers, extract the user:
///
/// ```ignore
/// async fn me(Extension(user): Extension<AuthenticatedUser>) -> String {
///     user.principal.email
/// }
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    enforce(&state, &AccessPolicy::AUTHENTICATED, request, next).await
}

/// Like [`auth_middleware`], additionally requiring the `admin` role
pub async fn admin_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    enforce(&state, &AccessPolicy::ADMIN, request, next).await
}

/// Require only a valid access token and insert its [`Claims`](super::jwt::Claims).
///
/// Used by logout. Reads neither the blacklist nor the user store.
pub async fn token_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let policy = AccessPolicy::TOKEN_ONLY;
    let client = ClientInfo::from_headers(request.headers());
    let resource = request.uri().path().to_string();

    match verify_access_token(&state.auth, request.headers(), &policy).await {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(err) => reject(err, &policy, resource, client),
    }
}

async fn enforce(
    state: &AppState,
    policy: &AccessPolicy,
    mut request: Request,
    next: Next,
) -> Response {
    let client = ClientInfo::from_headers(request.headers());
    let resource = request.uri().path().to_string();

    let user = match authenticate_request(&state.auth, request.headers(), policy).await {
        Ok(user) => user,
        Err(err) => return reject(err, policy, resource, client),
    };

    if let Err(err) = check_role(&user, policy) {
        audit_log(&AuditEvent::AccessDenied {
            email: user.principal.email.clone(),
            role: user.principal.role.clone(),
            resource,
            required_roles: policy
                .allowed_roles
                .unwrap_or_default()
                .iter()
                .map(|r| r.to_string())
                .collect(),
            client,
        });
        return AppError::from_auth(err, policy.missing_principal).into_response();
    }

    request.extensions_mut().insert(user);
    next.run(request).await
}

fn reject(err: AuthError, policy: &AccessPolicy, resource: String, client: ClientInfo) -> Response {
    match &err {
        AuthError::StoreUnavailable(_) | AuthError::Internal(_) => {
            tracing::error!(error = %err, resource = %resource, "authorization could not complete");
        }
        _ => audit_log(&AuditEvent::InvalidToken {
            reason: err.reason().to_string(),
            resource,
            client,
        }),
    }
    AppError::from_auth(err, policy.missing_principal).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::{get, post},
        Router,
    };
    use pulse_core::store::{InMemoryBlacklistStore, InMemoryUserStore};
    use pulse_core::{AppConfig, ManualClock};
    use tower::ServiceExt;

    fn state() -> Arc<AppState> {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "middleware-test-secret-with-32-bytes!".to_string();
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));

        Arc::new(
            AppState::new(
                Arc::new(config),
                Arc::new(InMemoryUserStore::new()),
                Arc::new(InMemoryBlacklistStore::new()),
                clock,
            )
            .unwrap(),
        )
    }

    // Each layer has to satisfy route_layer's Send bound to be mounted here.
    fn guarded_router(state: Arc<AppState>) -> Router {
        Router::new()
            .route(
                "/me",
                get(|| async { "ok" })
                    .route_layer(from_fn_with_state(state.clone(), auth_middleware)),
            )
            .route(
                "/admin",
                get(|| async { "ok" })
                    .route_layer(from_fn_with_state(state.clone(), admin_middleware)),
            )
            .route(
                "/logout",
                post(|| async { StatusCode::NO_CONTENT })
                    .route_layer(from_fn_with_state(state, token_middleware)),
            )
    }

    #[tokio::test]
    async fn test_every_guard_rejects_missing_token() {
        let router = guarded_router(state());

        for (method, uri) in [("GET", "/me"), ("GET", "/admin"), ("POST", "/logout")] {
            let response = router
                .clone()
                .oneshot(
                    HttpRequest::builder()
                        .method(method)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
            assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
        }
    }

    #[tokio::test]
    async fn test_token_guard_admits_unknown_principal() {
        let state = state();
        let principal = pulse_core::Principal {
            id: uuid::Uuid::new_v4(),
            username: "ghost".to_string(),
            email: "ghost@x.com".to_string(),
            role: "viewer".to_string(),
            is_verified: true,
        };
        let token = state.auth.issuer().issue_access_token(&principal).unwrap();
        let router = guarded_router(state);

        let request = |method: &str, uri: &str| {
            HttpRequest::builder()
                .method(method)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token.token))
                .body(Body::empty())
                .unwrap()
        };

        let response = router.clone().oneshot(request("GET", "/me")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = router.oneshot(request("POST", "/logout")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
