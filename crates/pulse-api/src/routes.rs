//! API route definitions

use crate::auth::{admin_middleware, auth_middleware, token_middleware};
use crate::handlers::auth;
use crate::middleware::no_store_middleware;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create `/api/v1` routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (credentials travel in the body)
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/refresh", post(auth::refresh_handler));

    // Valid access token only; must work with the stores down
    let logout_routes = Router::new()
        .route("/auth/logout", post(auth::logout_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), token_middleware));

    // Any authenticated principal
    let protected_routes = Router::new()
        .route("/auth/users/me", get(auth::me_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Admin role required
    let admin_routes = Router::new()
        .route("/auth/admin/test", get(auth::admin_test_handler))
        .route_layer(middleware::from_fn_with_state(state, admin_middleware));

    Router::new()
        .merge(public_routes)
        .merge(logout_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn(no_store_middleware))
}
