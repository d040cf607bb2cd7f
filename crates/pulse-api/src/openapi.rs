//! OpenAPI document served at `/api-docs/openapi.json`

use crate::auth::{
    AccessTokenResponse, LoginRequest, LogoutRequest, RefreshRequest, TokenResponse, UserInfo,
};
use crate::error::ApiError;
use crate::handlers::{auth, health};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login_handler,
        auth::refresh_handler,
        auth::logout_handler,
        auth::me_handler,
        auth::admin_test_handler,
        health::health_check,
        health::readiness_check,
    ),
    components(schemas(
        LoginRequest,
        RefreshRequest,
        LogoutRequest,
        TokenResponse,
        AccessTokenResponse,
        UserInfo,
        auth::AdminGreeting,
        health::HealthResponse,
        health::ReadinessResponse,
        ApiError,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login, token refresh and logout"),
        (name = "health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_auth_paths() {
        let doc = ApiDoc::openapi();

        for path in [
            "/api/v1/auth/login",
            "/api/v1/auth/refresh",
            "/api/v1/auth/logout",
            "/api/v1/auth/users/me",
            "/api/v1/auth/admin/test",
            "/health",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }

        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
