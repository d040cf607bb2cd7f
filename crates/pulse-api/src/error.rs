//! API error handling
//!
//! All auth failures pass through [`AppError::from_auth`], which decides
//! the status code and the outward message. Internal reasons stay in logs.

use crate::auth::{AuthError, MissingPrincipal};
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const MSG_BAD_CREDENTIALS: &str = "Incorrect username or password";
pub const MSG_NOT_VALIDATED: &str = "Could not validate credentials";
pub const MSG_TOKEN_TYPE: &str = "Invalid token type";
pub const MSG_REVOKED: &str = "Token has been revoked";
pub const MSG_USER_NOT_FOUND: &str = "User not found";
pub const MSG_FORBIDDEN: &str = "Operation not permitted";

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    #[schema(example = "UNAUTHORIZED")]
    pub code: String,
    /// Human-readable message
    #[schema(example = "Could not validate credentials")]
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl AppError {
    /// Map an auth failure to its outward form
    ///
    /// `missing` decides how [`AuthError::PrincipalNotFound`] is reported.
    pub fn from_auth(err: AuthError, missing: MissingPrincipal) -> Self {
        match err {
            AuthError::UserNotFound | AuthError::InvalidPassword => {
                AppError::Unauthorized(MSG_BAD_CREDENTIALS.to_string())
            }
            AuthError::MissingCredentials | AuthError::TokenInvalid => {
                AppError::Unauthorized(MSG_NOT_VALIDATED.to_string())
            }
            AuthError::TokenTypeMismatch => AppError::Unauthorized(MSG_TOKEN_TYPE.to_string()),
            AuthError::TokenRevoked => AppError::Unauthorized(MSG_REVOKED.to_string()),
            AuthError::PrincipalNotFound => match missing {
                MissingPrincipal::NotFound => AppError::NotFound(MSG_USER_NOT_FOUND.to_string()),
                MissingPrincipal::Unauthorized => {
                    AppError::Unauthorized(MSG_NOT_VALIDATED.to_string())
                }
            },
            AuthError::Forbidden => AppError::Forbidden(MSG_FORBIDDEN.to_string()),
            AuthError::InvalidRequest(msg) => AppError::BadRequest(msg),
            AuthError::StoreUnavailable(msg) | AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::from_auth(err, MissingPrincipal::NotFound)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", msg)),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg))
            }
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, ApiError::new("UNAUTHORIZED", msg))
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, ApiError::new("FORBIDDEN", msg)),
            AppError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiError::new("SERVICE_UNAVAILABLE", msg),
            ),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, ApiError::internal_error())
            }
        };

        let mut response = (status, Json(error)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_and_message(err: AuthError, missing: MissingPrincipal) -> (StatusCode, String) {
        match AppError::from_auth(err, missing) {
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, m),
            AppError::ServiceUnavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m),
            AppError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        }
    }

    #[test]
    fn test_credential_failures_look_identical() {
        let a = status_and_message(AuthError::UserNotFound, MissingPrincipal::NotFound);
        let b = status_and_message(AuthError::InvalidPassword, MissingPrincipal::NotFound);
        assert_eq!(a, b);
        assert_eq!(a, (StatusCode::UNAUTHORIZED, MSG_BAD_CREDENTIALS.to_string()));
    }

    #[test]
    fn test_token_failures() {
        use MissingPrincipal::NotFound;

        assert_eq!(
            status_and_message(AuthError::TokenInvalid, NotFound),
            status_and_message(AuthError::MissingCredentials, NotFound)
        );
        assert_eq!(
            status_and_message(AuthError::TokenTypeMismatch, NotFound).1,
            MSG_TOKEN_TYPE
        );
        assert_eq!(
            status_and_message(AuthError::TokenRevoked, NotFound).1,
            MSG_REVOKED
        );
        assert_eq!(
            status_and_message(AuthError::Forbidden, NotFound).0,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_and_message(AuthError::StoreUnavailable("x".into()), NotFound).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_missing_principal_policy() {
        assert_eq!(
            status_and_message(AuthError::PrincipalNotFound, MissingPrincipal::NotFound).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_and_message(AuthError::PrincipalNotFound, MissingPrincipal::Unauthorized),
            (StatusCode::UNAUTHORIZED, MSG_NOT_VALIDATED.to_string())
        );
    }

    #[test]
    fn test_unauthorized_carries_challenge() {
        let response = AppError::Unauthorized(MSG_NOT_VALIDATED.to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

        let response = AppError::Forbidden(MSG_FORBIDDEN.to_string()).into_response();
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn test_internal_details_not_exposed() {
        let response = AppError::Internal("db password=hunter2".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
