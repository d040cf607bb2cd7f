//! Authentication and authorization module
//!
//! - Password hashing and verification with Argon2
//! - Token encoding and decoding
//! - Access and refresh token issue
//! - Revocation list with a periodic sweeper
//! - Login, refresh and logout flows
//! - The per-request authorization gate and its middleware

pub mod blacklist;
pub mod error;
pub mod gate;
pub mod issuer;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;

pub use blacklist::{spawn_sweeper, TokenBlacklist};
pub use error::AuthError;
pub use gate::{
    authenticate_request, authorize, authorize_request, bearer_token, check_role,
    verify_access_token, AccessPolicy, AuthenticatedUser, MissingPrincipal,
};
pub use issuer::{IssuedToken, TokenIssuer};
pub use jwt::{Claims, JwtError, TokenCodec, TokenType};
pub use middleware::{admin_middleware, auth_middleware, token_middleware};
pub use password::{hash_password, validate_password_strength, verify_password};
pub use service::{
    AccessTokenResponse, AuthService, LoginRequest, LogoutReport, LogoutRequest, RefreshRequest,
    TokenResponse, UserInfo,
};
