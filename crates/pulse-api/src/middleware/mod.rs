//! HTTP middleware

pub mod security_headers;

pub use security_headers::{no_store_middleware, security_headers_middleware};
