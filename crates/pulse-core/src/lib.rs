//! Pulse Core - configuration, domain models and storage seams
//!
//! This crate defines the pieces shared by the API server and the CLI:
//! - Configuration loading and validation
//! - Principal and credential models
//! - The clock abstraction used for token expiry
//! - User and token-blacklist store traits with PostgreSQL and in-memory backends
//! - Embedded schema migrations

pub mod clock;
pub mod config;
pub mod migrate;
pub mod models;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AppConfig, AuthConfig, BlacklistConfig, ConfigError, DatabaseConfig, LoggingConfig,
    PasswordConfig,
};
pub use models::{BlacklistEntry, CredentialRecord, EnsuredUser, NewUser, Principal};
pub use store::{bounded, BlacklistStore, UserStore};

use std::time::Duration;
use thiserror::Error;

/// Storage-layer failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, StoreError>;
