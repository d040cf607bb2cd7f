//! Application state management

use crate::auth::{AuthService, JwtError};
use pulse_core::{AppConfig, BlacklistStore, Clock, UserStore};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Validated, immutable configuration
    pub config: Arc<AppConfig>,
    /// Login, refresh, logout and request authorization
    pub auth: AuthService,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Wire the auth core to its stores
    pub fn new(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        blacklist: Arc<dyn BlacklistStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, JwtError> {
        let auth = AuthService::new(config.clone(), users, blacklist, clock)?;

        Ok(Self {
            config,
            auth,
            start_time: Instant::now(),
        })
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
