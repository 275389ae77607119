//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use mining_core::{AccrualConfig, MiningStore, RateLimiter};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MiningStore>,
    pub limiter: Arc<dyn RateLimiter>,
    pub config: Arc<Config>,
}

impl AppState {
    /// The accrual tunables in effect for this process.
    pub fn accrual(&self) -> AccrualConfig {
        self.config.accrual()
    }
}
