use axum::http::HeaderValue;
use std::sync::Arc;

use crate::config::{Args, ConfigError};
use crate::duplicate::DuplicateGuard;
use crate::rate_limit::RateLimiter;
use crate::store::Store;

// app's shared state, built once at startup and handed to every handler
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub rate_limiter: RateLimiter,
    pub duplicate_guard: DuplicateGuard,
    pub trust_forwarded: bool,
    pub allowed_origins: Vec<HeaderValue>,
}

impl AppState {
    pub fn from_args(args: &Args, store: Arc<dyn Store>) -> Result<Self, ConfigError> {
        Ok(Self {
            rate_limiter: RateLimiter::new(args.cooldown()),
            duplicate_guard: DuplicateGuard::new(Arc::clone(&store), args.duplicate_window()?),
            store,
            trust_forwarded: args.trust_forwarded,
            allowed_origins: args.allowed_origins()?,
        })
    }
}
