//! Process-wide rate limiting using the token bucket algorithm

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use flock_common::{
    config::RateLimitConfig,
    errors::{AppError, Result},
};
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter using governor crate
pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Limiter plus the configured rate, for the error body
#[derive(Clone)]
pub struct RateLimitState {
    limiter: Arc<GlobalRateLimiter>,
    requests_per_second: u32,
}

impl RateLimitState {
    /// Build the limiter from configuration. Zero rates are rejected.
    pub fn from_config(config: &RateLimitConfig) -> Result<Self> {
        let rate = NonZeroU32::new(config.requests_per_second).ok_or_else(|| {
            AppError::Configuration {
                message: "rate_limit.requests_per_second must be positive".to_string(),
            }
        })?;
        let burst = NonZeroU32::new(config.burst).ok_or_else(|| AppError::Configuration {
            message: "rate_limit.burst must be positive".to_string(),
        })?;

        Ok(Self {
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(rate).allow_burst(burst))),
            requests_per_second: config.requests_per_second,
        })
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    match state.limiter.check() {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
            Err(AppError::RateLimited {
                limit: state.requests_per_second,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(requests_per_second: u32, burst: u32) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_second,
            burst,
            enabled: true,
        }
    }

    #[test]
    fn test_rate_limiter_creation() {
        let state = RateLimitState::from_config(&config(100, 200)).unwrap();
        assert!(state.limiter.check().is_ok());
    }

    #[test]
    fn test_burst_exhausts() {
        let state = RateLimitState::from_config(&config(1, 2)).unwrap();
        assert!(state.limiter.check().is_ok());
        assert!(state.limiter.check().is_ok());
        assert!(state.limiter.check().is_err());
    }

    #[test]
    fn test_zero_rate_rejected() {
        assert!(RateLimitState::from_config(&config(0, 10)).is_err());
        assert!(RateLimitState::from_config(&config(10, 0)).is_err());
    }
}
