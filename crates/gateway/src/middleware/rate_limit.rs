//! Rate limiting middleware using token bucket algorithm

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use folio_common::{config::RateLimitConfig, errors::AppError};
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::AppState;

/// Rate limiter using governor crate
pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Create a new rate limiter, or `None` when limiting is disabled
pub fn create_rate_limiter(config: &RateLimitConfig) -> Option<Arc<GlobalRateLimiter>> {
    if !config.enabled {
        return None;
    }

    let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(config.burst).unwrap_or(NonZeroU32::MIN);
    let quota = Quota::per_minute(per_minute).allow_burst(burst);

    Some(Arc::new(RateLimiter::direct(quota)))
}

/// Rate limiting middleware for the chat endpoint
pub async fn chat_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(limiter) = &state.chat_limiter {
        if limiter.check().is_err() {
            tracing::warn!("Chat rate limit exceeded");
            return Err(AppError::RateLimited {
                limit: state.config.rate_limit.requests_per_minute,
            });
        }
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_burst() {
        let config = RateLimitConfig { requests_per_minute: 1, burst: 2, enabled: true };
        let limiter = create_rate_limiter(&config).unwrap();
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }

    #[test]
    fn test_disabled_limiter() {
        let config = RateLimitConfig { enabled: false, ..RateLimitConfig::default() };
        assert!(create_rate_limiter(&config).is_none());
    }
}
