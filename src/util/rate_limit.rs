//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Spawn requests per second accepted from one connection
pub const SPAWN_RATE_LIMIT: u32 = 10;

/// Per-connection rate limiter state
#[derive(Clone)]
pub struct ConnectionRateLimiter {
    spawn_limiter: Arc<Limiter>,
}

impl ConnectionRateLimiter {
    pub fn new() -> Self {
        Self {
            spawn_limiter: create_limiter(SPAWN_RATE_LIMIT),
        }
    }

    /// Check if a spawn request is allowed (returns true if allowed)
    pub fn check_spawn(&self) -> bool {
        self.spawn_limiter.check().is_ok()
    }
}

impl Default for ConnectionRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_beyond_quota_is_rejected() {
        let limiter = ConnectionRateLimiter::new();
        let allowed = (0..SPAWN_RATE_LIMIT * 3)
            .filter(|_| limiter.check_spawn())
            .count();
        assert!(allowed >= 1);
        assert!(allowed <= SPAWN_RATE_LIMIT as usize + 1);
    }
}
