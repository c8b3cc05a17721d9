//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{keyed::DefaultKeyedStateStore, InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Limiter keyed by player id
pub type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

fn per_second(requests_per_second: u32) -> Quota {
    Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN))
}

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    Arc::new(RateLimiter::direct(per_second(requests_per_second)))
}

/// Max action validations per second per player
pub const ACTION_RATE_LIMIT: u32 = 60;

/// Max admin requests per second (shared)
pub const ADMIN_RATE_LIMIT: u32 = 10;

/// Per-player limiter. Keys live in governor's DashMap store and are
/// dropped by `retain_recent` once their quota has fully recovered.
pub struct PlayerRateLimiter {
    limiter: KeyedLimiter,
}

impl PlayerRateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            limiter: RateLimiter::keyed(per_second(requests_per_second)),
        }
    }

    /// Check if a request for this player is allowed (returns true if allowed)
    pub fn check(&self, user_id: &str) -> bool {
        self.limiter.check_key(&user_id.to_string()).is_ok()
    }

    /// Forget players whose limiter is back to a full burst
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Number of players currently tracked
    pub fn tracked(&self) -> usize {
        self.limiter.len()
    }
}

impl Default for PlayerRateLimiter {
    fn default() -> Self {
        Self::new(ACTION_RATE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn limits_each_player_separately() {
        let limiter = PlayerRateLimiter::new(2);
        assert!(limiter.check("u1"));
        assert!(limiter.check("u1"));
        assert!(!limiter.check("u1"));

        assert!(limiter.check("u2"));
        assert_eq!(limiter.tracked(), 2);
    }

    #[test]
    fn idle_players_are_evicted() {
        let limiter = PlayerRateLimiter::new(20);
        for i in 0..1_000 {
            assert!(limiter.check(&format!("player-{i}")));
        }
        assert_eq!(limiter.tracked(), 1_000);

        // One request per key recovers after 50 ms at 20/s
        std::thread::sleep(Duration::from_millis(200));
        limiter.retain_recent();
        assert_eq!(limiter.tracked(), 0);
    }
}
