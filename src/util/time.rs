//! Process start time, reported by `/health`

use std::sync::OnceLock;
use std::time::Instant;

use chrono::{DateTime, Utc};

struct StartTime {
    /// Monotonic, for uptime
    instant: Instant,
    /// Wall clock, for display
    wall: DateTime<Utc>,
}

static STARTED: OnceLock<StartTime> = OnceLock::new();

/// Record the start time. Later calls keep the first value.
pub fn init_server_time() {
    STARTED.get_or_init(|| StartTime {
        instant: Instant::now(),
        wall: Utc::now(),
    });
}

/// When the service started, if `init_server_time` has run
pub fn started_at() -> Option<DateTime<Utc>> {
    STARTED.get().map(|s| s.wall)
}

/// Seconds since start; 0 before `init_server_time`
pub fn uptime_secs() -> u64 {
    STARTED
        .get()
        .map(|s| s.instant.elapsed().as_secs())
        .unwrap_or(0)
}
