//! External collaborator boundaries and their adapters
//!
//! The engine only ever talks to `ReportSink` and `BanRegistry`. Both are
//! synchronous and must return promptly: anything that does I/O queues the
//! work and returns.

pub mod memory;
pub mod persist;
pub mod review;
pub mod supabase;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::types::DetectionEvent;

pub use memory::MemoryBanRegistry;
pub use persist::{PersistCommand, PersistQueue, PersistWorker, PersistedBanRegistry};
pub use review::{DetectionLog, ReviewFlag};
pub use supabase::SupabaseClient;

/// Account ban record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBan {
    pub user_id: String,
    pub reason: String,
    pub banned_at: DateTime<Utc>,
}

/// Hardware ban record with an explicit validity window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareBan {
    pub hwid: String,
    pub reason: String,
    pub user_id: String,
    pub banned_from: DateTime<Utc>,
    pub banned_until: DateTime<Utc>,
}

impl HardwareBan {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.banned_from <= now && now < self.banned_until
    }
}

/// Destination for detection reports. Fire-and-forget: implementations
/// swallow and log their own failures.
pub trait ReportSink: Send + Sync {
    fn record(&self, event: &DetectionEvent);
}

/// Account and hardware ban storage.
///
/// A hardware ban written through `ban_hardware` must be visible to the next
/// `is_hardware_banned` call from any thread.
pub trait BanRegistry: Send + Sync {
    fn ban_account(&self, user_id: &str, reason: &str, at: DateTime<Utc>);
    fn ban_hardware(&self, ban: HardwareBan);
    fn is_hardware_banned(&self, hwid: &str, now: DateTime<Utc>) -> bool;
}

/// Sends every report to each inner sink in order
#[derive(Clone, Default)]
pub struct ReportFanout {
    sinks: Vec<Arc<dyn ReportSink>>,
}

impl ReportFanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl ReportSink for ReportFanout {
    fn record(&self, event: &DetectionEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;
    use crate::engine::category::CheatCategory;

    #[test]
    fn fanout_reaches_every_sink() {
        let a = Arc::new(RecordingSink::default());
        let b = Arc::new(RecordingSink::default());
        let fanout = ReportFanout::new().with(a.clone()).with(b.clone());

        fanout.record(&DetectionEvent::new(
            "u1",
            CheatCategory::Macro,
            "src: macro",
            1.0,
            Utc::now(),
        ));

        assert_eq!(a.events().len(), 1);
        assert_eq!(b.events().len(), 1);
    }

    #[test]
    fn hardware_ban_window_is_half_open() {
        let from = Utc::now();
        let until = from + chrono::Duration::days(1);
        let ban = HardwareBan {
            hwid: "hw".into(),
            reason: "r".into(),
            user_id: "u".into(),
            banned_from: from,
            banned_until: until,
        };
        assert!(ban.is_active(from));
        assert!(!ban.is_active(until));
        assert!(!ban.is_active(from - chrono::Duration::seconds(1)));
    }
}
