//! Short-term detection history and review flagging
//!
//! Keeps a bounded per-player history of detections and flags players who
//! trip too many detections in a short window for manual review.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::info;

use crate::engine::types::DetectionEvent;

use super::ReportSink;

/// Detections kept per player
pub const HISTORY_LIMIT: usize = 100;
/// Detections older than this are dropped from history
pub const HISTORY_RETENTION_HOURS: i64 = 24;
/// Window in which detections are counted toward a flag
pub const FLAG_WINDOW_MINUTES: i64 = 60;
/// Detections within the window that trigger a flag
pub const FLAG_THRESHOLD: usize = 5;
/// Detections attached to a flag as evidence
pub const FLAG_EVIDENCE: usize = 10;
/// Flags expire after this long
pub const FLAG_RETENTION_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    PendingReview,
}

/// A player awaiting manual review
#[derive(Debug, Clone, Serialize)]
pub struct ReviewFlag {
    pub user_id: String,
    pub flagged_at: DateTime<Utc>,
    pub reason: String,
    pub detections: Vec<DetectionEvent>,
    pub status: ReviewStatus,
}

/// Per-player detection history, sharded so players don't contend
#[derive(Default)]
pub struct DetectionLog {
    histories: DashMap<String, VecDeque<DetectionEvent>>,
    flags: DashMap<String, ReviewFlag>,
}

impl DetectionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a detection and re-check the player's flag status
    pub fn append(&self, event: &DetectionEvent) {
        let now = event.timestamp;
        let retention = now - Duration::hours(HISTORY_RETENTION_HOURS);
        let window = now - Duration::minutes(FLAG_WINDOW_MINUTES);

        let flag = {
            let mut history = self.histories.entry(event.user_id.clone()).or_default();
            history.push_back(event.clone());
            history.retain(|e| e.timestamp > retention);
            while history.len() > HISTORY_LIMIT {
                history.pop_front();
            }

            let recent = history.iter().filter(|e| e.timestamp > window).count();
            (recent >= FLAG_THRESHOLD).then(|| {
                let skip = history.len().saturating_sub(FLAG_EVIDENCE);
                ReviewFlag {
                    user_id: event.user_id.clone(),
                    flagged_at: now,
                    reason: "Multiple suspicious activities".to_string(),
                    detections: history.iter().skip(skip).cloned().collect(),
                    status: ReviewStatus::PendingReview,
                }
            })
        };

        if let Some(flag) = flag {
            let first = !self.flags.contains_key(&flag.user_id);
            self.flags.insert(flag.user_id.clone(), flag);
            if first {
                info!(user_id = %event.user_id, "Player flagged for review");
            }
        }
    }

    /// Detections currently retained for a player, oldest first
    pub fn history(&self, user_id: &str) -> Vec<DetectionEvent> {
        self.histories
            .get(user_id)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Flags that have not yet expired at `now`
    pub fn flagged(&self, now: DateTime<Utc>) -> Vec<ReviewFlag> {
        let cutoff = now - Duration::days(FLAG_RETENTION_DAYS);
        let mut flags: Vec<ReviewFlag> = self
            .flags
            .iter()
            .filter(|f| f.flagged_at > cutoff)
            .map(|f| f.clone())
            .collect();
        flags.sort_by(|a, b| b.flagged_at.cmp(&a.flagged_at));
        flags
    }

    pub fn flagged_count(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::days(FLAG_RETENTION_DAYS);
        self.flags.iter().filter(|f| f.flagged_at > cutoff).count()
    }

    /// Drop a player's flag and history. Returns whether anything was removed.
    pub fn clear(&self, user_id: &str) -> bool {
        let had_flag = self.flags.remove(user_id).is_some();
        let had_history = self.histories.remove(user_id).is_some();
        if had_flag || had_history {
            info!(user_id = %user_id, "Cleared detection history and flags");
        }
        had_flag || had_history
    }

    /// Remove expired flags and stale histories
    pub fn prune(&self, now: DateTime<Utc>) {
        let flag_cutoff = now - Duration::days(FLAG_RETENTION_DAYS);
        let history_cutoff = now - Duration::hours(HISTORY_RETENTION_HOURS);
        self.flags.retain(|_, f| f.flagged_at > flag_cutoff);
        self.histories.retain(|_, h| {
            h.retain(|e| e.timestamp > history_cutoff);
            !h.is_empty()
        });
    }
}

impl ReportSink for DetectionLog {
    fn record(&self, event: &DetectionEvent) {
        self.append(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::category::CheatCategory;

    fn event(user: &str, at: DateTime<Utc>) -> DetectionEvent {
        DetectionEvent::new(user, CheatCategory::LowAimSmoothness, "aim smoothness: 0.1", 0.7, at)
    }

    #[test]
    fn history_is_capped() {
        let log = DetectionLog::new();
        let start = Utc::now();
        for i in 0..(HISTORY_LIMIT as i64 + 20) {
            log.append(&event("u1", start + Duration::seconds(i)));
        }
        let history = log.history("u1");
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].timestamp, start + Duration::seconds(20));
    }

    #[test]
    fn old_detections_expire_from_history() {
        let log = DetectionLog::new();
        let start = Utc::now();
        log.append(&event("u1", start));
        log.append(&event("u1", start + Duration::hours(25)));
        assert_eq!(log.history("u1").len(), 1);
    }

    #[test]
    fn five_detections_within_an_hour_flags_player() {
        let log = DetectionLog::new();
        let start = Utc::now();
        for i in 0..4 {
            log.append(&event("u1", start + Duration::minutes(i)));
        }
        assert!(log.flagged(start).is_empty());

        log.append(&event("u1", start + Duration::minutes(4)));
        let flags = log.flagged(start + Duration::minutes(4));
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].user_id, "u1");
        assert_eq!(flags[0].detections.len(), 5);
        assert_eq!(flags[0].status, ReviewStatus::PendingReview);
    }

    #[test]
    fn spread_out_detections_do_not_flag() {
        let log = DetectionLog::new();
        let start = Utc::now();
        for i in 0..8 {
            log.append(&event("u1", start + Duration::minutes(i * 20)));
        }
        assert_eq!(log.flagged_count(start + Duration::hours(3)), 0);
    }

    #[test]
    fn flag_keeps_last_ten_detections() {
        let log = DetectionLog::new();
        let start = Utc::now();
        for i in 0..15 {
            log.append(&event("u1", start + Duration::seconds(i)));
        }
        let flag = &log.flagged(start + Duration::seconds(15))[0];
        assert_eq!(flag.detections.len(), FLAG_EVIDENCE);
        assert_eq!(flag.detections[0].timestamp, start + Duration::seconds(5));
    }

    #[test]
    fn clear_removes_flag_and_history() {
        let log = DetectionLog::new();
        let start = Utc::now();
        for i in 0..5 {
            log.append(&event("u1", start + Duration::seconds(i)));
        }
        assert!(log.clear("u1"));
        assert!(log.history("u1").is_empty());
        assert!(log.flagged(start).is_empty());
        assert!(!log.clear("u1"));
    }

    #[test]
    fn flags_expire_after_retention() {
        let log = DetectionLog::new();
        let start = Utc::now();
        for i in 0..5 {
            log.append(&event("u1", start + Duration::seconds(i)));
        }
        let later = start + Duration::days(FLAG_RETENTION_DAYS + 1);
        assert!(log.flagged(later).is_empty());

        log.prune(later);
        assert!(log.history("u1").is_empty());
    }

    #[test]
    fn players_are_tracked_independently() {
        let log = DetectionLog::new();
        let start = Utc::now();
        for i in 0..5 {
            log.append(&event("u1", start + Duration::seconds(i)));
        }
        log.append(&event("u2", start));
        assert_eq!(log.history("u2").len(), 1);
        assert_eq!(log.flagged(start + Duration::seconds(5)).len(), 1);
    }
}
