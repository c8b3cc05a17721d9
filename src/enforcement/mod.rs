//! Enforcement policy - turns detections into side effects
//!
//! The policy only decides; `Enforcer` carries the decision out through the
//! report sink and ban registry. Swapping the policy changes escalation
//! without touching any detector.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::engine::category::CheatCategory;
use crate::engine::types::{DetectionEvent, PlayerState};
use crate::rules::RuleSet;
use crate::store::{BanRegistry, HardwareBan, ReportSink};

/// What to do about one detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Record the report only
    LogOnly,
    /// Record, ban the account, and ban the device for `hardware_retention`
    /// when a hardware id is known
    Ban { hardware_retention: Duration },
}

/// Strategy mapping a detection to a disposition.
///
/// `rules` is the snapshot the detection was made under, so retention
/// windows follow rule reloads.
pub trait EnforcementPolicy: Send + Sync {
    fn decide(&self, category: CheatCategory, severity: f32, rules: &RuleSet) -> Disposition;
}

/// Ban at or above a severity threshold, log below it
#[derive(Debug, Clone)]
pub struct ThresholdPolicy {
    pub ban_threshold: f32,
}

impl ThresholdPolicy {
    pub fn new(ban_threshold: f32) -> Self {
        Self { ban_threshold }
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl EnforcementPolicy for ThresholdPolicy {
    fn decide(&self, _category: CheatCategory, severity: f32, rules: &RuleSet) -> Disposition {
        if severity >= self.ban_threshold {
            Disposition::Ban {
                hardware_retention: rules.thresholds.hardware_retention(),
            }
        } else {
            Disposition::LogOnly
        }
    }
}

/// Executes dispositions through the external collaborators
#[derive(Clone)]
pub struct Enforcer {
    policy: Arc<dyn EnforcementPolicy>,
    reports: Arc<dyn ReportSink>,
    bans: Arc<dyn BanRegistry>,
}

impl Enforcer {
    pub fn new(
        policy: Arc<dyn EnforcementPolicy>,
        reports: Arc<dyn ReportSink>,
        bans: Arc<dyn BanRegistry>,
    ) -> Self {
        Self {
            policy,
            reports,
            bans,
        }
    }

    /// Hardware ban lookup for the verdict pipeline
    pub fn is_hardware_banned(&self, hwid: &str, now: DateTime<Utc>) -> bool {
        self.bans.is_hardware_banned(hwid, now)
    }

    /// Record the event and apply whatever the policy decides
    pub fn enforce(
        &self,
        event: &DetectionEvent,
        state: &PlayerState,
        rules: &RuleSet,
    ) -> Disposition {
        self.reports.record(event);

        let disposition = self.policy.decide(event.category, event.severity, rules);
        if let Disposition::Ban { hardware_retention } = disposition {
            let reason = event.category.as_str();
            self.bans.ban_account(&state.user_id, reason, event.timestamp);

            if !state.hwid.is_empty() {
                let banned_until = event
                    .timestamp
                    .checked_add_signed(hardware_retention)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                self.bans.ban_hardware(HardwareBan {
                    hwid: state.hwid.clone(),
                    reason: reason.to_string(),
                    user_id: state.user_id.clone(),
                    banned_from: event.timestamp,
                    banned_until,
                });
            }

            warn!(
                user_id = %state.user_id,
                hwid = %state.hwid,
                category = ?event.category,
                "Player banned"
            );
        } else {
            info!(
                user_id = %state.user_id,
                category = ?event.category,
                severity = event.severity,
                "Detection logged"
            );
        }

        disposition
    }
}
