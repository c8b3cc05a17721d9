//! Verdict aggregation - fixed-priority pipeline with short-circuiting

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::enforcement::Enforcer;
use crate::rules::RulesHandle;

use super::category::CheatCategory;
use super::detectors::{self, Detection, Evidence};
use super::heuristics;
use super::types::{ActionPayload, DetectionEvent, PlayerState, Verdict};

/// Severity attached to every hard violation
pub const HARD_VIOLATION_SEVERITY: f32 = 1.0;

/// One step of the verdict pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Speed,
    Teleport,
    BlockedSource,
    EspWallhack,
    Aimbot,
    RapidFire,
    ItemDupe,
    PacketForge,
    MemoryTamper,
    HardwareBan,
    Signatures,
}

/// Evaluation order. The reported reason is always the first stage that hits,
/// so cheap kinematic and signature checks run before the rest.
pub const PIPELINE: [Stage; 11] = [
    Stage::Speed,
    Stage::Teleport,
    Stage::BlockedSource,
    Stage::EspWallhack,
    Stage::Aimbot,
    Stage::RapidFire,
    Stage::ItemDupe,
    Stage::PacketForge,
    Stage::MemoryTamper,
    Stage::HardwareBan,
    Stage::Signatures,
];

impl Stage {
    fn run(self, ev: &Evidence<'_>, enforcer: &Enforcer, now: DateTime<Utc>) -> Option<Detection> {
        match self {
            Stage::Speed => detectors::speed_hack(ev),
            Stage::Teleport => detectors::teleport(ev),
            Stage::BlockedSource => detectors::blocked_source(ev),
            Stage::EspWallhack => detectors::esp_wallhack(ev),
            Stage::Aimbot => detectors::aimbot(ev),
            Stage::RapidFire => detectors::rapid_fire(ev),
            Stage::ItemDupe => detectors::item_dupe(ev),
            Stage::PacketForge => detectors::packet_forge(ev),
            Stage::MemoryTamper => detectors::memory_tamper(ev),
            Stage::HardwareBan => hardware_ban(ev, enforcer, now),
            Stage::Signatures => detectors::signature_table(ev),
        }
    }
}

fn hardware_ban(ev: &Evidence<'_>, enforcer: &Enforcer, now: DateTime<Utc>) -> Option<Detection> {
    let hwid = &ev.current.hwid;
    if hwid.is_empty() || !enforcer.is_hardware_banned(hwid, now) {
        return None;
    }
    Some(Detection {
        category: CheatCategory::HardwareBan,
        details: format!("hwid: {hwid}"),
        reason: None,
    })
}

/// The rule evaluation and escalation engine.
///
/// Holds no per-player state: every call is decided from the two snapshots,
/// the payload, and the rule set active when the call started.
#[derive(Clone)]
pub struct AntiCheatEngine {
    rules: RulesHandle,
    enforcer: Enforcer,
}

impl AntiCheatEngine {
    pub fn new(rules: RulesHandle, enforcer: Enforcer) -> Self {
        Self { rules, enforcer }
    }

    pub fn rules(&self) -> &RulesHandle {
        &self.rules
    }

    /// Evaluate one action against the current wall clock
    pub fn evaluate(
        &self,
        current: &PlayerState,
        previous: Option<&PlayerState>,
        action_type: &str,
        payload: &ActionPayload,
    ) -> Verdict {
        self.evaluate_at(current, previous, action_type, payload, Utc::now())
    }

    /// Evaluate one action at a fixed instant.
    ///
    /// The first hard violation emits one event at full severity, is
    /// enforced, and blocks the action. Without one, every soft signal is
    /// recorded and the action is allowed.
    pub fn evaluate_at(
        &self,
        current: &PlayerState,
        previous: Option<&PlayerState>,
        action_type: &str,
        payload: &ActionPayload,
        now: DateTime<Utc>,
    ) -> Verdict {
        let rules = self.rules.current();
        let ev = Evidence {
            current,
            previous,
            payload,
            rules: &rules,
        };

        if let Some((stage, detection)) = self.first_violation(&ev, now) {
            warn!(
                user_id = %current.user_id,
                action = %action_type,
                stage = ?stage,
                category = ?detection.category,
                details = %detection.details,
                "Action blocked"
            );

            let event = DetectionEvent::new(
                current.user_id.clone(),
                detection.category,
                detection.details.clone(),
                HARD_VIOLATION_SEVERITY,
                now,
            );
            self.enforcer.enforce(&event, current, &rules);
            return Verdict::block(detection.reason());
        }

        for signal in heuristics::evaluate(current, &rules) {
            let event = DetectionEvent::new(
                current.user_id.clone(),
                signal.category,
                signal.details,
                signal.severity,
                now,
            );
            self.enforcer.enforce(&event, current, &rules);
        }

        debug!(user_id = %current.user_id, action = %action_type, "Action allowed");
        Verdict::allow()
    }

    /// Walk the pipeline and return the first hit without side effects
    pub fn first_violation(
        &self,
        ev: &Evidence<'_>,
        now: DateTime<Utc>,
    ) -> Option<(Stage, Detection)> {
        PIPELINE
            .iter()
            .find_map(|stage| stage.run(ev, &self.enforcer, now).map(|d| (*stage, d)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::engine::types::Position;
    use crate::enforcement::ThresholdPolicy;
    use crate::rules::RuleSet;
    use crate::store::testing::RecordingSink;
    use crate::store::{BanRegistry, MemoryBanRegistry};

    struct Fixture {
        engine: AntiCheatEngine,
        reports: Arc<RecordingSink>,
        bans: Arc<MemoryBanRegistry>,
    }

    fn fixture() -> Fixture {
        let reports = Arc::new(RecordingSink::default());
        let bans = Arc::new(MemoryBanRegistry::new());
        let enforcer = Enforcer::new(
            Arc::new(ThresholdPolicy::default()),
            reports.clone(),
            bans.clone(),
        );
        let engine = AntiCheatEngine::new(RulesHandle::new(RuleSet::embedded().unwrap()), enforcer);
        Fixture {
            engine,
            reports,
            bans,
        }
    }

    fn clean(speed: f64) -> PlayerState {
        PlayerState {
            user_id: "u1".into(),
            hwid: "hw-1".into(),
            session_id: "session-0001".into(),
            ip_address: "10.0.0.1".into(),
            speed,
            src: "official_client".into(),
            ..Default::default()
        }
    }

    #[test]
    fn pipeline_order_is_fixed() {
        assert_eq!(PIPELINE[0], Stage::Speed);
        assert_eq!(PIPELINE[2], Stage::BlockedSource);
        assert_eq!(PIPELINE[9], Stage::HardwareBan);
        assert_eq!(PIPELINE[10], Stage::Signatures);
    }

    #[test]
    fn clean_action_is_allowed_without_events() {
        let f = fixture();
        let verdict = f.engine.evaluate(
            &clean(50.0),
            Some(&clean(50.0)),
            "move",
            &ActionPayload::default(),
        );
        assert_eq!(verdict, Verdict::allow());
        assert!(f.reports.events().is_empty());
    }

    #[test]
    fn speed_beats_blocked_source() {
        let f = fixture();
        let mut state = clean(150.0);
        state.src = "modded_client".into();

        let verdict = f.engine.evaluate(&state, None, "move", &ActionPayload::default());
        assert!(!verdict.valid);
        assert!(verdict.reason.starts_with("Speed hack"));

        let events = f.reports.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].category, CheatCategory::SpeedHack);
        assert_eq!(events[0].severity, 1.0);
    }

    #[test]
    fn teleport_uses_displacement_from_previous() {
        let f = fixture();
        let previous = clean(10.0);
        let mut current = clean(10.0);
        current.position = Position::new(80.0, 0.0);

        let verdict = f.engine.evaluate(&current, Some(&previous), "move", &ActionPayload::default());
        assert_eq!(verdict.reason, "Teleport/position tampering detected.");
    }

    #[test]
    fn hard_violation_stops_before_heuristics() {
        let f = fixture();
        let mut state = clean(10.0);
        state.session_id = "x".into();
        let mut payload = ActionPayload::default();
        payload.packet_forge_attempt = true;

        let verdict = f.engine.evaluate(&state, None, "trade", &payload);
        assert_eq!(verdict.reason, "Packet forging detected.");
        assert_eq!(f.reports.events().len(), 1);
    }

    #[test]
    fn soft_signals_never_flip_verdict() {
        let f = fixture();
        let mut state = clean(10.0);
        state.session_id = "x".into();
        state.telemetry.movement_entropy = 0.01;

        let verdict = f.engine.evaluate(&state, None, "move", &ActionPayload::default());
        assert!(verdict.valid);

        let events = f.reports.events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.severity < 1.0));
        assert!(!f.bans.is_account_banned("u1"));
    }

    #[test]
    fn banned_device_is_rejected() {
        let f = fixture();
        let now = Utc::now();
        f.bans.ban_hardware(crate::store::HardwareBan {
            hwid: "hw-1".into(),
            reason: "Aimbot".into(),
            user_id: "someone-else".into(),
            banned_from: now,
            banned_until: now + chrono::Duration::days(365),
        });

        let verdict = f
            .engine
            .evaluate_at(&clean(10.0), None, "move", &ActionPayload::default(), now);
        assert_eq!(verdict, Verdict::block("Device banned."));
    }

    #[test]
    fn signature_table_runs_last() {
        let f = fixture();
        let mut state = clean(10.0);
        state.src = "Spinbot_v2".into();

        let verdict = f.engine.evaluate(&state, None, "move", &ActionPayload::default());
        assert_eq!(verdict.reason, "Spinbot detected.");
        assert_eq!(f.reports.events()[0].category, CheatCategory::Spinbot);
    }

    #[test]
    fn cheat_source_outranks_later_detectors() {
        let f = fixture();
        let mut state = clean(10.0);
        state.src = "aimbot.dll".into();
        let mut payload = ActionPayload::default();
        payload.item_dupe_attempt = true;

        let verdict = f.engine.evaluate(&state, None, "craft", &payload);
        assert_eq!(verdict.reason, "Blocked client source: aimbot.dll");
        assert_eq!(
            f.reports.events()[0].category,
            CheatCategory::BlockedClientSource
        );
    }

    #[test]
    fn speed_marker_in_source_is_a_source_block_not_a_speed_hack() {
        let f = fixture();
        let mut state = clean(10.0);
        state.src = "speedhack_v2".into();

        let verdict = f.engine.evaluate(&state, None, "move", &ActionPayload::default());
        assert_eq!(verdict.reason, "Blocked client source: speedhack_v2");
    }

    #[test]
    fn extreme_retention_does_not_panic_evaluation() {
        let f = fixture();
        let mut rules = RuleSet::embedded().unwrap();
        rules.thresholds.hardware_ban_retention_days = i64::MAX;
        f.engine.rules().replace(rules);

        let verdict = f.engine.evaluate(&clean(500.0), None, "move", &ActionPayload::default());
        assert!(!verdict.valid);
        assert!(f.bans.hardware_ban("hw-1").is_some());
    }

    #[test]
    fn block_bans_device_for_next_evaluation() {
        let f = fixture();
        let now = Utc::now();
        let mut payload = ActionPayload::default();
        payload.item_dupe_attempt = true;
        f.engine.evaluate_at(&clean(10.0), None, "craft", &payload, now);

        // Same device, new account, clean action
        let mut alt = clean(10.0);
        alt.user_id = "u2".into();
        let verdict = f.engine.evaluate_at(&alt, None, "move", &ActionPayload::default(), now);
        assert_eq!(verdict.reason, "Device banned.");
    }
}
