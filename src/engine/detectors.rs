//! Behavioral detector catalog
//!
//! Every detector is a pure function of the evidence for one action. They
//! return `Some(Detection)` on a hit so the aggregator can report the
//! category and details without re-deriving them.

use crate::rules::RuleSet;

use super::category::CheatCategory;
use super::kinematic;
use super::types::{ActionPayload, PlayerState};

/// Everything a detector may look at for one action
#[derive(Debug, Clone, Copy)]
pub struct Evidence<'a> {
    pub current: &'a PlayerState,
    pub previous: Option<&'a PlayerState>,
    pub payload: &'a ActionPayload,
    pub rules: &'a RuleSet,
}

/// A detector hit
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub category: CheatCategory,
    pub details: String,
    /// Verdict reason; falls back to the category message when unset
    pub reason: Option<String>,
}

impl Detection {
    fn new(category: CheatCategory, details: impl Into<String>) -> Self {
        Self {
            category,
            details: details.into(),
            reason: None,
        }
    }

    pub fn reason(&self) -> String {
        self.reason
            .clone()
            .unwrap_or_else(|| self.category.message())
    }
}

pub fn speed_hack(ev: &Evidence<'_>) -> Option<Detection> {
    let hit = ev.current.signals.speedhack
        || kinematic::speed_violation(ev.current, &ev.rules.thresholds);
    hit.then(|| Detection::new(CheatCategory::SpeedHack, format!("speed: {}", ev.current.speed)))
}

pub fn teleport(ev: &Evidence<'_>) -> Option<Detection> {
    let flagged = ev.current.signals.teleport || ev.payload.teleport_active;
    let moved_too_far =
        kinematic::displacement_violation(ev.current, ev.previous, &ev.rules.thresholds);
    if !(flagged || moved_too_far) {
        return None;
    }

    let details = match kinematic::displacement(ev.current, ev.previous) {
        Some(dist) => format!("distance: {dist:.2}"),
        None => "teleport signal".to_string(),
    };
    Some(Detection::new(CheatCategory::Teleport, details))
}

pub fn blocked_source(ev: &Evidence<'_>) -> Option<Detection> {
    let src = &ev.current.src;
    ev.rules.matcher.blocked_marker(src).map(|marker| Detection {
        category: CheatCategory::BlockedClientSource,
        details: format!("src: {src} (marker: {marker})"),
        reason: Some(format!("Blocked client source: {src}")),
    })
}

pub fn esp_wallhack(ev: &Evidence<'_>) -> Option<Detection> {
    let s = &ev.current.signals;
    let hit = s.esp
        || s.wallhack
        || s.injector
        || s.overlay
        || ev.payload.esp_active
        || ev.payload.wallhack_active;
    hit.then(|| {
        Detection::new(
            CheatCategory::EspWallhack,
            "ESP/Wallhack/Injector/Overlay signals detected.",
        )
    })
}

/// Smallest difference between two angles in degrees, in [0, 180]
pub fn angle_delta(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % 360.0;
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

pub fn aimbot(ev: &Evidence<'_>) -> Option<Detection> {
    let aim = &ev.payload.aim;
    let t = &ev.rules.thresholds;

    if aim.is_perfect_snap {
        return Some(Detection::new(CheatCategory::Aimbot, "perfect snap reported"));
    }
    if ev.current.signals.aimbot {
        return Some(Detection::new(CheatCategory::Aimbot, "aim assist signal"));
    }

    // Compared against the previous action's aim sample, never its position
    if let Some(prev_aim) = ev.previous.and_then(|p| p.last_aim) {
        let delta = angle_delta(aim.angle, prev_aim.angle);
        let elapsed = aim.timestamp_ms.saturating_sub(prev_aim.timestamp_ms);
        if delta > t.aim_snap_angle_deg && elapsed < t.aim_snap_window_ms {
            return Some(Detection::new(
                CheatCategory::Aimbot,
                format!("aim snap: {delta:.1} deg in {elapsed} ms"),
            ));
        }
    }

    if aim.hit_rate > t.perfect_hit_rate && aim.shots > t.perfect_hit_min_shots {
        return Some(Detection::new(
            CheatCategory::Aimbot,
            format!("hit rate {:.3} over {} shots", aim.hit_rate, aim.shots),
        ));
    }

    None
}

/// Minimum gap between consecutive fire timestamps in submitted order.
///
/// The input is not sorted first: an out-of-order pair yields a negative
/// interval, which is exactly what a forged or replayed sequence looks like.
pub fn min_fire_interval(timestamps: &[i64]) -> Option<i64> {
    timestamps
        .windows(2)
        .map(|pair| pair[1].saturating_sub(pair[0]))
        .min()
}

pub fn rapid_fire(ev: &Evidence<'_>) -> Option<Detection> {
    if ev.payload.fire.is_rapid_fire {
        return Some(Detection::new(CheatCategory::RapidFire, "rapid fire reported"));
    }
    if ev.current.signals.abnormal_input {
        return Some(Detection::new(CheatCategory::RapidFire, "abnormal input signal"));
    }

    let min = min_fire_interval(&ev.payload.fire.fire_timestamps)?;
    (min < ev.rules.thresholds.min_fire_interval_ms).then(|| {
        Detection::new(
            CheatCategory::RapidFire,
            format!("min fire interval: {min} ms"),
        )
    })
}

pub fn item_dupe(ev: &Evidence<'_>) -> Option<Detection> {
    (ev.current.signals.item_dupe || ev.payload.item_dupe_attempt)
        .then(|| Detection::new(CheatCategory::ItemDupe, "item dupe detected"))
}

pub fn packet_forge(ev: &Evidence<'_>) -> Option<Detection> {
    (ev.current.signals.packet_forge || ev.payload.packet_forge_attempt)
        .then(|| Detection::new(CheatCategory::PacketForge, "packet forging detected"))
}

pub fn memory_tamper(ev: &Evidence<'_>) -> Option<Detection> {
    (ev.current.signals.memory_tamper || ev.payload.memory_tamper_attempt)
        .then(|| Detection::new(CheatCategory::MemoryTamper, "memory tampering detected"))
}

/// One pass over the marker table; first match wins
pub fn signature_table(ev: &Evidence<'_>) -> Option<Detection> {
    ev.rules
        .matcher
        .match_signature(&ev.current.src)
        .map(|rule| {
            Detection::new(
                rule.category,
                format!("src: {} (marker: {})", ev.current.src, rule.marker),
            )
        })
}
