//! Statistical heuristics - soft signals that are logged but never block

use std::net::IpAddr;

use crate::rules::RuleSet;

use super::category::CheatCategory;
use super::types::PlayerState;

/// One soft signal hit, with its analytics weight
#[derive(Debug, Clone, PartialEq)]
pub struct SoftSignal {
    pub category: CheatCategory,
    pub details: String,
    pub severity: f32,
}

impl SoftSignal {
    fn new(category: CheatCategory, details: String) -> Self {
        Self {
            category,
            severity: weight(category),
            details,
        }
    }
}

/// Fixed analytics weight per soft signal
pub fn weight(category: CheatCategory) -> f32 {
    match category {
        CheatCategory::LowMovementEntropy => 0.6,
        CheatCategory::LowAimSmoothness => 0.7,
        CheatCategory::SuspiciousHitRatio => 0.8,
        CheatCategory::TickDeltaAnomaly => 0.5,
        CheatCategory::ExcessiveSuspiciousEvents => 0.7,
        CheatCategory::UntrustedNetwork => 0.5,
        CheatCategory::MalformedSession => 0.6,
        _ => 0.5,
    }
}

/// Run every heuristic independently. Output order is fixed and depends only
/// on the state and the rules, so repeated runs give the same signals.
pub fn evaluate(state: &PlayerState, rules: &RuleSet) -> Vec<SoftSignal> {
    let h = &rules.heuristics;
    let t = &state.telemetry;
    let mut signals = Vec::new();

    if t.movement_entropy < h.min_movement_entropy {
        signals.push(SoftSignal::new(
            CheatCategory::LowMovementEntropy,
            format!("movement entropy: {:.3}", t.movement_entropy),
        ));
    }

    if t.aim_smoothness < h.min_aim_smoothness {
        signals.push(SoftSignal::new(
            CheatCategory::LowAimSmoothness,
            format!("aim smoothness: {:.3}", t.aim_smoothness),
        ));
    }

    if t.hit_miss_ratio > h.max_hit_miss_ratio && t.suspicious_event_count > h.hit_ratio_min_events
    {
        signals.push(SoftSignal::new(
            CheatCategory::SuspiciousHitRatio,
            format!(
                "hit/miss ratio: {:.3} with {} suspicious events",
                t.hit_miss_ratio, t.suspicious_event_count
            ),
        ));
    }

    if t.server_tick_delta > h.max_tick_delta {
        signals.push(SoftSignal::new(
            CheatCategory::TickDeltaAnomaly,
            format!("server tick delta: {:.3}", t.server_tick_delta),
        ));
    }

    if t.suspicious_event_count > h.max_suspicious_events {
        signals.push(SoftSignal::new(
            CheatCategory::ExcessiveSuspiciousEvents,
            format!("suspicious events: {}", t.suspicious_event_count),
        ));
    }

    if !rules.trusted_ranges.is_empty() && !is_trusted_ip(&state.ip_address, rules) {
        signals.push(SoftSignal::new(
            CheatCategory::UntrustedNetwork,
            format!("ip: {}", state.ip_address),
        ));
    }

    if state.session_id.chars().count() < h.min_session_id_len {
        signals.push(SoftSignal::new(
            CheatCategory::MalformedSession,
            format!("session id length: {}", state.session_id.chars().count()),
        ));
    }

    signals
}

/// An unparseable address is never trusted
fn is_trusted_ip(raw: &str, rules: &RuleSet) -> bool {
    match raw.trim().parse::<IpAddr>() {
        Ok(addr) => rules.trusted_ranges.iter().any(|r| r.contains(&addr)),
        Err(_) => false,
    }
}
