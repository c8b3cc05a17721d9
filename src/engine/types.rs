//! Engine input and output records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::category::CheatCategory;

/// 2-D position in world units
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One aim sample: where the player was aiming and when
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AimSample {
    /// Aim angle in degrees
    pub angle: f64,
    /// Unix timestamp in milliseconds
    pub timestamp_ms: i64,
}

/// Self-reported cheat signals produced by out-of-band detectors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheatSignals {
    pub esp: bool,
    pub wallhack: bool,
    pub injector: bool,
    pub overlay: bool,
    pub abnormal_input: bool,
    pub memory_tamper: bool,
    pub speedhack: bool,
    pub teleport: bool,
    pub aimbot: bool,
    pub packet_forge: bool,
    pub item_dupe: bool,
}

/// Aggregated telemetry for statistical heuristics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Telemetry {
    pub movement_entropy: f64,
    pub aim_smoothness: f64,
    pub server_tick_delta: f64,
    pub suspicious_event_count: u32,
    pub hit_miss_ratio: f64,
}

impl Default for Telemetry {
    /// Clean telemetry: nothing here trips a heuristic
    fn default() -> Self {
        Self {
            movement_entropy: 1.0,
            aim_smoothness: 1.0,
            server_tick_delta: 0.0,
            suspicious_event_count: 0,
            hit_miss_ratio: 0.0,
        }
    }
}

/// Snapshot of one player at one instant.
///
/// Built by the session layer for every action and never mutated by the
/// engine. The caller keeps the previous action's snapshot and passes it
/// back on the next evaluation. Speed and position are compared raw, so
/// consecutive snapshots must be captured at a consistent interval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerState {
    pub user_id: String,
    pub hwid: String,
    pub session_id: String,
    pub ip_address: String,

    pub speed: f64,
    pub position: Position,

    /// Declared client source / build identifier
    pub src: String,

    pub signals: CheatSignals,
    pub telemetry: Telemetry,

    /// Aim sample recorded with this action, compared against the next payload
    pub last_aim: Option<AimSample>,
}

/// Aim evidence attached to an action
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AimPayload {
    pub angle: f64,
    pub timestamp_ms: i64,
    pub hit_rate: f64,
    pub shots: u32,
    pub is_perfect_snap: bool,
}

/// Fire evidence attached to an action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirePayload {
    /// Shot timestamps in submission order; not guaranteed sorted
    pub fire_timestamps: Vec<i64>,
    pub is_rapid_fire: bool,
}

/// Evidence for one submitted action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionPayload {
    pub aim: AimPayload,
    pub fire: FirePayload,
    pub esp_active: bool,
    pub wallhack_active: bool,
    pub teleport_active: bool,
    pub item_dupe_attempt: bool,
    pub packet_forge_attempt: bool,
    pub memory_tamper_attempt: bool,
}

/// One emitted detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub id: Uuid,
    pub user_id: String,
    pub category: CheatCategory,
    pub details: String,
    /// Weight in [0.0, 1.0]; 1.0 marks a hard violation
    pub severity: f32,
    pub timestamp: DateTime<Utc>,
}

impl DetectionEvent {
    pub fn new(
        user_id: impl Into<String>,
        category: CheatCategory,
        details: impl Into<String>,
        severity: f32,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            category,
            details: details.into(),
            severity: severity.clamp(0.0, 1.0),
            timestamp,
        }
    }
}

/// Result of one evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub valid: bool,
    pub reason: String,
}

impl Verdict {
    pub fn allow() -> Self {
        Self {
            valid: true,
            reason: String::new(),
        }
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: reason.into(),
        }
    }
}
