//! Rule configuration - thresholds, marker lists and reload handling
//!
//! Rules are data, not code: operators edit the TOML rule file and reload it
//! without restarting the service. A default rule file is embedded in the
//! binary for when no `RULES_PATH` is configured.

pub mod network;

use std::path::Path;
use std::sync::Arc;

use chrono::Duration;
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::info;

use crate::engine::category::CheatCategory;
use crate::engine::signature::{SignatureMatcher, SignatureRule};

pub use network::IpRange;

/// Rule file shipped with the binary
pub const EMBEDDED_RULES: &str = include_str!("../../config/rules.toml");

/// Accepted range for `hardware_ban_retention_days`
pub const RETENTION_DAYS_RANGE: std::ops::RangeInclusive<i64> = 1..=36_500;

/// Hard-violation thresholds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Maximum plausible speed per snapshot
    pub max_speed: f64,
    /// Maximum displacement between consecutive snapshots
    pub max_teleport_distance: f64,
    /// Minimum gap between two shots (ms)
    pub min_fire_interval_ms: i64,
    /// How long a hardware ban lasts
    pub hardware_ban_retention_days: i64,
    /// Aim change (degrees) that counts as a snap
    pub aim_snap_angle_deg: f64,
    /// Aim change must happen faster than this to count as a snap (ms)
    pub aim_snap_window_ms: i64,
    /// Hit rate above which a sample is inhumanly accurate
    pub perfect_hit_rate: f64,
    /// Minimum shots for the hit-rate rule to apply
    pub perfect_hit_min_shots: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_speed: 100.0,
            max_teleport_distance: 50.0,
            min_fire_interval_ms: 100,
            hardware_ban_retention_days: 365,
            aim_snap_angle_deg: 45.0,
            aim_snap_window_ms: 50,
            perfect_hit_rate: 0.99,
            perfect_hit_min_shots: 20,
        }
    }
}

impl Thresholds {
    /// Hardware ban length, clamped into `RETENTION_DAYS_RANGE`
    pub fn hardware_retention(&self) -> Duration {
        let days = self
            .hardware_ban_retention_days
            .clamp(*RETENTION_DAYS_RANGE.start(), *RETENTION_DAYS_RANGE.end());
        Duration::days(days)
    }
}

/// Soft-signal thresholds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeuristicThresholds {
    pub min_movement_entropy: f64,
    pub min_aim_smoothness: f64,
    pub max_hit_miss_ratio: f64,
    pub hit_ratio_min_events: u32,
    pub max_tick_delta: f64,
    pub max_suspicious_events: u32,
    pub min_session_id_len: usize,
}

impl Default for HeuristicThresholds {
    fn default() -> Self {
        Self {
            min_movement_entropy: 0.2,
            min_aim_smoothness: 0.15,
            max_hit_miss_ratio: 0.95,
            hit_ratio_min_events: 10,
            max_tick_delta: 0.5,
            max_suspicious_events: 50,
            min_session_id_len: 8,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct NetworkSection {
    trusted_ranges: Vec<IpRange>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct SourcesSection {
    allow: Vec<String>,
    blocked: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SignatureEntry {
    marker: String,
    category: CheatCategory,
}

/// Raw rule file layout
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RuleFile {
    thresholds: Thresholds,
    heuristics: HeuristicThresholds,
    network: NetworkSection,
    sources: SourcesSection,
    signatures: Vec<SignatureEntry>,
}

/// Validated, ready-to-evaluate rule set
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub thresholds: Thresholds,
    pub heuristics: HeuristicThresholds,
    pub trusted_ranges: Vec<IpRange>,
    pub matcher: SignatureMatcher,
}

impl RuleSet {
    /// Parse a rule set from TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self, RulesError> {
        let file: RuleFile = toml::from_str(raw)?;
        Self::from_file(file)
    }

    /// Load a rule set from a TOML file on disk
    pub fn load(path: &Path) -> Result<Self, RulesError> {
        let raw = std::fs::read_to_string(path).map_err(|source| RulesError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// The rule set embedded in the binary
    pub fn embedded() -> Result<Self, RulesError> {
        Self::from_toml_str(EMBEDDED_RULES)
    }

    fn from_file(file: RuleFile) -> Result<Self, RulesError> {
        let RuleFile {
            thresholds,
            heuristics,
            network,
            sources,
            signatures,
        } = file;

        let mut all_markers = sources
            .allow
            .iter()
            .chain(sources.blocked.iter())
            .chain(signatures.iter().map(|s| &s.marker));
        if all_markers.any(|m| m.trim().is_empty()) {
            return Err(RulesError::EmptyMarker);
        }

        if !RETENTION_DAYS_RANGE.contains(&thresholds.hardware_ban_retention_days) {
            return Err(RulesError::RetentionOutOfRange(
                thresholds.hardware_ban_retention_days,
            ));
        }

        if let Some(entry) = signatures.iter().find(|s| s.category.is_soft_signal()) {
            return Err(RulesError::SoftCategoryInTable(entry.marker.clone()));
        }

        // Pipeline categories have dedicated stages; their markers belong in `blocked`
        if let Some(entry) = signatures.iter().find(|s| s.category.is_pipeline()) {
            return Err(RulesError::PipelineCategoryInTable(entry.marker.clone()));
        }

        let signatures = signatures
            .into_iter()
            .map(|s| SignatureRule::new(s.marker, s.category))
            .collect();

        Ok(Self {
            thresholds,
            heuristics,
            trusted_ranges: network.trusted_ranges,
            matcher: SignatureMatcher::new(sources.allow, sources.blocked, signatures),
        })
    }
}

/// Shared, swappable handle to the active rule set.
///
/// Evaluations take an `Arc` snapshot up front, so a reload never changes
/// the rules halfway through one evaluation.
#[derive(Clone)]
pub struct RulesHandle {
    inner: Arc<RwLock<Arc<RuleSet>>>,
}

impl RulesHandle {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(rules))),
        }
    }

    /// Snapshot of the active rules
    pub fn current(&self) -> Arc<RuleSet> {
        self.inner.read().clone()
    }

    /// Swap in a new rule set
    pub fn replace(&self, rules: RuleSet) {
        *self.inner.write() = Arc::new(rules);
    }

    /// Re-read the rule file and swap it in. The active rules are kept on error.
    pub fn reload_from(&self, path: &Path) -> Result<Arc<RuleSet>, RulesError> {
        let rules = Arc::new(RuleSet::load(path)?);
        *self.inner.write() = rules.clone();

        info!(
            path = %path.display(),
            blocked = rules.matcher.blocked_len(),
            signatures = rules.matcher.signatures().len(),
            "Rules reloaded"
        );
        Ok(rules)
    }
}

/// Rule loading errors
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("Failed to read rule file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid rule file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid trusted range: {0}")]
    InvalidRange(String),

    #[error("Marker strings must not be empty")]
    EmptyMarker,

    #[error("Signature marker {0:?} maps to a soft-signal category")]
    SoftCategoryInTable(String),

    #[error("Signature marker {0:?} maps to a pipeline category; list it under [sources] blocked")]
    PipelineCategoryInTable(String),

    #[error("hardware_ban_retention_days must be within 1..=36500, got {0}")]
    RetentionOutOfRange(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_rules_parse() {
        let rules = RuleSet::embedded().unwrap();
        assert_eq!(rules.thresholds.max_speed, 100.0);
        assert_eq!(rules.thresholds.min_fire_interval_ms, 100);
        assert_eq!(rules.thresholds.hardware_ban_retention_days, 365);
        assert!(rules.matcher.signatures().len() >= 40);
        assert!(rules.trusted_ranges.is_empty());
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let rules = RuleSet::from_toml_str("[thresholds]\nmax_speed = 12.0\n").unwrap();
        assert_eq!(rules.thresholds.max_speed, 12.0);
        assert_eq!(rules.thresholds.max_teleport_distance, 50.0);
        assert_eq!(rules.heuristics.min_session_id_len, 8);
        assert!(rules.matcher.signatures().is_empty());
    }

    #[test]
    fn rejects_empty_marker() {
        let err = RuleSet::from_toml_str("[sources]\nblocked = [\"  \"]\n").unwrap_err();
        assert!(matches!(err, RulesError::EmptyMarker));
    }

    #[test]
    fn rejects_soft_category_in_signature_table() {
        let raw = "[[signatures]]\nmarker = \"x\"\ncategory = \"low_aim_smoothness\"\n";
        let err = RuleSet::from_toml_str(raw).unwrap_err();
        assert!(matches!(err, RulesError::SoftCategoryInTable(_)));
    }

    #[test]
    fn rejects_pipeline_category_in_signature_table() {
        let raw = "[[signatures]]\nmarker = \"speedhack\"\ncategory = \"speed_hack\"\n";
        let err = RuleSet::from_toml_str(raw).unwrap_err();
        assert!(matches!(err, RulesError::PipelineCategoryInTable(m) if m == "speedhack"));
    }

    #[test]
    fn rejects_out_of_range_retention() {
        for days in ["0", "-5", "36501", "9223372036854775807"] {
            let raw = format!("[thresholds]\nhardware_ban_retention_days = {days}\n");
            let err = RuleSet::from_toml_str(&raw).unwrap_err();
            assert!(matches!(err, RulesError::RetentionOutOfRange(_)), "days {days}");
        }
        assert!(RuleSet::from_toml_str("[thresholds]\nhardware_ban_retention_days = 36500\n").is_ok());
    }

    #[test]
    fn retention_is_clamped_when_built_by_hand() {
        let mut thresholds = Thresholds::default();
        thresholds.hardware_ban_retention_days = i64::MAX;
        assert_eq!(thresholds.hardware_retention(), Duration::days(36_500));
        thresholds.hardware_ban_retention_days = -1;
        assert_eq!(thresholds.hardware_retention(), Duration::days(1));
    }

    #[test]
    fn embedded_rules_block_pipeline_markers_at_source_stage() {
        let rules = RuleSet::embedded().unwrap();
        let sources = [
            "ESP_HACK",
            "esp_hack",
            "Esp_Hack",
            "aimbot.dll",
            "speedhack_v2",
            "itemdupe",
            "TeleportHack",
        ];
        for src in sources {
            assert!(rules.matcher.is_blocked_source(src), "src {src}");
        }
        assert!(rules
            .matcher
            .signatures()
            .iter()
            .all(|rule| !rule.category.is_pipeline() && !rule.category.is_soft_signal()));
        assert!(!rules.matcher.is_blocked_source("lunor_custom_cosmatics.pak esp_hack"));
    }

    #[test]
    fn rejects_bad_cidr() {
        let raw = "[network]\ntrusted_ranges = [\"10.0.0.0/99\"]\n";
        assert!(RuleSet::from_toml_str(raw).is_err());
    }

    #[test]
    fn handle_swaps_rules_without_touching_old_snapshots() {
        let handle = RulesHandle::new(RuleSet::embedded().unwrap());
        let before = handle.current();

        handle.replace(RuleSet::from_toml_str("[thresholds]\nmax_speed = 1.0\n").unwrap());

        assert_eq!(before.thresholds.max_speed, 100.0);
        assert_eq!(handle.current().thresholds.max_speed, 1.0);
    }

    #[test]
    fn reload_keeps_active_rules_on_error() {
        let handle = RulesHandle::new(RuleSet::embedded().unwrap());
        let missing = Path::new("/nonexistent/rules.toml");

        assert!(matches!(
            handle.reload_from(missing),
            Err(RulesError::Io { .. })
        ));
        assert_eq!(handle.current().thresholds.max_speed, 100.0);
    }
}
