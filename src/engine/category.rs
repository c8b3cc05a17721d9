//! Closed enumeration of cheat categories the engine can report

use serde::{Deserialize, Serialize};

/// Every category a DetectionEvent can carry.
///
/// The first block is owned by dedicated stages of the verdict pipeline;
/// source markers for cheats of that kind (esp, aimbot, speedhack...) go in
/// the blocked-source list. The second block is only reachable through the
/// signature marker table, so adding a marker for one of them is a
/// rules-file change. The last block holds the soft statistical signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheatCategory {
    // Pipeline detectors
    SpeedHack,
    Teleport,
    BlockedClientSource,
    EspWallhack,
    Aimbot,
    RapidFire,
    ItemDupe,
    PacketForge,
    MemoryTamper,
    HardwareBan,

    // Signature-keyed
    SilentAim,
    Spinbot,
    FlyHack,
    Noclip,
    GodMode,
    RadarHack,
    Triggerbot,
    AutoClicker,
    Macro,
    RecoilScript,
    CheatEngine,
    Trainer,
    Hvh,
    ScriptExecutor,
    Minimap,
    StatChanger,
    FovChanger,
    InventoryHack,
    SkinChanger,
    Chams,
    Backtrack,
    HitboxExpander,
    SuperJump,
    SuperRun,
    MoneyHack,
    ScoreHack,
    XpBoost,
    DamageHack,
    DropHack,
    CrashServer,
    ForceKick,
    Spoofer,
    Hook,
    ModMenu,

    // Soft signals
    LowMovementEntropy,
    LowAimSmoothness,
    SuspiciousHitRatio,
    TickDeltaAnomaly,
    ExcessiveSuspiciousEvents,
    UntrustedNetwork,
    MalformedSession,
}

impl CheatCategory {
    /// Short label stored with reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SpeedHack => "Speed Hack",
            Self::Teleport => "Teleport/Position Tampering",
            Self::BlockedClientSource => "Blocked Client Source",
            Self::EspWallhack => "ESP/Wallhack/Injector/Overlay",
            Self::Aimbot => "Aimbot",
            Self::RapidFire => "Rapid Fire",
            Self::ItemDupe => "Item Duplication",
            Self::PacketForge => "Packet Forging",
            Self::MemoryTamper => "Memory Tampering",
            Self::HardwareBan => "HWID Ban",
            Self::SilentAim => "Silent Aim",
            Self::Spinbot => "Spinbot",
            Self::FlyHack => "Fly Hack",
            Self::Noclip => "Noclip",
            Self::GodMode => "God Mode",
            Self::RadarHack => "Radar Hack",
            Self::Triggerbot => "Triggerbot",
            Self::AutoClicker => "Auto Clicker",
            Self::Macro => "Macro",
            Self::RecoilScript => "Recoil Script",
            Self::CheatEngine => "Cheat Engine",
            Self::Trainer => "Trainer",
            Self::Hvh => "HvH Client",
            Self::ScriptExecutor => "Script Executor",
            Self::Minimap => "Minimap Hack",
            Self::StatChanger => "Stat Changer",
            Self::FovChanger => "FOV Changer",
            Self::InventoryHack => "Inventory Hack",
            Self::SkinChanger => "Skin Changer",
            Self::Chams => "Chams",
            Self::Backtrack => "Backtrack",
            Self::HitboxExpander => "Hitbox Expander",
            Self::SuperJump => "Super Jump",
            Self::SuperRun => "Super Run",
            Self::MoneyHack => "Money Hack",
            Self::ScoreHack => "Score Hack",
            Self::XpBoost => "XP Boost",
            Self::DamageHack => "Damage Hack",
            Self::DropHack => "Drop Hack",
            Self::CrashServer => "Server Crasher",
            Self::ForceKick => "Force Kick",
            Self::Spoofer => "Spoofer",
            Self::Hook => "Hook Library",
            Self::ModMenu => "Mod Menu",
            Self::LowMovementEntropy => "Low Movement Entropy",
            Self::LowAimSmoothness => "Low Aim Smoothness",
            Self::SuspiciousHitRatio => "Suspicious Hit Ratio",
            Self::TickDeltaAnomaly => "Tick Delta Anomaly",
            Self::ExcessiveSuspiciousEvents => "Excessive Suspicious Events",
            Self::UntrustedNetwork => "Untrusted Network",
            Self::MalformedSession => "Malformed Session",
        }
    }

    /// Verdict reason returned to the caller when this category blocks an action.
    ///
    /// `BlockedClientSource` is formatted by the aggregator since it echoes
    /// the offending source string.
    pub fn message(&self) -> String {
        match self {
            Self::SpeedHack => "Speed hack detected. Action blocked.".to_string(),
            Self::Teleport => "Teleport/position tampering detected.".to_string(),
            Self::BlockedClientSource => "Blocked client source.".to_string(),
            Self::EspWallhack => "ESP/Wallhack/Injector/Overlay detected.".to_string(),
            Self::Aimbot => "Aimbot-like behavior detected.".to_string(),
            Self::RapidFire => "Rapid fire detected.".to_string(),
            Self::ItemDupe => "Item duplication cheat detected.".to_string(),
            Self::PacketForge => "Packet forging detected.".to_string(),
            Self::MemoryTamper => "Memory tampering detected.".to_string(),
            Self::HardwareBan => "Device banned.".to_string(),
            other => format!("{} detected.", other.as_str()),
        }
    }

    /// Whether a dedicated pipeline stage owns this category
    pub fn is_pipeline(&self) -> bool {
        matches!(
            self,
            Self::SpeedHack
                | Self::Teleport
                | Self::BlockedClientSource
                | Self::EspWallhack
                | Self::Aimbot
                | Self::RapidFire
                | Self::ItemDupe
                | Self::PacketForge
                | Self::MemoryTamper
                | Self::HardwareBan
        )
    }

    /// Whether this category is a non-blocking statistical signal
    pub fn is_soft_signal(&self) -> bool {
        matches!(
            self,
            Self::LowMovementEntropy
                | Self::LowAimSmoothness
                | Self::SuspiciousHitRatio
                | Self::TickDeltaAnomaly
                | Self::ExcessiveSuspiciousEvents
                | Self::UntrustedNetwork
                | Self::MalformedSession
        )
    }
}

impl std::fmt::Display for CheatCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_round_trip_through_snake_case() {
        let parsed: CheatCategory = serde_json::from_str("\"silent_aim\"").unwrap();
        assert_eq!(parsed, CheatCategory::SilentAim);
        assert_eq!(
            serde_json::to_string(&CheatCategory::Hvh).unwrap(),
            "\"hvh\""
        );
    }

    #[test]
    fn pipeline_and_soft_blocks_are_disjoint() {
        assert!(CheatCategory::Aimbot.is_pipeline());
        assert!(!CheatCategory::Spinbot.is_pipeline());
        assert!(!CheatCategory::Spinbot.is_soft_signal());
        assert!(!CheatCategory::UntrustedNetwork.is_pipeline());
    }

    #[test]
    fn marker_categories_get_generic_message() {
        assert_eq!(CheatCategory::Spinbot.message(), "Spinbot detected.");
        assert!(CheatCategory::SpeedHack.message().starts_with("Speed hack detected"));
    }
}
