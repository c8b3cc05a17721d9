//! In-memory ban registry

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use super::{AccountBan, BanRegistry, HardwareBan};

/// Concurrent in-process ban registry.
///
/// Used on its own in tests and single-node setups, and as the read side of
/// `PersistedBanRegistry`.
#[derive(Default)]
pub struct MemoryBanRegistry {
    accounts: DashMap<String, AccountBan>,
    hardware: DashMap<String, HardwareBan>,
}

impl MemoryBanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the registry with bans loaded from storage
    pub fn load_hardware_bans(&self, bans: impl IntoIterator<Item = HardwareBan>) -> usize {
        let mut loaded = 0;
        for ban in bans {
            self.ban_hardware(ban);
            loaded += 1;
        }
        loaded
    }

    pub fn is_account_banned(&self, user_id: &str) -> bool {
        self.accounts.contains_key(user_id)
    }

    pub fn account_ban(&self, user_id: &str) -> Option<AccountBan> {
        self.accounts.get(user_id).map(|b| b.clone())
    }

    pub fn hardware_ban(&self, hwid: &str) -> Option<HardwareBan> {
        self.hardware.get(hwid).map(|b| b.clone())
    }

    /// Number of hardware bans in force at `now`
    pub fn active_hardware_bans(&self, now: DateTime<Utc>) -> usize {
        self.hardware.iter().filter(|b| b.is_active(now)).count()
    }
}

impl BanRegistry for MemoryBanRegistry {
    /// First ban wins; repeat bans for an already banned account are no-ops
    fn ban_account(&self, user_id: &str, reason: &str, at: DateTime<Utc>) {
        self.accounts
            .entry(user_id.to_string())
            .or_insert_with(|| AccountBan {
                user_id: user_id.to_string(),
                reason: reason.to_string(),
                banned_at: at,
            });
    }

    /// Re-banning a device keeps whichever window ends later
    fn ban_hardware(&self, ban: HardwareBan) {
        let hwid = ban.hwid.clone();
        self.hardware
            .entry(hwid)
            .and_modify(|existing| {
                if ban.banned_until > existing.banned_until {
                    *existing = ban.clone();
                }
            })
            .or_insert_with(|| ban.clone());
        debug!(hwid = %ban.hwid, until = %ban.banned_until, "Hardware ban recorded");
    }

    fn is_hardware_banned(&self, hwid: &str, now: DateTime<Utc>) -> bool {
        if hwid.is_empty() {
            return false;
        }
        self.hardware
            .get(hwid)
            .map(|ban| ban.is_active(now))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ban(hwid: &str, from: DateTime<Utc>, days: i64) -> HardwareBan {
        HardwareBan {
            hwid: hwid.into(),
            reason: "Aimbot".into(),
            user_id: "u1".into(),
            banned_from: from,
            banned_until: from + Duration::days(days),
        }
    }

    #[test]
    fn hardware_ban_visible_immediately() {
        let registry = MemoryBanRegistry::new();
        let now = Utc::now();
        assert!(!registry.is_hardware_banned("hw-1", now));

        registry.ban_hardware(ban("hw-1", now, 365));
        assert!(registry.is_hardware_banned("hw-1", now));
        assert!(!registry.is_hardware_banned("hw-1", now + Duration::days(366)));
    }

    #[test]
    fn rebanning_keeps_longer_window() {
        let registry = MemoryBanRegistry::new();
        let now = Utc::now();
        registry.ban_hardware(ban("hw-1", now, 365));
        registry.ban_hardware(ban("hw-1", now, 30));

        let stored = registry.hardware_ban("hw-1").unwrap();
        assert_eq!(stored.banned_until, now + Duration::days(365));
    }

    #[test]
    fn empty_hwid_is_never_banned() {
        let registry = MemoryBanRegistry::new();
        let now = Utc::now();
        registry.ban_hardware(ban("", now, 365));
        assert!(!registry.is_hardware_banned("", now));
    }

    #[test]
    fn account_ban_is_idempotent() {
        let registry = MemoryBanRegistry::new();
        let first = Utc::now();
        registry.ban_account("u1", "Speed Hack", first);
        registry.ban_account("u1", "Aimbot", first + Duration::minutes(5));

        let stored = registry.account_ban("u1").unwrap();
        assert_eq!(stored.reason, "Speed Hack");
        assert_eq!(stored.banned_at, first);
    }

    #[test]
    fn load_counts_seeded_bans() {
        let registry = MemoryBanRegistry::new();
        let now = Utc::now();
        let loaded = registry.load_hardware_bans(vec![ban("a", now, 1), ban("b", now, 1)]);
        assert_eq!(loaded, 2);
        assert_eq!(registry.active_hardware_bans(now), 2);
    }
}
