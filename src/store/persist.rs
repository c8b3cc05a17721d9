//! Asynchronous persistence of reports and bans
//!
//! The engine's collaborators are synchronous, so durable writes are pushed
//! onto a bounded channel and drained by a background worker. A full queue
//! drops the write with a warning; the verdict has already been returned by
//! then and never depends on the write.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::engine::category::CheatCategory;
use crate::engine::types::DetectionEvent;

use super::memory::MemoryBanRegistry;
use super::supabase::{
    SupabaseClient, SupabaseError, ACCOUNT_BANS_TABLE, HARDWARE_BANS_TABLE, REPORTS_TABLE,
};
use super::{AccountBan, BanRegistry, HardwareBan, ReportSink};

/// One queued durable write
#[derive(Debug, Clone, PartialEq)]
pub enum PersistCommand {
    Report(DetectionEvent),
    AccountBan(AccountBan),
    HardwareBan(HardwareBan),
}

/// Sending half of the persistence queue
#[derive(Clone)]
pub struct PersistQueue {
    tx: mpsc::Sender<PersistCommand>,
}

impl PersistQueue {
    /// Create a queue with the given capacity and its receiving end
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<PersistCommand>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueue without waiting. Returns false if the write was dropped.
    pub fn push(&self, cmd: PersistCommand) -> bool {
        match self.tx.try_send(cmd) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(cmd)) => {
                warn!(command = ?cmd, "Persistence queue full, dropping write");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Persistence queue closed, dropping write");
                false
            }
        }
    }
}

impl ReportSink for PersistQueue {
    fn record(&self, event: &DetectionEvent) {
        self.push(PersistCommand::Report(event.clone()));
    }
}

/// Ban registry that answers reads from memory and persists writes in the
/// background. Writes land in memory first so reads see them immediately.
#[derive(Clone)]
pub struct PersistedBanRegistry {
    cache: Arc<MemoryBanRegistry>,
    queue: PersistQueue,
}

impl PersistedBanRegistry {
    pub fn new(cache: Arc<MemoryBanRegistry>, queue: PersistQueue) -> Self {
        Self { cache, queue }
    }

    pub fn cache(&self) -> &Arc<MemoryBanRegistry> {
        &self.cache
    }
}

impl BanRegistry for PersistedBanRegistry {
    fn ban_account(&self, user_id: &str, reason: &str, at: DateTime<Utc>) {
        let already = self.cache.is_account_banned(user_id);
        self.cache.ban_account(user_id, reason, at);
        if !already {
            self.queue.push(PersistCommand::AccountBan(AccountBan {
                user_id: user_id.to_string(),
                reason: reason.to_string(),
                banned_at: at,
            }));
        }
    }

    /// Only persists when the incoming ban replaced the cached one, so a
    /// shorter re-ban never overwrites a longer stored window.
    fn ban_hardware(&self, ban: HardwareBan) {
        self.cache.ban_hardware(ban.clone());
        match self.cache.hardware_ban(&ban.hwid) {
            Some(kept) if kept == ban => {
                self.queue.push(PersistCommand::HardwareBan(kept));
            }
            _ => debug!(hwid = %ban.hwid, "Longer hardware ban already stored"),
        }
    }

    fn is_hardware_banned(&self, hwid: &str, now: DateTime<Utc>) -> bool {
        self.cache.is_hardware_banned(hwid, now)
    }
}

/// Stored shape of a detection report
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    id: Uuid,
    user_id: &'a str,
    category: CheatCategory,
    label: &'static str,
    details: &'a str,
    severity: f32,
    created_at: DateTime<Utc>,
}

impl<'a> From<&'a DetectionEvent> for ReportRow<'a> {
    fn from(event: &'a DetectionEvent) -> Self {
        Self {
            id: event.id,
            user_id: &event.user_id,
            category: event.category,
            label: event.category.as_str(),
            details: &event.details,
            severity: event.severity,
            created_at: event.timestamp,
        }
    }
}

/// Background task writing queued commands to Supabase
pub struct PersistWorker {
    client: SupabaseClient,
    rx: mpsc::Receiver<PersistCommand>,
}

impl PersistWorker {
    pub fn new(client: SupabaseClient, rx: mpsc::Receiver<PersistCommand>) -> Self {
        Self { client, rx }
    }

    /// Drain the queue until every sender is dropped
    pub async fn run(mut self) {
        info!("Persistence worker started");

        while let Some(cmd) = self.rx.recv().await {
            if let Err(e) = self.write(&cmd).await {
                error!(error = %e, command = ?cmd, "Failed to persist");
            } else {
                debug!(command = ?cmd, "Persisted");
            }
        }

        info!("Persistence worker stopped");
    }

    async fn write(&self, cmd: &PersistCommand) -> Result<(), SupabaseError> {
        match cmd {
            PersistCommand::Report(event) => {
                self.client
                    .insert(REPORTS_TABLE, &ReportRow::from(event))
                    .await
            }
            PersistCommand::AccountBan(ban) => self.client.insert(ACCOUNT_BANS_TABLE, ban).await,
            PersistCommand::HardwareBan(ban) => {
                self.client.upsert(HARDWARE_BANS_TABLE, ban, "hwid").await
            }
        }
    }
}

/// Load hardware bans still in force at `now`
pub async fn load_active_hardware_bans(
    client: &SupabaseClient,
    now: DateTime<Utc>,
) -> Result<Vec<HardwareBan>, SupabaseError> {
    let query = format!(
        "select=*&banned_until=gt.{}",
        now.format("%Y-%m-%dT%H:%M:%SZ")
    );
    client.get(HARDWARE_BANS_TABLE, &query).await
}
