//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::enforcement::{Enforcer, ThresholdPolicy};
use crate::engine::AntiCheatEngine;
use crate::rules::{RuleSet, RulesHandle};
use crate::store::{
    BanRegistry, DetectionLog, MemoryBanRegistry, PersistQueue, PersistWorker,
    PersistedBanRegistry, ReportFanout, ReportSink, SupabaseClient,
};
use crate::util::rate_limit::{create_limiter, Limiter, PlayerRateLimiter, ADMIN_RATE_LIMIT};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: AntiCheatEngine,
    pub detection_log: Arc<DetectionLog>,
    /// Read-after-write ban cache; also the persisted registry's front
    pub ban_cache: Arc<MemoryBanRegistry>,
    pub supabase: Option<SupabaseClient>,
    pub action_limiter: Arc<PlayerRateLimiter>,
    pub admin_limiter: Arc<Limiter>,
}

impl AppState {
    /// Wire the engine to its collaborators.
    ///
    /// With Supabase configured, reports and bans also go through the
    /// persistence queue and the returned worker must be spawned to drain it.
    pub fn new(config: Config, rules: RuleSet) -> (Self, Option<PersistWorker>) {
        let config = Arc::new(config);

        let detection_log = Arc::new(DetectionLog::new());
        let ban_cache = Arc::new(MemoryBanRegistry::new());
        let supabase = config.supabase.as_ref().map(SupabaseClient::new);

        let reports: Arc<dyn ReportSink>;
        let bans: Arc<dyn BanRegistry>;
        let worker = match &supabase {
            Some(client) => {
                let (queue, rx) = PersistQueue::channel(config.persist_queue_capacity);
                reports = Arc::new(
                    ReportFanout::new()
                        .with(detection_log.clone())
                        .with(Arc::new(queue.clone())),
                );
                bans = Arc::new(PersistedBanRegistry::new(ban_cache.clone(), queue));
                Some(PersistWorker::new(client.clone(), rx))
            }
            None => {
                reports = detection_log.clone();
                bans = ban_cache.clone();
                None
            }
        };

        let enforcer = Enforcer::new(Arc::new(ThresholdPolicy::default()), reports, bans);
        let engine = AntiCheatEngine::new(RulesHandle::new(rules), enforcer);

        let state = Self {
            config,
            engine,
            detection_log,
            ban_cache,
            supabase,
            action_limiter: Arc::new(PlayerRateLimiter::default()),
            admin_limiter: create_limiter(ADMIN_RATE_LIMIT),
        };

        (state, worker)
    }
}
