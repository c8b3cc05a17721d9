//! Action Guard server
//!
//! Entry point for the cheat-detection service. It handles:
//! - Rule loading (rule file or the embedded defaults)
//! - HTTP endpoints for action validation and operator review
//! - Supabase persistence of reports and bans

use std::net::SocketAddr;
use std::time::Duration;

use chrono::Utc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use action_guard::app::AppState;
use action_guard::config::Config;
use action_guard::http::build_router;
use action_guard::rules::RuleSet;
use action_guard::store::persist::load_active_hardware_bans;
use action_guard::util::time::init_server_time;

/// How often stale detection history and idle limiter keys are pruned
const PRUNE_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Action Guard");
    info!("Server address: {}", config.server_addr);

    let rules = match &config.rules_path {
        Some(path) => {
            info!("Loading rules from {}", path.display());
            RuleSet::load(path)?
        }
        None => {
            info!("Using embedded rules");
            RuleSet::embedded()?
        }
    };
    info!(
        blocked_sources = rules.matcher.blocked_len(),
        signatures = rules.matcher.signatures().len(),
        trusted_ranges = rules.trusted_ranges.len(),
        "Rules loaded"
    );

    // Create application state
    let (state, worker) = AppState::new(config.clone(), rules);

    // Hydrate hardware bans and start the persistence worker
    if let Some(client) = &state.supabase {
        match load_active_hardware_bans(client, Utc::now()).await {
            Ok(bans) => {
                let loaded = state.ban_cache.load_hardware_bans(bans);
                info!(loaded, "Hardware bans hydrated");
            }
            Err(e) => warn!(error = %e, "Failed to load hardware bans, starting empty"),
        }
    } else {
        warn!("Supabase not configured, bans are kept in memory only");
    }

    if let Some(worker) = worker {
        tokio::spawn(worker.run());
    }

    // Prune detection history and idle rate-limiter keys
    let detection_log = state.detection_log.clone();
    let action_limiter = state.action_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            detection_log.prune(Utc::now());
            action_limiter.retain_recent();
            debug!(tracked = action_limiter.tracked(), "Pruned idle rate limiters");
        }
    });

    // Build router
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
