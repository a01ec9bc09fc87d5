//! AppState construction shared by `serve` and the integration tests.

use std::sync::Arc;

use anyhow::Context;

use ll_domain::config::{Config, ConfigSeverity};
use ll_limits::{
    CleanupPolicy, InteractionLog, LimitRepository, LimitStore, PriceTable, StaticDirectory,
    TracingObserver, UsageTracker,
};

use crate::state::AppState;

/// Validate config, open the stores under `storage.state_path` and return a
/// fully-wired [`AppState`].
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Stores ───────────────────────────────────────────────────────
    let state_path = &config.storage.state_path;
    let limits: Arc<dyn LimitRepository> = Arc::new(
        LimitStore::open(state_path)
            .with_context(|| format!("opening limit store in {}", state_path.display()))?,
    );
    let interactions = Arc::new(
        InteractionLog::open(state_path)
            .with_context(|| format!("opening interaction log in {}", state_path.display()))?,
    );

    // ── Accounting ───────────────────────────────────────────────────
    let directory = Arc::new(StaticDirectory::from_config(&config.directory));
    let tracker = Arc::new(UsageTracker::new(
        limits.clone(),
        directory,
        Arc::new(TracingObserver),
    ));
    let cleanup = Arc::new(CleanupPolicy::new(limits.clone(), config.limits.clone()));
    let pricing = Arc::new(PriceTable::new(&config.pricing));

    tracing::info!(
        state_path = %state_path.display(),
        teams = config.directory.teams.len(),
        "limit accounting ready"
    );

    Ok(AppState {
        config,
        limits,
        cleanup,
        tracker,
        interactions,
        pricing,
    })
}
