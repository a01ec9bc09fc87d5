use std::sync::Arc;

use ll_domain::config::Config;
use ll_limits::{CleanupPolicy, InteractionLog, LimitRepository, PriceTable, UsageTracker};

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    // ── Limits ────────────────────────────────────────────────────────
    pub limits: Arc<dyn LimitRepository>,
    /// Lazy per-organization counter reset, consulted before listings.
    pub cleanup: Arc<CleanupPolicy>,
    /// Fans interaction usage out to organization/team/agent limits.
    pub tracker: Arc<UsageTracker>,

    // ── Interactions & pricing ───────────────────────────────────────
    pub interactions: Arc<InteractionLog>,
    pub pricing: Arc<PriceTable>,
}
