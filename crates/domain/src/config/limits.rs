use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Limits / cleanup configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How long accumulated usage is kept before an organization's limits are
/// reset.  Serialized as `"1h"`, `"12h"`, `"24h"`, `"1w"` or `"1m"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CleanupInterval {
    #[default]
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "12h")]
    TwelveHours,
    #[serde(rename = "24h")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
    /// Thirty days.
    #[serde(rename = "1m")]
    OneMonth,
}

impl CleanupInterval {
    pub fn duration(&self) -> chrono::Duration {
        match self {
            Self::OneHour => chrono::Duration::hours(1),
            Self::TwelveHours => chrono::Duration::hours(12),
            Self::OneDay => chrono::Duration::hours(24),
            Self::OneWeek => chrono::Duration::weeks(1),
            Self::OneMonth => chrono::Duration::days(30),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Interval applied to organizations without an override.
    #[serde(default)]
    pub cleanup_interval: CleanupInterval,
    /// Per-organization overrides keyed by organization id.
    #[serde(default)]
    pub organizations: HashMap<String, OrganizationLimits>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationLimits {
    pub cleanup_interval: CleanupInterval,
}

impl LimitsConfig {
    pub fn cleanup_interval_for(&self, organization_id: &str) -> CleanupInterval {
        self.organizations
            .get(organization_id)
            .map(|o| o.cleanup_interval)
            .unwrap_or(self.cleanup_interval)
    }
}
