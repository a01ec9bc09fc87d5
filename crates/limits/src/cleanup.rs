//! Lazy, read-triggered reset of organization usage counters.
//!
//! There is no timer: the limits listing path calls
//! [`CleanupPolicy::cleanup_if_needed`] before reading, so an organization
//! that is never read is never reset.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use ll_domain::config::LimitsConfig;
use ll_domain::error::Result;

use crate::store::LimitRepository;

pub struct CleanupPolicy {
    limits: Arc<dyn LimitRepository>,
    config: LimitsConfig,
}

impl CleanupPolicy {
    pub fn new(limits: Arc<dyn LimitRepository>, config: LimitsConfig) -> Self {
        Self { limits, config }
    }

    /// Rows last cleaned before this instant are due.
    pub fn cutoff_for(&self, organization_id: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.config.cleanup_interval_for(organization_id).duration()
    }

    /// Reset every due organization row.  Returns how many were reset.
    pub async fn cleanup_if_needed(&self, organization_id: &str) -> Result<usize> {
        let cutoff = self.cutoff_for(organization_id, Utc::now());
        let due = self
            .limits
            .find_limits_needing_cleanup(organization_id, cutoff)
            .await?;

        let mut reset = 0;
        for limit in &due {
            if self.limits.reset_usage(&limit.id).await?.is_some() {
                reset += 1;
            }
        }

        if reset > 0 {
            tracing::info!(organization_id, reset, cutoff = %cutoff, "reset organization limit usage");
        }
        Ok(reset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LimitStore;
    use ll_domain::config::{CleanupInterval, OrganizationLimits};
    use ll_domain::limit::{LimitEntityType, LimitType, NewLimit, UsageDelta, UsageSelector};

    fn org_limit(org: &str) -> NewLimit {
        NewLimit {
            entity_type: LimitEntityType::Organization,
            entity_id: org.into(),
            limit_type: LimitType::TokenCost,
            limit_value: 1000,
            model: Some("gpt-4o".into()),
            mcp_server_name: None,
            tool_name: None,
        }
    }

    #[test]
    fn cutoff_uses_organization_interval() {
        let mut config = LimitsConfig::default();
        config.organizations.insert(
            "weekly".into(),
            OrganizationLimits {
                cleanup_interval: CleanupInterval::OneWeek,
            },
        );
        let policy = CleanupPolicy::new(Arc::new(LimitStore::in_memory()), config);
        let now = Utc::now();
        assert_eq!(policy.cutoff_for("weekly", now), now - chrono::Duration::weeks(1));
        assert_eq!(policy.cutoff_for("other", now), now - chrono::Duration::hours(1));
    }

    #[tokio::test]
    async fn never_cleaned_rows_reset_then_not_due() {
        let store = Arc::new(LimitStore::in_memory());
        let limit = store.create(org_limit("org")).await.unwrap();
        store
            .increment_usage(
                &UsageSelector::tokens(LimitEntityType::Organization, "org"),
                UsageDelta::new(100, 50),
            )
            .await
            .unwrap();

        let policy = CleanupPolicy::new(store.clone(), LimitsConfig::default());
        assert_eq!(policy.cleanup_if_needed("org").await.unwrap(), 1);

        let row = store.get(&limit.id).await.unwrap().unwrap();
        assert_eq!((row.current_usage_tokens_in, row.current_usage_tokens_out), (0, 0));
        assert!(row.last_cleanup.is_some());

        // Just cleaned: nothing due within the hour.
        assert_eq!(policy.cleanup_if_needed("org").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn other_organizations_untouched() {
        let store = Arc::new(LimitStore::in_memory());
        let other = store.create(org_limit("other")).await.unwrap();
        store
            .increment_usage(
                &UsageSelector::tokens(LimitEntityType::Organization, "other"),
                UsageDelta::new(1, 1),
            )
            .await
            .unwrap();

        let policy = CleanupPolicy::new(store.clone(), LimitsConfig::default());
        assert_eq!(policy.cleanup_if_needed("org").await.unwrap(), 0);
        let row = store.get(&other.id).await.unwrap().unwrap();
        assert_eq!(row.current_usage_tokens_in, 1);
    }
}
