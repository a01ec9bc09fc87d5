//! Fans interaction usage out to every limit that applies.
//!
//! For one interaction the tracker charges, concurrently:
//! - the organization of the agent's first resolvable team (or, for team-less
//!   agents, the oldest organization that has any limit row),
//! - every team the agent belongs to,
//! - the agent itself.
//!
//! Accounting is best effort.  Nothing here returns an error to the caller;
//! failures are reported to the [`UsageObserver`] and the remaining
//! increments still run.  The fan-out is not transactional.

use std::sync::Arc;

use futures_util::future::join_all;
use uuid::Uuid;

use ll_domain::error::Error;
use ll_domain::interaction::Interaction;
use ll_domain::limit::{LimitEntityType, UsageDelta, UsageSelector};

use crate::directory::Membership;
use crate::store::LimitRepository;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Observer
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Receives the accounting problems the tracker swallows.
pub trait UsageObserver: Send + Sync {
    /// The agent has no team; the organization fallback is about to run.
    fn agent_without_team(&self, agent_id: &str, interaction_id: &Uuid);

    /// No organization could be charged for a team-less agent.
    fn organization_unresolved(&self, agent_id: &str, reason: &str);

    /// The membership lookup itself failed.
    fn membership_lookup_failed(&self, agent_id: &str, error: &Error);

    /// A single increment write failed.
    fn increment_failed(&self, selector: &UsageSelector, error: &Error);
}

/// Production observer: structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl UsageObserver for TracingObserver {
    fn agent_without_team(&self, agent_id: &str, interaction_id: &Uuid) {
        tracing::warn!(
            agent_id,
            interaction_id = %interaction_id,
            "agent has no team assignments; falling back to first organization limit"
        );
    }

    fn organization_unresolved(&self, agent_id: &str, reason: &str) {
        tracing::error!(agent_id, reason, "organization usage dropped for team-less agent");
    }

    fn membership_lookup_failed(&self, agent_id: &str, error: &Error) {
        tracing::error!(agent_id, error = %error, "team membership lookup failed");
    }

    fn increment_failed(&self, selector: &UsageSelector, error: &Error) {
        tracing::error!(
            entity_type = %selector.entity_type,
            entity_id = %selector.entity_id,
            limit_type = %selector.limit_type,
            error = %error,
            "failed to update limit usage"
        );
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// UsageTracker
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct UsageTracker {
    limits: Arc<dyn LimitRepository>,
    membership: Arc<dyn Membership>,
    observer: Arc<dyn UsageObserver>,
}

impl UsageTracker {
    pub fn new(
        limits: Arc<dyn LimitRepository>,
        membership: Arc<dyn Membership>,
        observer: Arc<dyn UsageObserver>,
    ) -> Self {
        Self {
            limits,
            membership,
            observer,
        }
    }

    /// Charge an interaction's tokens to its agent, teams and organization.
    pub async fn record_interaction_usage(&self, interaction: &Interaction) {
        let (input, output) = interaction.token_counts();
        let delta = UsageDelta::new(input, output);
        if delta.is_zero() {
            return;
        }

        let agent_id = interaction.agent_id.as_str();
        let mut targets: Vec<(LimitEntityType, String)> = Vec::new();

        match self.membership.team_ids_for_agent(agent_id).await {
            Ok(team_ids) if team_ids.is_empty() => {
                self.observer.agent_without_team(agent_id, &interaction.id);
                match self.limits.first_entity_id(LimitEntityType::Organization).await {
                    Ok(Some(org_id)) => targets.push((LimitEntityType::Organization, org_id)),
                    Ok(None) => self
                        .observer
                        .organization_unresolved(agent_id, "no organization limit exists"),
                    Err(e) => self
                        .observer
                        .organization_unresolved(agent_id, &e.to_string()),
                }
            }
            Ok(team_ids) => {
                let orgs = join_all(
                    team_ids
                        .iter()
                        .map(|team_id| self.membership.organization_id_for_team(team_id)),
                )
                .await;

                // One organization charge, from the first team that resolves,
                // even when the agent's teams span several organizations.
                let first_org = orgs.into_iter().find_map(|r| match r {
                    Ok(org) => org,
                    Err(e) => {
                        self.observer.membership_lookup_failed(agent_id, &e);
                        None
                    }
                });
                if let Some(org_id) = first_org {
                    targets.push((LimitEntityType::Organization, org_id));
                }

                targets.extend(
                    team_ids
                        .into_iter()
                        .map(|team_id| (LimitEntityType::Team, team_id)),
                );
            }
            Err(e) => self.observer.membership_lookup_failed(agent_id, &e),
        }

        targets.push((LimitEntityType::Agent, agent_id.to_string()));

        tracing::debug!(
            agent_id,
            interaction_id = %interaction.id,
            input_tokens = input,
            output_tokens = output,
            targets = targets.len(),
            "recording interaction usage"
        );

        join_all(
            targets
                .into_iter()
                .map(|(entity_type, entity_id)| self.update_token_limit_usage(entity_type, entity_id, delta)),
        )
        .await;
    }

    /// Add one call to the entity's `mcp_server_calls` rows for `mcp_server_name`.
    pub async fn record_mcp_server_call(
        &self,
        entity_type: LimitEntityType,
        entity_id: &str,
        mcp_server_name: &str,
    ) {
        let selector = UsageSelector::mcp_server_calls(entity_type, entity_id, mcp_server_name);
        self.apply(selector, UsageDelta::single_call()).await;
    }

    /// Add one call to the entity's `tool_calls` rows for the server/tool pair.
    pub async fn record_tool_call(
        &self,
        entity_type: LimitEntityType,
        entity_id: &str,
        mcp_server_name: &str,
        tool_name: &str,
    ) {
        let selector =
            UsageSelector::tool_calls(entity_type, entity_id, mcp_server_name, tool_name);
        self.apply(selector, UsageDelta::single_call()).await;
    }

    /// Every `token_cost` row of the entity gets the same delta, whatever
    /// its model.
    async fn update_token_limit_usage(
        &self,
        entity_type: LimitEntityType,
        entity_id: String,
        delta: UsageDelta,
    ) {
        self.apply(UsageSelector::tokens(entity_type, entity_id), delta)
            .await;
    }

    async fn apply(&self, selector: UsageSelector, delta: UsageDelta) {
        match self.limits.increment_usage(&selector, delta).await {
            Ok(rows) => tracing::trace!(
                entity_type = %selector.entity_type,
                entity_id = %selector.entity_id,
                limit_type = %selector.limit_type,
                rows,
                "limit usage incremented"
            ),
            Err(e) => self.observer.increment_failed(&selector, &e),
        }
    }
}
