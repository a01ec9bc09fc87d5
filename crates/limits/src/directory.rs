//! Team membership lookups used by the usage tracker.

use std::collections::HashMap;

use async_trait::async_trait;

use ll_domain::config::DirectoryConfig;
use ll_domain::error::Result;

/// Resolves an agent's place in the organization → team → agent hierarchy.
#[async_trait]
pub trait Membership: Send + Sync {
    /// Team ids the agent belongs to, in membership order.
    async fn team_ids_for_agent(&self, agent_id: &str) -> Result<Vec<String>>;

    /// Owning organization of a team; `None` when the team is unknown or
    /// has no organization.
    async fn organization_id_for_team(&self, team_id: &str) -> Result<Option<String>>;
}

/// Directory built once from `[[directory.teams]]`.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    teams_by_agent: HashMap<String, Vec<String>>,
    organization_by_team: HashMap<String, String>,
}

impl StaticDirectory {
    pub fn from_config(config: &DirectoryConfig) -> Self {
        let mut dir = Self::default();
        for team in &config.teams {
            if !team.organization_id.is_empty() {
                dir.organization_by_team
                    .insert(team.id.clone(), team.organization_id.clone());
            }
            for agent in &team.agents {
                let teams = dir.teams_by_agent.entry(agent.clone()).or_default();
                if !teams.contains(&team.id) {
                    teams.push(team.id.clone());
                }
            }
        }
        tracing::debug!(
            teams = config.teams.len(),
            agents = dir.teams_by_agent.len(),
            "team directory loaded"
        );
        dir
    }
}

#[async_trait]
impl Membership for StaticDirectory {
    async fn team_ids_for_agent(&self, agent_id: &str) -> Result<Vec<String>> {
        Ok(self.teams_by_agent.get(agent_id).cloned().unwrap_or_default())
    }

    async fn organization_id_for_team(&self, team_id: &str) -> Result<Option<String>> {
        Ok(self.organization_by_team.get(team_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ll_domain::config::TeamEntry;

    fn team(id: &str, org: &str, agents: &[&str]) -> TeamEntry {
        TeamEntry {
            id: id.into(),
            organization_id: org.into(),
            agents: agents.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn membership_follows_config_order() {
        let dir = StaticDirectory::from_config(&DirectoryConfig {
            teams: vec![
                team("t2", "org-x", &["a1"]),
                team("t1", "org-y", &["a1", "a2"]),
                team("t3", "", &["a2"]),
            ],
        });

        assert_eq!(dir.team_ids_for_agent("a1").await.unwrap(), vec!["t2", "t1"]);
        assert_eq!(dir.team_ids_for_agent("a2").await.unwrap(), vec!["t1", "t3"]);
        assert!(dir.team_ids_for_agent("nobody").await.unwrap().is_empty());

        assert_eq!(
            dir.organization_id_for_team("t1").await.unwrap().as_deref(),
            Some("org-y")
        );
        assert!(dir.organization_id_for_team("t3").await.unwrap().is_none());
    }
}
