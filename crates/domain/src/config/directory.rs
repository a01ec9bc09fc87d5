use serde::{Deserialize, Serialize};

/// Static team directory: which agents belong to which team, and which
/// organization owns each team.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub teams: Vec<TeamEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamEntry {
    pub id: String,
    #[serde(default)]
    pub organization_id: String,
    #[serde(default)]
    pub agents: Vec<String>,
}
