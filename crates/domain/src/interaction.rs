use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One recorded unit of agent work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub agent_id: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
    pub created_at: DateTime<Utc>,
}

impl Interaction {
    /// `(input, output)` with absent counts treated as zero.
    pub fn token_counts(&self) -> (u64, u64) {
        (
            self.input_tokens.unwrap_or(0),
            self.output_tokens.unwrap_or(0),
        )
    }
}

/// Payload for recording an interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInteraction {
    pub agent_id: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
}

impl NewInteraction {
    pub fn into_interaction(self, now: DateTime<Utc>) -> Interaction {
        Interaction {
            id: Uuid::new_v4(),
            agent_id: self.agent_id,
            model: self.model,
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            created_at: now,
        }
    }
}

/// Lifetime token totals for one agent, summed from its interactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub agent_id: String,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn empty(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            total_input_tokens: 0,
            total_output_tokens: 0,
            total_tokens: 0,
        }
    }

    pub fn add(&mut self, input: u64, output: u64) {
        self.total_input_tokens = self.total_input_tokens.saturating_add(input);
        self.total_output_tokens = self.total_output_tokens.saturating_add(output);
        self.total_tokens = self.total_input_tokens.saturating_add(self.total_output_tokens);
    }
}
