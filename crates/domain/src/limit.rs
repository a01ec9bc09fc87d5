//! Limit records and the request/selector types that operate on them.
//!
//! A [`Limit`] bounds one kind of usage for one entity (organization, team or
//! agent).  Counters are overloaded by kind: token counts for `token_cost`,
//! a call count in `current_usage_tokens_in` for the call-metering kinds.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Enums
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The subject a limit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitEntityType {
    Organization,
    Team,
    Agent,
}

impl LimitEntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Team => "team",
            Self::Agent => "agent",
        }
    }
}

impl fmt::Display for LimitEntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LimitEntityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "organization" => Ok(Self::Organization),
            "team" => Ok(Self::Team),
            "agent" => Ok(Self::Agent),
            other => Err(Error::Validation(format!("unknown entity type '{other}'"))),
        }
    }
}

/// What a limit meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitType {
    TokenCost,
    McpServerCalls,
    ToolCalls,
}

impl LimitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TokenCost => "token_cost",
            Self::McpServerCalls => "mcp_server_calls",
            Self::ToolCalls => "tool_calls",
        }
    }
}

impl Default for LimitType {
    fn default() -> Self {
        Self::TokenCost
    }
}

impl fmt::Display for LimitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LimitType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "token_cost" => Ok(Self::TokenCost),
            "mcp_server_calls" => Ok(Self::McpServerCalls),
            "tool_calls" => Ok(Self::ToolCalls),
            other => Err(Error::Validation(format!("unknown limit type '{other}'"))),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Limit
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A quota record.
///
/// No uniqueness is enforced over `(entity_type, entity_id, limit_type,
/// qualifiers)`; several rows may describe the same scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Limit {
    pub id: Uuid,
    pub entity_type: LimitEntityType,
    /// Reference to an entity owned elsewhere.
    pub entity_id: String,
    pub limit_type: LimitType,
    pub limit_value: u64,
    /// Required for `token_cost`.
    #[serde(default)]
    pub model: Option<String>,
    /// Required for `mcp_server_calls` and `tool_calls`.
    #[serde(default)]
    pub mcp_server_name: Option<String>,
    /// Required for `tool_calls`.
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub current_usage_tokens_in: u64,
    #[serde(default)]
    pub current_usage_tokens_out: u64,
    #[serde(default)]
    pub last_cleanup: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Limit {
    /// Multi-line, human-readable description of the row.
    pub fn summary(&self) -> String {
        let mut out = format!("**Limit ID:** {}", self.id);
        out.push_str(&format!("\n  Entity Type: {}", self.entity_type));
        out.push_str(&format!("\n  Entity ID: {}", self.entity_id));
        out.push_str(&format!("\n  Limit Type: {}", self.limit_type));
        out.push_str(&format!("\n  Limit Value: {}", self.limit_value));
        out.push_str(&format!(
            "\n  Current Usage (In): {}",
            self.current_usage_tokens_in
        ));
        out.push_str(&format!(
            "\n  Current Usage (Out): {}",
            self.current_usage_tokens_out
        ));
        if let Some(model) = &self.model {
            out.push_str(&format!("\n  Model: {model}"));
        }
        if let Some(server) = &self.mcp_server_name {
            out.push_str(&format!("\n  MCP Server: {server}"));
        }
        if let Some(tool) = &self.tool_name {
            out.push_str(&format!("\n  Tool: {tool}"));
        }
        if let Some(at) = &self.last_cleanup {
            out.push_str(&format!("\n  Last Cleanup: {}", at.to_rfc3339()));
        }
        out
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Create / patch payloads
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Payload for creating a limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLimit {
    pub entity_type: LimitEntityType,
    pub entity_id: String,
    pub limit_type: LimitType,
    pub limit_value: u64,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub mcp_server_name: Option<String>,
    #[serde(default)]
    pub tool_name: Option<String>,
}

impl NewLimit {
    /// Check the kind-specific qualifier requirements.
    ///
    /// Stores accept any payload; callers at the boundary run this first.
    pub fn validate(&self) -> Result<()> {
        if self.entity_id.trim().is_empty() {
            return Err(Error::Validation("entity_id must not be empty".into()));
        }

        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

        match self.limit_type {
            LimitType::TokenCost if !present(&self.model) => Err(Error::Validation(
                "model is required for token_cost limits".into(),
            )),
            LimitType::McpServerCalls if !present(&self.mcp_server_name) => {
                Err(Error::Validation(
                    "mcp_server_name is required for mcp_server_calls limits".into(),
                ))
            }
            LimitType::ToolCalls
                if !present(&self.mcp_server_name) || !present(&self.tool_name) =>
            {
                Err(Error::Validation(
                    "mcp_server_name and tool_name are required for tool_calls limits".into(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Materialize a fresh row with zeroed counters.
    pub fn into_limit(self, now: DateTime<Utc>) -> Limit {
        Limit {
            id: Uuid::new_v4(),
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            limit_type: self.limit_type,
            limit_value: self.limit_value,
            model: self.model,
            mcp_server_name: self.mcp_server_name,
            tool_name: self.tool_name,
            current_usage_tokens_in: 0,
            current_usage_tokens_out: 0,
            last_cleanup: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update. Only provided fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitPatch {
    #[serde(default)]
    pub entity_type: Option<LimitEntityType>,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub limit_type: Option<LimitType>,
    #[serde(default)]
    pub limit_value: Option<u64>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub mcp_server_name: Option<String>,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub current_usage_tokens_in: Option<u64>,
    #[serde(default)]
    pub current_usage_tokens_out: Option<u64>,
}

impl LimitPatch {
    pub fn apply(self, limit: &mut Limit, now: DateTime<Utc>) {
        if let Some(v) = self.entity_type {
            limit.entity_type = v;
        }
        if let Some(v) = self.entity_id {
            limit.entity_id = v;
        }
        if let Some(v) = self.limit_type {
            limit.limit_type = v;
        }
        if let Some(v) = self.limit_value {
            limit.limit_value = v;
        }
        if let Some(v) = self.model {
            limit.model = Some(v);
        }
        if let Some(v) = self.mcp_server_name {
            limit.mcp_server_name = Some(v);
        }
        if let Some(v) = self.tool_name {
            limit.tool_name = Some(v);
        }
        if let Some(v) = self.current_usage_tokens_in {
            limit.current_usage_tokens_in = v;
        }
        if let Some(v) = self.current_usage_tokens_out {
            limit.current_usage_tokens_out = v;
        }
        limit.updated_at = now;
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Filters & selectors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Conjunctive listing filter; `None` fields are unconstrained.
///
/// Blank values (`?entity_id=`) deserialize as `None`, and a blank
/// `entity_id` set in code is unconstrained too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LimitFilter {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub entity_type: Option<LimitEntityType>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub entity_id: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub limit_type: Option<LimitType>,
}

impl LimitFilter {
    pub fn matches(&self, limit: &Limit) -> bool {
        self.entity_type.map_or(true, |t| limit.entity_type == t)
            && self
                .entity_id
                .as_deref()
                .filter(|id| !id.trim().is_empty())
                .map_or(true, |id| limit.entity_id == id)
            && self.limit_type.map_or(true, |t| limit.limit_type == t)
    }
}

fn blank_as_none<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Row predicate for usage increments.
///
/// Qualifiers left as `None` are not compared, so a token selector hits every
/// `token_cost` row of the entity regardless of its model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageSelector {
    pub entity_type: LimitEntityType,
    pub entity_id: String,
    pub limit_type: LimitType,
    pub mcp_server_name: Option<String>,
    pub tool_name: Option<String>,
}

impl UsageSelector {
    pub fn tokens(entity_type: LimitEntityType, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
            limit_type: LimitType::TokenCost,
            mcp_server_name: None,
            tool_name: None,
        }
    }

    pub fn mcp_server_calls(
        entity_type: LimitEntityType,
        entity_id: impl Into<String>,
        mcp_server_name: impl Into<String>,
    ) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
            limit_type: LimitType::McpServerCalls,
            mcp_server_name: Some(mcp_server_name.into()),
            tool_name: None,
        }
    }

    pub fn tool_calls(
        entity_type: LimitEntityType,
        entity_id: impl Into<String>,
        mcp_server_name: impl Into<String>,
        tool_name: impl Into<String>,
    ) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
            limit_type: LimitType::ToolCalls,
            mcp_server_name: Some(mcp_server_name.into()),
            tool_name: Some(tool_name.into()),
        }
    }

    pub fn matches(&self, limit: &Limit) -> bool {
        limit.entity_type == self.entity_type
            && limit.entity_id == self.entity_id
            && limit.limit_type == self.limit_type
            && self
                .mcp_server_name
                .as_deref()
                .map_or(true, |s| limit.mcp_server_name.as_deref() == Some(s))
            && self
                .tool_name
                .as_deref()
                .map_or(true, |t| limit.tool_name.as_deref() == Some(t))
    }
}

/// Amount added to a row's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageDelta {
    pub tokens_in: u64,
    pub tokens_out: u64,
}

impl UsageDelta {
    pub fn new(tokens_in: u64, tokens_out: u64) -> Self {
        Self {
            tokens_in,
            tokens_out,
        }
    }

    /// One call, counted in the `in` column.
    pub fn single_call() -> Self {
        Self::new(1, 0)
    }

    pub fn is_zero(&self) -> bool {
        self.tokens_in == 0 && self.tokens_out == 0
    }

    pub fn apply(&self, limit: &mut Limit, now: DateTime<Utc>) {
        limit.current_usage_tokens_in = limit.current_usage_tokens_in.saturating_add(self.tokens_in);
        limit.current_usage_tokens_out =
            limit.current_usage_tokens_out.saturating_add(self.tokens_out);
        limit.updated_at = now;
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
