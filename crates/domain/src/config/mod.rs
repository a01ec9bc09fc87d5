mod directory;
mod limits;
mod observability;
mod pricing;
mod server;
mod storage;

pub use directory::*;
pub use limits::*;
pub use observability::*;
pub use pricing::*;
pub use server::*;
pub use storage::*;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut push = |severity, field: String, message: &str| {
            errors.push(ConfigError {
                severity,
                field,
                message: message.into(),
            })
        };

        if self.server.port == 0 {
            push(
                ConfigSeverity::Error,
                "server.port".into(),
                "port must be greater than 0",
            );
        }

        if self.server.host.is_empty() {
            push(
                ConfigSeverity::Error,
                "server.host".into(),
                "host must not be empty",
            );
        }

        if self.server.max_concurrent_requests == 0 {
            push(
                ConfigSeverity::Error,
                "server.max_concurrent_requests".into(),
                "must be greater than 0",
            );
        }

        if self.storage.state_path.as_os_str().is_empty() {
            push(
                ConfigSeverity::Error,
                "storage.state_path".into(),
                "state_path must not be empty",
            );
        }

        let mut seen = HashSet::new();
        for (i, team) in self.directory.teams.iter().enumerate() {
            if team.id.is_empty() {
                push(
                    ConfigSeverity::Error,
                    format!("directory.teams[{i}].id"),
                    "team id must not be empty",
                );
            } else if !seen.insert(team.id.as_str()) {
                push(
                    ConfigSeverity::Error,
                    format!("directory.teams[{i}].id"),
                    "duplicate team id",
                );
            }
            if team.organization_id.is_empty() {
                push(
                    ConfigSeverity::Warning,
                    format!("directory.teams[{i}].organization_id"),
                    "team has no organization; organization limits will not be charged through it",
                );
            }
        }

        if self.pricing.default_input_per_million < 0.0
            || self.pricing.default_output_per_million < 0.0
        {
            push(
                ConfigSeverity::Error,
                "pricing".into(),
                "default prices must not be negative",
            );
        }
        for (name, price) in &self.pricing.models {
            if price.input_per_million < 0.0 || price.output_per_million < 0.0 {
                push(
                    ConfigSeverity::Error,
                    format!("pricing.models.{name}"),
                    "prices must not be negative",
                );
            }
        }

        if !(0.0..=1.0).contains(&self.observability.sample_rate) {
            push(
                ConfigSeverity::Error,
                "observability.sample_rate".into(),
                "sample_rate must be between 0.0 and 1.0",
            );
        }

        // CORS: warn if wildcard is used.
        if self.server.cors.allowed_origins.len() == 1
            && self.server.cors.allowed_origins[0] == "*"
        {
            push(
                ConfigSeverity::Warning,
                "server.cors.allowed_origins".into(),
                "wildcard \"*\" allows all origins (not recommended for production)",
            );
        }

        errors
    }
}
