pub mod config;
pub mod limits;

use clap::{Parser, Subcommand};

use ll_domain::limit::{LimitEntityType, LimitType};

/// LimitLedger: usage accounting against organization, team and agent limits.
#[derive(Debug, Parser)]
#[command(name = "limitledger", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Inspect stored limits.
    #[command(subcommand)]
    Limits(LimitsCommand),
    /// Print the aggregated token usage of one agent.
    Usage {
        /// Agent whose interactions are summed.
        agent_id: String,
    },
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

#[derive(Debug, Subcommand)]
pub enum LimitsCommand {
    /// List limits, optionally filtered.
    List {
        /// organization, team or agent.
        #[arg(long)]
        entity_type: Option<LimitEntityType>,
        #[arg(long)]
        entity_id: Option<String>,
        /// token_cost, mcp_server_calls or tool_calls.
        #[arg(long)]
        limit_type: Option<LimitType>,
    },
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `LL_CONFIG` (or
/// `config.toml` by default).  Returns the parsed [`Config`] and the
/// path that was used.
///
/// [`Config`]: ll_domain::config::Config
pub fn load_config() -> anyhow::Result<(ll_domain::config::Config, String)> {
    let config_path = std::env::var("LL_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        ll_domain::config::Config::default()
    };

    Ok((config, config_path))
}
