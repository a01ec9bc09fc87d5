//! Offline inspection of the stores under `storage.state_path`.

use anyhow::Context;

use ll_domain::config::Config;
use ll_domain::limit::LimitFilter;
use ll_limits::{InteractionLog, LimitRepository, LimitStore};

/// Print the summary block of every matching limit.
pub async fn list(config: &Config, filter: LimitFilter) -> anyhow::Result<()> {
    let path = &config.storage.state_path;
    let store = LimitStore::open(path)
        .with_context(|| format!("opening limit store in {}", path.display()))?;

    let limits = store.list(&filter).await?;
    if limits.is_empty() {
        println!("No limits found.");
        return Ok(());
    }

    let blocks: Vec<String> = limits.iter().map(|l| l.summary()).collect();
    println!("{}", blocks.join("\n\n"));
    println!("\n{} limit(s)", limits.len());
    Ok(())
}

/// Print an agent's total token usage as JSON.
pub async fn usage(config: &Config, agent_id: &str) -> anyhow::Result<()> {
    let path = &config.storage.state_path;
    let log = InteractionLog::open(path)
        .with_context(|| format!("opening interaction log in {}", path.display()))?;

    let usage = log.token_usage(agent_id).await;
    println!("{}", serde_json::to_string_pretty(&usage)?);
    Ok(())
}
