//! The append-only record of agent interactions.
//!
//! Token totals read from here are computed from the log itself, not from
//! limit counters, so the two can drift (manual edits, dropped fallbacks).
//! On disk the log is `interactions.jsonl`, one interaction per line.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::sync::RwLock;

use ll_domain::error::{Error, Result};
use ll_domain::interaction::{Interaction, NewInteraction, TokenUsage};

const INTERACTIONS_FILE: &str = "interactions.jsonl";

pub struct InteractionLog {
    /// Held for writing across the append, so file order matches memory order.
    entries: RwLock<Vec<Interaction>>,
    persist_path: Option<PathBuf>,
}

impl InteractionLog {
    pub fn open(state_path: &Path) -> Result<Self> {
        let persist_path = state_path.join(INTERACTIONS_FILE);
        let entries = read_jsonl_file(&persist_path)?;
        tracing::info!(count = entries.len(), "loaded interactions from disk");
        Ok(Self {
            entries: RwLock::new(entries),
            persist_path: Some(persist_path),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            persist_path: None,
        }
    }

    /// Append an interaction.  It becomes visible only once it is on disk.
    pub async fn record(&self, new: NewInteraction) -> Result<Interaction> {
        let interaction = new.into_interaction(Utc::now());
        let mut entries = self.entries.write().await;

        if let Some(path) = self.persist_path.clone() {
            let mut line = serde_json::to_string(&interaction)?;
            line.push('\n');
            // Write to disk first; only update memory if I/O succeeds.
            tokio::task::spawn_blocking(move || append_line(&path, &line))
                .await
                .map_err(|e| Error::Storage(format!("append task failed: {e}")))??;
        }

        entries.push(interaction.clone());
        Ok(interaction)
    }

    pub async fn for_agent(&self, agent_id: &str) -> Vec<Interaction> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|i| i.agent_id == agent_id)
            .cloned()
            .collect()
    }

    /// Sum of all of the agent's interactions; zero when it has none.
    pub async fn token_usage(&self, agent_id: &str) -> TokenUsage {
        let mut usage = TokenUsage::empty(agent_id);
        for interaction in self.entries.read().await.iter() {
            if interaction.agent_id == agent_id {
                let (input, output) = interaction.token_counts();
                usage.add(input, output);
            }
        }
        usage
    }

    /// Distinct models referenced by any interaction.
    pub async fn models(&self) -> BTreeSet<String> {
        self.entries
            .read()
            .await
            .iter()
            .filter_map(|i| i.model.clone())
            .collect()
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

/// Malformed lines (a torn final append) are skipped with a warning.
fn read_jsonl_file(path: &Path) -> Result<Vec<Interaction>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut entries = Vec::new();
    for (n, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Interaction>(line) {
            Ok(i) => entries.push(i),
            Err(e) => tracing::warn!(line = n + 1, error = %e, "skipping malformed interaction line"),
        }
    }
    Ok(entries)
}
