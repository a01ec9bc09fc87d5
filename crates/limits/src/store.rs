//! Limit rows kept in memory and persisted as JSON.
//!
//! [`LimitRepository`] is the persistence seam the tracker, the cleanup
//! policy and the HTTP layer talk to.  [`LimitStore`] is the bundled
//! implementation: a map guarded by a Tokio `RwLock`, written out to
//! `limits.json` after every mutation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use ll_domain::error::{Error, Result};
use ll_domain::limit::{
    Limit, LimitEntityType, LimitFilter, LimitPatch, LimitType, NewLimit, UsageDelta,
    UsageSelector,
};

const LIMITS_FILE: &str = "limits.json";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Repository trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Row-level access to limit records.
///
/// Not-found is reported through `Option`/`bool`; `Err` means the backing
/// storage failed.  No operation validates kind-specific qualifiers.
#[async_trait]
pub trait LimitRepository: Send + Sync {
    async fn create(&self, new: NewLimit) -> Result<Limit>;

    /// All rows matching every provided filter field, oldest first.
    async fn list(&self, filter: &LimitFilter) -> Result<Vec<Limit>>;

    async fn get(&self, id: &Uuid) -> Result<Option<Limit>>;

    async fn patch(&self, id: &Uuid, patch: LimitPatch) -> Result<Option<Limit>>;

    /// Returns whether the row existed.
    async fn delete(&self, id: &Uuid) -> Result<bool>;

    /// Add `delta` to every row matched by `selector` and refresh its
    /// `updated_at`.  Returns the number of rows touched.
    async fn increment_usage(&self, selector: &UsageSelector, delta: UsageDelta)
        -> Result<usize>;

    /// Entity id of the oldest row with the given entity type, if any.
    async fn first_entity_id(&self, entity_type: LimitEntityType) -> Result<Option<String>>;

    /// Organization-scoped rows never cleaned, or last cleaned before `cutoff`.
    async fn find_limits_needing_cleanup(
        &self,
        organization_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Limit>>;

    /// Zero both counters and stamp `last_cleanup`/`updated_at` with now.
    async fn reset_usage(&self, id: &Uuid) -> Result<Option<Limit>>;

    /// Rows an enforcement layer compares against `limit_value`.
    async fn find_limits_for_validation(
        &self,
        entity_type: LimitEntityType,
        entity_id: &str,
        limit_type: LimitType,
    ) -> Result<Vec<Limit>> {
        self.list(&LimitFilter {
            entity_type: Some(entity_type),
            entity_id: Some(entity_id.to_string()),
            limit_type: Some(limit_type),
        })
        .await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LimitStore
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct LimitStore {
    /// Writers hold this for the whole mutate-and-persist cycle, so the
    /// file always ends on the newest committed state.
    inner: RwLock<HashMap<Uuid, Limit>>,
    /// `None` keeps everything in memory.
    persist_path: Option<PathBuf>,
}

impl LimitStore {
    /// Open the store under `state_path`, loading `limits.json` when present.
    pub fn open(state_path: &Path) -> Result<Self> {
        let persist_path = state_path.join(LIMITS_FILE);
        let map = load_rows(&persist_path)?;
        tracing::info!(count = map.len(), path = %persist_path.display(), "loaded limits from disk");
        Ok(Self {
            inner: RwLock::new(map),
            persist_path: Some(persist_path),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            persist_path: None,
        }
    }

    /// Apply `change` to a copy of the rows and commit the copy only once it
    /// is on disk.  `change` returns its output and whether anything changed;
    /// an unchanged copy is neither written nor committed.
    async fn mutate<T, F>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut HashMap<Uuid, Limit>) -> (T, bool),
    {
        let mut map = self.inner.write().await;
        let Some(path) = self.persist_path.clone() else {
            let (out, _) = change(&mut *map);
            return Ok(out);
        };

        let mut candidate = map.clone();
        let (out, changed) = change(&mut candidate);
        if !changed {
            return Ok(out);
        }

        let json = serde_json::to_string_pretty(&sorted(candidate.values().cloned().collect()))?;
        // Spawn blocking to avoid blocking the Tokio executor.
        tokio::task::spawn_blocking(move || write_atomic(&path, json.as_bytes()))
            .await
            .map_err(|e| Error::Storage(format!("persist task failed: {e}")))??;

        *map = candidate;
        Ok(out)
    }
}

#[async_trait]
impl LimitRepository for LimitStore {
    async fn create(&self, new: NewLimit) -> Result<Limit> {
        let limit = new.into_limit(Utc::now());
        let row = limit.clone();
        self.mutate(move |map| {
            map.insert(row.id, row);
            ((), true)
        })
        .await?;
        tracing::debug!(
            limit_id = %limit.id,
            entity_type = %limit.entity_type,
            entity_id = %limit.entity_id,
            limit_type = %limit.limit_type,
            "limit created"
        );
        Ok(limit)
    }

    async fn list(&self, filter: &LimitFilter) -> Result<Vec<Limit>> {
        let rows = self
            .inner
            .read()
            .await
            .values()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect();
        Ok(sorted(rows))
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Limit>> {
        Ok(self.inner.read().await.get(id).cloned())
    }

    async fn patch(&self, id: &Uuid, patch: LimitPatch) -> Result<Option<Limit>> {
        let now = Utc::now();
        self.mutate(move |map| match map.get_mut(id) {
            Some(limit) => {
                patch.apply(limit, now);
                (Some(limit.clone()), true)
            }
            None => (None, false),
        })
        .await
    }

    async fn delete(&self, id: &Uuid) -> Result<bool> {
        self.mutate(|map| {
            let removed = map.remove(id).is_some();
            (removed, removed)
        })
        .await
    }

    async fn increment_usage(
        &self,
        selector: &UsageSelector,
        delta: UsageDelta,
    ) -> Result<usize> {
        let now = Utc::now();
        self.mutate(|map| {
            let mut touched = 0;
            for limit in map.values_mut().filter(|l| selector.matches(l)) {
                delta.apply(limit, now);
                touched += 1;
            }
            (touched, touched > 0)
        })
        .await
    }

    async fn first_entity_id(&self, entity_type: LimitEntityType) -> Result<Option<String>> {
        Ok(self
            .inner
            .read()
            .await
            .values()
            .filter(|l| l.entity_type == entity_type)
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            .map(|l| l.entity_id.clone()))
    }

    async fn find_limits_needing_cleanup(
        &self,
        organization_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Limit>> {
        let rows = self
            .inner
            .read()
            .await
            .values()
            .filter(|l| {
                l.entity_type == LimitEntityType::Organization
                    && l.entity_id == organization_id
                    && l.last_cleanup.map_or(true, |at| at < cutoff)
            })
            .cloned()
            .collect();
        Ok(sorted(rows))
    }

    async fn reset_usage(&self, id: &Uuid) -> Result<Option<Limit>> {
        let now = Utc::now();
        self.mutate(move |map| match map.get_mut(id) {
            Some(limit) => {
                limit.current_usage_tokens_in = 0;
                limit.current_usage_tokens_out = 0;
                limit.last_cleanup = Some(now);
                limit.updated_at = now;
                (Some(limit.clone()), true)
            }
            None => (None, false),
        })
        .await
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn sorted(mut rows: Vec<Limit>) -> Vec<Limit> {
    rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    rows
}

fn load_rows(path: &Path) -> Result<HashMap<Uuid, Limit>> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => return Err(e.into()),
    };
    let rows: Vec<Limit> = serde_json::from_str(&data)?;
    Ok(rows.into_iter().map(|l| (l.id, l)).collect())
}

/// Write via a sibling temp file and rename, so readers never see a torn file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
