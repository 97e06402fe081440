//! Git sources: cached checkouts of remote artifact repositories.
//!
//! A configured [`SourceEntry`](crate::core::config::SourceEntry) maps to a
//! cached clone under `~/.skillet/sources/<owner>/<repo>`. Refreshing a
//! source clones or fetches it (with bounded retry and a stale-cache
//! fallback); scanning projects its checkout into in-memory
//! [`VirtualPackage`](scan::VirtualPackage)s that install without a
//! pre-built archive.

pub mod git;
pub mod index;
pub mod scan;

pub use index::{ArtifactIndex, IndexReport, ResolvedTarget, build_source_index, resolve_artifact};
pub use scan::VirtualPackage;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::{Config, SourceEntry};
use crate::ui::Reporter;

/// Sidecar file recording the state of a cached checkout.
pub const SOURCE_STATE_FILE: &str = ".skillet-source.json";

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source '{0}' is not configured")]
    NotConfigured(String),

    #[error("Source '{name}' has no cached checkout at {path}; run 'skillet source refresh'")]
    CacheMissing { name: String, path: String },

    #[error("Network error for source '{name}' after {attempts} attempts: {reason}")]
    Network {
        name: String,
        attempts: u32,
        reason: String,
    },

    #[error("git failed for source '{name}': {reason}")]
    Git { name: String, reason: String },
}

/// Persisted state of one cached checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceState {
    /// Full HEAD commit SHA of the checkout.
    pub head_commit: String,
    /// When the cache was last fetched (RFC 3339).
    pub fetched_at: String,
    /// Artifacts discovered at last scan.
    #[serde(default)]
    pub artifact_count: usize,
}

impl SourceState {
    /// Load the sidecar for a cache directory, if present.
    pub fn load(cache_dir: &Path) -> Option<Self> {
        let content = fs::read_to_string(cache_dir.join(SOURCE_STATE_FILE)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Persist the sidecar.
    pub fn save(&self, cache_dir: &Path) -> Result<(), SourceError> {
        let content = serde_json::to_vec_pretty(self).expect("state serialization cannot fail");
        crate::io::atomic_write(&cache_dir.join(SOURCE_STATE_FILE), &content)?;
        Ok(())
    }
}

/// Outcome of refreshing one source.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub source: String,
    pub state: SourceState,
    /// True when the network failed and the cached checkout was used
    /// instead.
    pub stale: bool,
}

/// Refresh one source: clone if the cache is missing, fetch otherwise.
///
/// Transient network failures retry with bounded exponential backoff; when
/// retries are exhausted and a cached checkout exists, the cache is used
/// with an explicit staleness warning rather than failing the operation.
pub async fn refresh_source(
    entry: &SourceEntry,
    home: &Path,
    reporter: &dyn Reporter,
) -> Result<RefreshOutcome, SourceError> {
    let cache_dir = entry.cache_dir(home);

    let fetch_result = git::sync_checkout(entry, &cache_dir).await;
    match fetch_result {
        Ok(head_commit) => {
            let state = SourceState {
                head_commit,
                fetched_at: chrono::Utc::now().to_rfc3339(),
                artifact_count: scan::scan_source(entry, home).map(|a| a.len()).unwrap_or(0),
            };
            state.save(&cache_dir)?;
            Ok(RefreshOutcome {
                source: entry.name.clone(),
                state,
                stale: false,
            })
        }
        Err(err) => {
            if let Some(state) = SourceState::load(&cache_dir) {
                reporter.warning(&format!(
                    "source '{}' unreachable ({err}); using cached checkout from {}",
                    entry.name, state.fetched_at
                ));
                Ok(RefreshOutcome {
                    source: entry.name.clone(),
                    state,
                    stale: true,
                })
            } else {
                Err(err)
            }
        }
    }
}

/// Refresh every configured source concurrently.
///
/// Failures are collected per source; one unreachable source never aborts
/// the others.
pub async fn refresh_all(
    config: &Config,
    reporter: &(dyn Reporter),
) -> Vec<Result<RefreshOutcome, SourceError>> {
    let mut set = tokio::task::JoinSet::new();
    for entry in config.sources.clone() {
        let home = config.home.clone();
        set.spawn(async move {
            // Reporter handles land on the caller; the task reports through
            // the outcome instead.
            let silent = crate::ui::SilentReporter;
            refresh_source(&entry, &home, &silent).await
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(result) => {
                if let Ok(outcome) = &result {
                    if outcome.stale {
                        reporter.warning(&format!(
                            "source '{}' unreachable; using cached checkout from {}",
                            outcome.source, outcome.state.fetched_at
                        ));
                    }
                }
                outcomes.push(result);
            }
            Err(join_err) => outcomes.push(Err(SourceError::Git {
                name: "(task)".into(),
                reason: join_err.to_string(),
            })),
        }
    }
    outcomes
}

/// Read the HEAD commit of a cached checkout without running git.
///
/// Prefers the sidecar state; falls back to parsing `.git/HEAD` and the ref
/// file it points at. Only text files are read.
pub fn read_head_commit(cache_dir: &Path) -> Option<String> {
    if let Some(state) = SourceState::load(cache_dir) {
        return Some(state.head_commit);
    }

    let head = fs::read_to_string(cache_dir.join(".git/HEAD")).ok()?;
    let head = head.trim();
    if let Some(reference) = head.strip_prefix("ref: ") {
        let direct = cache_dir.join(".git").join(reference);
        if let Ok(commit) = fs::read_to_string(direct) {
            return Some(commit.trim().to_string());
        }
        // The ref may live in packed-refs.
        let packed = fs::read_to_string(cache_dir.join(".git/packed-refs")).ok()?;
        for line in packed.lines() {
            if let Some((sha, name)) = line.split_once(' ') {
                if name.trim() == reference {
                    return Some(sha.to_string());
                }
            }
        }
        None
    } else {
        // Detached HEAD: the file holds the commit itself.
        Some(head.to_string())
    }
}
