//! Git subprocess driver.
//!
//! Uses the system git binary (like Cargo does) rather than an embedded
//! implementation. Every network command runs under a timeout and retries
//! transient failures with bounded exponential backoff before surfacing a
//! network error.

use std::path::Path;
use std::time::Duration;

use tokio::process::Command;

use crate::core::config::SourceEntry;
use crate::source::SourceError;

/// Per-command timeout.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Network attempts before giving up.
const MAX_ATTEMPTS: u32 = 3;

/// Initial backoff; doubles per retry.
const BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Clone or fetch a source into `cache_dir` and return the HEAD commit.
pub async fn sync_checkout(entry: &SourceEntry, cache_dir: &Path) -> Result<String, SourceError> {
    if cache_dir.join(".git").exists() {
        fetch_with_retry(entry, cache_dir).await?;
        checkout_ref(entry, cache_dir).await?;
    } else {
        clone_with_retry(entry, cache_dir).await?;
        if entry.reference.is_some() {
            checkout_ref(entry, cache_dir).await?;
        }
    }
    rev_parse_head(entry, cache_dir).await
}

async fn clone_with_retry(entry: &SourceEntry, cache_dir: &Path) -> Result<(), SourceError> {
    if let Some(parent) = cache_dir.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    with_retry(entry, || {
        let mut cmd = Command::new("git");
        cmd.arg("clone")
            .arg("--quiet")
            .arg(&entry.url)
            .arg(cache_dir);
        cmd
    })
    .await
}

async fn fetch_with_retry(entry: &SourceEntry, cache_dir: &Path) -> Result<(), SourceError> {
    with_retry(entry, || {
        let mut cmd = Command::new("git");
        cmd.current_dir(cache_dir)
            .arg("fetch")
            .arg("--quiet")
            .arg("--tags")
            .arg("origin");
        cmd
    })
    .await
}

async fn checkout_ref(entry: &SourceEntry, cache_dir: &Path) -> Result<(), SourceError> {
    let target = match &entry.reference {
        Some(r) => r.clone(),
        // No pinned ref: follow the remote default branch.
        None => {
            let output = run_once(entry, {
                let mut cmd = Command::new("git");
                cmd.current_dir(cache_dir)
                    .arg("rev-parse")
                    .arg("--abbrev-ref")
                    .arg("origin/HEAD");
                cmd
            })
            .await?;
            output.trim().trim_start_matches("origin/").to_string()
        }
    };

    // Detach onto the fetched ref so a reused cache never sits on a stale
    // local branch.
    for candidate in [format!("origin/{target}"), target.clone()] {
        let result = run_once(entry, {
            let mut cmd = Command::new("git");
            cmd.current_dir(cache_dir)
                .arg("checkout")
                .arg("--quiet")
                .arg("--detach")
                .arg(&candidate);
            cmd
        })
        .await;
        if result.is_ok() {
            return Ok(());
        }
    }

    Err(SourceError::Git {
        name: entry.name.clone(),
        reason: format!("cannot check out ref '{target}'"),
    })
}

async fn rev_parse_head(entry: &SourceEntry, cache_dir: &Path) -> Result<String, SourceError> {
    let output = run_once(entry, {
        let mut cmd = Command::new("git");
        cmd.current_dir(cache_dir).arg("rev-parse").arg("HEAD");
        cmd
    })
    .await?;
    Ok(output.trim().to_string())
}

/// Run a network command with bounded retry and exponential backoff.
async fn with_retry<F>(entry: &SourceEntry, mut build: F) -> Result<(), SourceError>
where
    F: FnMut() -> Command,
{
    let mut last_reason = String::new();
    for attempt in 0..MAX_ATTEMPTS {
        if attempt > 0 {
            let backoff = BACKOFF_BASE * 2u32.pow(attempt - 1);
            tracing::debug!(source = %entry.name, attempt, "retrying after {backoff:?}");
            tokio::time::sleep(backoff).await;
        }
        match run_once(entry, build()).await {
            Ok(_) => return Ok(()),
            Err(SourceError::Git { reason, .. }) | Err(SourceError::Network { reason, .. }) => {
                last_reason = reason;
            }
            Err(other) => return Err(other),
        }
    }
    Err(SourceError::Network {
        name: entry.name.clone(),
        attempts: MAX_ATTEMPTS,
        reason: last_reason,
    })
}

/// Run one git command under the timeout, capturing stdout.
async fn run_once(entry: &SourceEntry, mut cmd: Command) -> Result<String, SourceError> {
    cmd.kill_on_drop(true);
    let fut = cmd.output();
    let output = match tokio::time::timeout(COMMAND_TIMEOUT, fut).await {
        Ok(result) => result.map_err(|e| SourceError::Git {
            name: entry.name.clone(),
            reason: e.to_string(),
        })?,
        Err(_) => {
            return Err(SourceError::Git {
                name: entry.name.clone(),
                reason: format!("timed out after {COMMAND_TIMEOUT:?}"),
            });
        }
    };

    if !output.status.success() {
        return Err(SourceError::Git {
            name: entry.name.clone(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(url: &str) -> SourceEntry {
        SourceEntry {
            name: "acme/skills".into(),
            url: url.into(),
            reference: None,
            subpath: None,
        }
    }

    #[tokio::test]
    async fn test_unreachable_url_is_network_error() {
        let dir = tempdir().unwrap();
        // file:// URL to a path that does not exist fails fast in git
        // without touching the network.
        let err = sync_checkout(
            &entry("file:///nonexistent/skillet-test-repo"),
            &dir.path().join("cache"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SourceError::Network { attempts: 3, .. }));
    }
}
