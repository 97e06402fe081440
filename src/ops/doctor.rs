//! Workspace diagnostics.
//!
//! An install writes its lock entry only after everything else succeeded,
//! so a crash can leave at most a staging remnant. This scan surfaces
//! those remnants; the lock file itself is by construction consistent.

use std::fs;
use std::path::PathBuf;

use crate::ops::{OpError, Workspace};

/// A leftover staging directory from an interrupted install.
#[derive(Debug, Clone)]
pub struct StagingRemnant {
    pub path: PathBuf,
    /// Best-effort last-modified time, RFC 3339.
    pub modified_at: Option<String>,
}

/// Scan the staging area for incomplete-install markers.
pub fn scan_remnants(workspace: &Workspace) -> Result<Vec<StagingRemnant>, OpError> {
    let staging = workspace.staging_dir();
    if !staging.is_dir() {
        return Ok(Vec::new());
    }

    let mut remnants = Vec::new();
    for entry in fs::read_dir(&staging)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let modified_at = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339());
        remnants.push(StagingRemnant {
            path: entry.path(),
            modified_at,
        });
    }
    remnants.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(remnants)
}

/// Delete all staging remnants. Safe whenever no install is running; the
/// caller holds the workspace lock for that reason.
pub fn clean_remnants(workspace: &Workspace) -> Result<usize, OpError> {
    let remnants = scan_remnants(workspace)?;
    let count = remnants.len();
    for remnant in remnants {
        fs::remove_dir_all(&remnant.path)?;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    #[test]
    fn test_scan_and_clean() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::new(dir.path());
        fs::create_dir_all(workspace.staging_dir().join("install-demo-abc123")).unwrap();

        let remnants = scan_remnants(&workspace).unwrap();
        assert_eq!(remnants.len(), 1);

        let cleaned = clean_remnants(&workspace).unwrap();
        assert_eq!(cleaned, 1);
        assert!(scan_remnants(&workspace).unwrap().is_empty());
    }

    #[test]
    fn test_empty_staging() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::new(dir.path());
        assert!(scan_remnants(&workspace).unwrap().is_empty());
    }
}
