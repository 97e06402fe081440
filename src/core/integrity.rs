//! Integrity checks against the lock file's per-file checksums.
//!
//! `verify` recomputes SHA-256 over the installed tree and classifies every
//! file; `diff` renders content diffs against the pristine copy retained at
//! install time; `backup` snapshots files before an upgrade overwrites them.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::lockfile::LockedPackage;
use crate::io::hashing;

#[derive(Error, Debug)]
pub enum IntegrityError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Package directory missing: {0}")]
    PackageDirMissing(String),
}

/// Classification of one tracked or discovered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// Content matches the recorded checksum.
    Ok,
    /// Content differs from the recorded checksum.
    Modified,
    /// Recorded in the lock file but absent from disk.
    Missing,
    /// On disk but absent from the checksum map.
    Untracked,
}

/// Result of verifying one package.
#[derive(Debug, Clone)]
pub struct VerifyResult {
    pub package: String,
    /// False when the lock entry has no `FileChecksums`; the lists below
    /// are then empty and nothing can be said about drift.
    pub has_integrity_data: bool,
    pub ok: Vec<String>,
    pub modified: Vec<String>,
    pub missing: Vec<String>,
    pub untracked: Vec<String>,
}

impl VerifyResult {
    /// True when integrity data exists and nothing drifted.
    pub fn is_clean(&self) -> bool {
        self.has_integrity_data
            && self.modified.is_empty()
            && self.missing.is_empty()
            && self.untracked.is_empty()
    }

    fn no_data(package: &str) -> Self {
        Self {
            package: package.to_string(),
            has_integrity_data: false,
            ok: Vec::new(),
            modified: Vec::new(),
            missing: Vec::new(),
            untracked: Vec::new(),
        }
    }
}

/// Recompute checksums for every recorded file of `locked` under
/// `package_dir` and classify each path.
pub fn verify(
    package: &str,
    package_dir: &Path,
    locked: &LockedPackage,
) -> Result<VerifyResult, IntegrityError> {
    let Some(checksums) = &locked.files else {
        return Ok(VerifyResult::no_data(package));
    };

    let mut result = VerifyResult {
        package: package.to_string(),
        has_integrity_data: true,
        ok: Vec::new(),
        modified: Vec::new(),
        missing: Vec::new(),
        untracked: Vec::new(),
    };

    for (relative, expected) in &checksums.files {
        let path = package_dir.join(relative);
        if !path.exists() {
            result.missing.push(relative.clone());
            continue;
        }
        let actual = hashing::sha256_file(&path)?;
        if actual.as_str() == expected {
            result.ok.push(relative.clone());
        } else {
            result.modified.push(relative.clone());
        }
    }

    // Files on disk the map never recorded.
    if package_dir.exists() {
        let tracked: BTreeSet<&String> = checksums.files.keys().collect();
        for (relative, _) in hashing::hash_tree(package_dir)? {
            if !tracked.contains(&relative) {
                result.untracked.push(relative);
            }
        }
    }

    Ok(result)
}

/// The change recorded for one file in a [`DiffResult`].
#[derive(Debug, Clone)]
pub enum DiffChange {
    /// Content changed; `patch` is a unified diff against the retained
    /// pristine copy, or None when that copy is no longer available.
    Modified { patch: Option<String> },
    /// Recorded but absent from disk.
    Missing,
    /// Present on disk but untracked.
    Untracked,
}

/// One file's entry in a diff report.
#[derive(Debug, Clone)]
pub struct DiffEntry {
    pub path: String,
    pub change: DiffChange,
}

/// Diff report for one package.
#[derive(Debug, Clone)]
pub struct DiffResult {
    pub package: String,
    pub has_integrity_data: bool,
    pub entries: Vec<DiffEntry>,
}

impl DiffResult {
    /// True when there is nothing to report.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Produce content diffs for every drifted file.
///
/// `retained_dir` is the pristine copy the installer keeps for exactly this
/// purpose. If it has been evicted, modified files degrade to "no diff
/// available" rather than erroring.
pub fn diff(
    package: &str,
    package_dir: &Path,
    retained_dir: Option<&Path>,
    locked: &LockedPackage,
) -> Result<DiffResult, IntegrityError> {
    let verified = verify(package, package_dir, locked)?;
    let mut entries = Vec::new();

    for path in &verified.modified {
        let patch = retained_dir.and_then(|retained| {
            let original = fs::read_to_string(retained.join(path)).ok()?;
            let current = fs::read_to_string(package_dir.join(path)).ok()?;
            let patch = diffy::create_patch(&original, &current);
            Some(patch.to_string())
        });
        entries.push(DiffEntry {
            path: path.clone(),
            change: DiffChange::Modified { patch },
        });
    }
    for path in &verified.missing {
        entries.push(DiffEntry {
            path: path.clone(),
            change: DiffChange::Missing,
        });
    }
    for path in &verified.untracked {
        entries.push(DiffEntry {
            path: path.clone(),
            change: DiffChange::Untracked,
        });
    }

    Ok(DiffResult {
        package: package.to_string(),
        has_integrity_data: verified.has_integrity_data,
        entries,
    })
}

/// Copy `files` (paths relative to `package_dir`) into a timestamped
/// directory under `backup_root`, so an upgrade that discards local edits
/// stays recoverable. Returns the backup directory.
pub fn backup(
    package: &str,
    package_dir: &Path,
    backup_root: &Path,
    files: &[String],
) -> Result<PathBuf, IntegrityError> {
    let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
    let backup_dir = backup_root.join(format!("{}-{stamp}", package.replace('/', "_")));
    fs::create_dir_all(&backup_dir)?;

    for relative in files {
        let source = package_dir.join(relative);
        if !source.exists() {
            continue;
        }
        let dest = backup_dir.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&source, &dest)?;
    }

    tracing::info!(package, dir = %backup_dir.display(), "backed up modified files");
    Ok(backup_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lockfile::FileChecksums;
    use crate::io::hashing::hash_tree;
    use crate::types::Version;
    use tempfile::tempdir;

    fn locked_for(dir: &Path) -> LockedPackage {
        LockedPackage {
            version: Version::new("1.0.0"),
            source: "main".into(),
            checksum: "00".repeat(32),
            dependencies: Default::default(),
            files: Some(FileChecksums::sha256(hash_tree(dir).unwrap())),
            source_name: None,
            source_commit: None,
        }
    }

    fn make_tree(dir: &Path) {
        fs::create_dir_all(dir.join("prompts")).unwrap();
        fs::write(dir.join("prompts/a.md"), "alpha\n").unwrap();
        fs::write(dir.join("prompts/b.md"), "beta\n").unwrap();
    }

    #[test]
    fn test_verify_untouched_is_clean() {
        let dir = tempdir().unwrap();
        make_tree(dir.path());
        let locked = locked_for(dir.path());

        let result = verify("demo", dir.path(), &locked).unwrap();
        assert!(result.is_clean());
        assert_eq!(result.ok.len(), 2);
    }

    #[test]
    fn test_verify_detects_exactly_the_modified_file() {
        let dir = tempdir().unwrap();
        make_tree(dir.path());
        let locked = locked_for(dir.path());

        fs::write(dir.path().join("prompts/a.md"), "alpha edited\n").unwrap();

        let result = verify("demo", dir.path(), &locked).unwrap();
        assert_eq!(result.modified, vec!["prompts/a.md"]);
        assert_eq!(result.ok, vec!["prompts/b.md"]);
        assert!(result.missing.is_empty());
        assert!(result.untracked.is_empty());
    }

    #[test]
    fn test_verify_missing_and_untracked() {
        let dir = tempdir().unwrap();
        make_tree(dir.path());
        let locked = locked_for(dir.path());

        fs::remove_file(dir.path().join("prompts/b.md")).unwrap();
        fs::write(dir.path().join("prompts/new.md"), "new\n").unwrap();

        let result = verify("demo", dir.path(), &locked).unwrap();
        assert_eq!(result.missing, vec!["prompts/b.md"]);
        assert_eq!(result.untracked, vec!["prompts/new.md"]);
    }

    #[test]
    fn test_verify_without_integrity_data() {
        let dir = tempdir().unwrap();
        make_tree(dir.path());
        let mut locked = locked_for(dir.path());
        locked.files = None;

        let result = verify("demo", dir.path(), &locked).unwrap();
        assert!(!result.has_integrity_data);
        assert!(!result.is_clean());
    }

    #[test]
    fn test_diff_with_retained_copy() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("pkg");
        let retained = dir.path().join("retained");
        make_tree(&pkg);
        make_tree(&retained);
        let locked = locked_for(&pkg);

        fs::write(pkg.join("prompts/a.md"), "alpha changed\n").unwrap();

        let result = diff("demo", &pkg, Some(&retained), &locked).unwrap();
        assert_eq!(result.entries.len(), 1);
        match &result.entries[0].change {
            DiffChange::Modified { patch: Some(patch) } => {
                assert!(patch.contains("alpha"));
            }
            other => panic!("expected modified-with-patch, got {other:?}"),
        }
    }

    #[test]
    fn test_diff_degrades_without_retained_copy() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("pkg");
        make_tree(&pkg);
        let locked = locked_for(&pkg);

        fs::write(pkg.join("prompts/a.md"), "alpha changed\n").unwrap();

        let result = diff("demo", &pkg, None, &locked).unwrap();
        match &result.entries[0].change {
            DiffChange::Modified { patch: None } => {}
            other => panic!("expected modified-without-patch, got {other:?}"),
        }
    }

    #[test]
    fn test_backup_copies_listed_files() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("pkg");
        make_tree(&pkg);
        let backups = dir.path().join("backups");

        let backup_dir = backup(
            "demo",
            &pkg,
            &backups,
            &["prompts/a.md".to_string(), "prompts/gone.md".to_string()],
        )
        .unwrap();

        assert!(backup_dir.join("prompts/a.md").exists());
        assert!(!backup_dir.join("prompts/gone.md").exists());
    }
}
