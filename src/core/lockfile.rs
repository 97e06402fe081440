//! Lock file: the durable record of installed packages.
//!
//! `skillet.lock` is the single source of truth for what is installed. It is
//! mutated only by the installer, and only as the final step of a successful
//! transaction. Saves are atomic (temp file + rename). The schema evolves
//! additively: the per-file checksum map and source provenance fields are
//! optional, and entries written before they existed still load.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::LOCK_SCHEMA_VERSION;
use crate::types::Version;

#[derive(Error, Debug)]
pub enum LockError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Lock file corrupt at {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("Lock file schema v{found} is newer than supported v{supported}; upgrade skillet")]
    UnsupportedSchema { found: u32, supported: u32 },
}

/// Per-file integrity data for one installed package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChecksums {
    /// Digest algorithm tag; currently always "sha256".
    pub algorithm: String,
    /// Relative path to hex digest.
    pub files: BTreeMap<String, String>,
}

impl FileChecksums {
    /// Build a SHA-256 checksum map.
    pub fn sha256(files: BTreeMap<String, String>) -> Self {
        Self {
            algorithm: "sha256".into(),
            files,
        }
    }
}

/// One installed package as recorded in the lock file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedPackage {
    pub version: Version,
    /// Where the package came from: a registry name, a source name, or
    /// "local".
    pub source: String,
    /// Archive-level checksum (hex SHA-256). For source installs this is
    /// the digest of the staged tree manifest.
    pub checksum: String,
    /// Resolved dependency map (name to version).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    /// Per-file checksums. Absent in lock files written by older versions;
    /// such entries report "no integrity data" instead of erroring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<FileChecksums>,
    /// Source name, when installed from a configured git source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    /// Full commit SHA of the source checkout at install time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_commit: Option<String>,
}

/// The top-level lock file document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockFile {
    /// Schema version.
    pub version: u32,
    /// When the document was last written (RFC 3339).
    pub resolved_at: String,
    /// Installed packages, keyed by name.
    #[serde(default)]
    pub packages: BTreeMap<String, LockedPackage>,
}

impl LockFile {
    /// Create a new empty lock file.
    pub fn new() -> Self {
        Self {
            version: LOCK_SCHEMA_VERSION,
            resolved_at: chrono::Utc::now().to_rfc3339(),
            packages: BTreeMap::new(),
        }
    }

    /// Load the lock file at `path`. A missing file is an empty lock file.
    pub fn load(path: &Path) -> Result<Self, LockError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)?;
        let lock: Self = serde_json::from_str(&content).map_err(|e| LockError::Corrupt {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        if lock.version > LOCK_SCHEMA_VERSION {
            return Err(LockError::UnsupportedSchema {
                found: lock.version,
                supported: LOCK_SCHEMA_VERSION,
            });
        }
        Ok(lock)
    }

    /// Save atomically: serialize, write to a temp file, rename over the
    /// original. There is no partial-write window.
    pub fn save(&self, path: &Path) -> Result<(), LockError> {
        let mut doc = self.clone();
        doc.resolved_at = chrono::Utc::now().to_rfc3339();
        let content =
            serde_json::to_vec_pretty(&doc).expect("lock file serialization cannot fail");
        crate::io::atomic_write(path, &content)?;
        Ok(())
    }

    /// Add or replace a package entry.
    pub fn upsert(&mut self, name: &str, package: LockedPackage) {
        self.packages.insert(name.to_string(), package);
    }

    /// Remove a package entry; returns it if present.
    pub fn remove(&mut self, name: &str) -> Option<LockedPackage> {
        self.packages.remove(name)
    }

    /// Find a package by name.
    pub fn get(&self, name: &str) -> Option<&LockedPackage> {
        self.packages.get(name)
    }

    /// Names of installed packages that declare `name` as a dependency.
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.packages
            .iter()
            .filter(|(_, p)| p.dependencies.contains_key(name))
            .map(|(n, _)| n.clone())
            .collect()
    }
}

impl Default for LockFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Default lock file location within a project.
pub fn lock_path(project_root: &Path) -> PathBuf {
    project_root.join("skillet.lock")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(version: &str) -> LockedPackage {
        LockedPackage {
            version: Version::new(version),
            source: "main".into(),
            checksum: "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855".into(),
            dependencies: BTreeMap::new(),
            files: None,
            source_name: None,
            source_commit: None,
        }
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("skillet.lock");

        let mut lock = LockFile::new();
        let mut files = BTreeMap::new();
        files.insert("SKILL.md".to_string(), "ab".repeat(32));
        let mut pkg = entry("1.0.0");
        pkg.files = Some(FileChecksums::sha256(files));
        lock.upsert("demo", pkg);
        lock.save(&path).unwrap();

        let loaded = LockFile::load(&path).unwrap();
        assert_eq!(loaded.packages, lock.packages);
        assert_eq!(loaded.version, LOCK_SCHEMA_VERSION);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let lock = LockFile::load(&dir.path().join("skillet.lock")).unwrap();
        assert!(lock.packages.is_empty());
    }

    #[test]
    fn test_optional_fields_tolerated() {
        // A minimal entry as an older skillet would have written it: no
        // files map, no source fields.
        let dir = tempdir().unwrap();
        let path = dir.path().join("skillet.lock");
        fs::write(
            &path,
            r#"{
  "version": 1,
  "resolved_at": "2025-01-01T00:00:00Z",
  "packages": {
    "demo": {
      "version": "1.0.0",
      "source": "main",
      "checksum": "abc"
    }
  }
}"#,
        )
        .unwrap();

        let lock = LockFile::load(&path).unwrap();
        let pkg = lock.get("demo").unwrap();
        assert!(pkg.files.is_none());
        assert!(pkg.source_name.is_none());
        assert!(pkg.dependencies.is_empty());
    }

    #[test]
    fn test_corrupt_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("skillet.lock");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            LockFile::load(&path),
            Err(LockError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_newer_schema_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("skillet.lock");
        fs::write(
            &path,
            r#"{"version": 99, "resolved_at": "2025-01-01T00:00:00Z", "packages": {}}"#,
        )
        .unwrap();
        assert!(matches!(
            LockFile::load(&path),
            Err(LockError::UnsupportedSchema { found: 99, .. })
        ));
    }

    #[test]
    fn test_dependents_of() {
        let mut lock = LockFile::new();
        let mut parent = entry("1.0.0");
        parent
            .dependencies
            .insert("shared-helpers".into(), "1.1.0".into());
        lock.upsert("parent", parent);
        lock.upsert("other", entry("2.0.0"));

        assert_eq!(lock.dependents_of("shared-helpers"), vec!["parent"]);
        assert!(lock.dependents_of("parent").is_empty());
    }
}
