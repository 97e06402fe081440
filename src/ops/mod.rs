//! Package operations: install, remove, upgrade, and diagnostics.
//!
//! Every mutating operation serializes on a workspace-level advisory file
//! lock and follows the same transaction shape: stage into a temp
//! directory, verify, commit with an atomic rename, deploy, and only then
//! record the result in the lock file. Failures before that final write
//! leave the workspace exactly as it was.

pub mod doctor;
pub mod error;
pub mod install;
pub mod lock;
pub mod remove;
pub mod upgrade;

pub use error::OpError;
pub use install::{InstallOutcome, InstallTarget, install};
pub use lock::WorkspaceLock;
pub use remove::remove;
pub use upgrade::{UpgradeAction, UpgradePolicy, upgrade};

use std::path::{Path, PathBuf};

/// A project workspace: the directory that owns a `skillet.lock` and the
/// `.skillet/` state directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The lock file: `<root>/skillet.lock`.
    pub fn lock_path(&self) -> PathBuf {
        self.root.join("skillet.lock")
    }

    /// The state directory: `<root>/.skillet`.
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(".skillet")
    }

    /// Installed package trees.
    pub fn packages_dir(&self) -> PathBuf {
        self.state_dir().join("packages")
    }

    /// Installed tree for one package.
    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.packages_dir().join(fs_name(name))
    }

    /// Pristine retained copy of one installed version, kept so `diff`
    /// works long after install.
    pub fn retained_dir(&self, name: &str, version: &str) -> PathBuf {
        self.state_dir().join("cache").join(fs_name(name)).join(version)
    }

    /// Root of retained copies for one package.
    pub fn retained_root(&self, name: &str) -> PathBuf {
        self.state_dir().join("cache").join(fs_name(name))
    }

    /// Pre-upgrade backups of modified files.
    pub fn backups_dir(&self) -> PathBuf {
        self.state_dir().join("backups")
    }

    /// Transaction staging area. Anything left here after a crash is an
    /// incomplete-install marker for `skillet doctor`.
    pub fn staging_dir(&self) -> PathBuf {
        self.state_dir().join("staging")
    }
}

/// Filesystem-safe form of a package name (`@scope/name` and qualified
/// names contain separators).
pub(crate) fn fs_name(name: &str) -> String {
    name.replace('/', "__").replace('@', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_name() {
        assert_eq!(fs_name("demo"), "demo");
        assert_eq!(fs_name("@acme/demo"), "acme__demo");
        assert_eq!(fs_name("acme/skills/demo"), "acme__skills__demo");
    }

    #[test]
    fn test_workspace_paths() {
        let ws = Workspace::new(Path::new("/proj"));
        assert_eq!(ws.lock_path(), Path::new("/proj/skillet.lock"));
        assert_eq!(
            ws.package_dir("@acme/demo"),
            Path::new("/proj/.skillet/packages/acme__demo")
        );
        assert_eq!(
            ws.retained_dir("demo", "1.0.0"),
            Path::new("/proj/.skillet/cache/demo/1.0.0")
        );
    }
}
