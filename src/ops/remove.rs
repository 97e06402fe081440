//! Uninstall operation.

use std::fs;

use crate::adapter::{DeployRef, PlatformAdapter};
use crate::core::lockfile::LockFile;
use crate::core::manifest::PackageManifest;
use crate::ops::{OpError, Workspace, WorkspaceLock};
use crate::types::PackageName;
use crate::ui::Reporter;
use crate::MANIFEST_FILE;

/// Remove an installed package: undeploy its artifacts, delete the package
/// directory and retained copies, and drop the lock entry.
///
/// Packages that still depend on it produce a warning, not a failure -
/// artifacts are files, and a dangling dependency breaks nothing at
/// runtime.
pub async fn remove(
    workspace: &Workspace,
    names: &[PackageName],
    adapter: &dyn PlatformAdapter,
    reporter: &dyn Reporter,
) -> Result<(), OpError> {
    let _guard = WorkspaceLock::acquire(&workspace.state_dir())?;
    let mut lock = LockFile::load(&workspace.lock_path())?;

    for name in names {
        let Some(locked) = lock.get(name.as_str()).cloned() else {
            return Err(OpError::NotInstalled(name.to_string()));
        };

        let dependents = lock.dependents_of(name.as_str());
        if !dependents.is_empty() {
            reporter.warning(&format!(
                "'{name}' is still a dependency of: {}",
                dependents.join(", ")
            ));
        }

        reporter.working("removing", name, &locked.version);

        let package_dir = workspace.package_dir(name.as_str());
        let manifest_path = package_dir.join(MANIFEST_FILE);
        if manifest_path.is_file() {
            let manifest = PackageManifest::load(&manifest_path)?;
            for (kind, artifact) in manifest.artifacts.iter() {
                adapter.undeploy(
                    &DeployRef {
                        kind,
                        name: artifact.name.clone(),
                        source: package_dir.join(&artifact.path),
                    },
                    workspace.root(),
                )?;
            }
        } else {
            reporter.warning(&format!(
                "'{name}' has no manifest on disk; skipping undeploy"
            ));
        }

        if package_dir.exists() {
            fs::remove_dir_all(&package_dir)?;
        }
        let retained_root = workspace.retained_root(name.as_str());
        if retained_root.exists() {
            fs::remove_dir_all(&retained_root)?;
        }

        lock.remove(name.as_str());
        lock.save(&workspace.lock_path())?;
        reporter.done("removed", name, &locked.version);
    }

    Ok(())
}
