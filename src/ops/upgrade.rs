//! Upgrade operation.
//!
//! An upgrade re-runs install against the package's current resolution or
//! source target, but first verifies the installed tree. When local
//! modifications exist, the caller-supplied policy decides what happens -
//! the transaction itself never prompts, so it stays testable without a
//! terminal, and nothing that would lose user edits is ever auto-resolved.

use crate::adapter::PlatformAdapter;
use crate::core::config::Config;
use crate::core::integrity::{self, DiffResult};
use crate::core::lockfile::{LockFile, LockedPackage};
use crate::ops::install::{self, InstallTarget};
use crate::ops::{OpError, Workspace, WorkspaceLock};
use crate::registry;
use crate::source;
use crate::types::{PackageName, Version};
use crate::ui::Reporter;

/// What to do about a package with local modifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeAction {
    /// Back the modified files up, then proceed.
    BackupAndProceed,
    /// Leave this package alone.
    Skip,
    /// Proceed and discard the modifications.
    Force,
}

/// Caller-supplied policy for the modified-files gate.
pub enum UpgradePolicy {
    /// Always back up and proceed.
    Backup,
    /// Always skip modified packages.
    Skip,
    /// Bypass the verification gate entirely.
    Force,
    /// Show the diff to the callback and act on its decision.
    Decide(Box<dyn Fn(&str, &DiffResult) -> UpgradeAction + Send + Sync>),
}

impl std::fmt::Debug for UpgradePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpgradePolicy::Backup => write!(f, "Backup"),
            UpgradePolicy::Skip => write!(f, "Skip"),
            UpgradePolicy::Force => write!(f, "Force"),
            UpgradePolicy::Decide(_) => write!(f, "Decide(..)"),
        }
    }
}

/// Per-package upgrade outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    Upgraded {
        name: String,
        from: Version,
        to: Version,
    },
    UpToDate {
        name: String,
        version: Version,
    },
    SkippedModified {
        name: String,
    },
}

/// Upgrade the named packages (or every installed package when `names` is
/// empty).
pub async fn upgrade(
    workspace: &Workspace,
    config: &Config,
    names: &[PackageName],
    adapter: &dyn PlatformAdapter,
    reporter: &dyn Reporter,
    policy: &UpgradePolicy,
) -> Result<Vec<UpgradeOutcome>, OpError> {
    let _guard = WorkspaceLock::acquire(&workspace.state_dir())?;
    let lock = LockFile::load(&workspace.lock_path())?;

    let selected: Vec<String> = if names.is_empty() {
        lock.packages.keys().cloned().collect()
    } else {
        names.iter().map(ToString::to_string).collect()
    };

    let mut outcomes = Vec::new();
    for name in selected {
        let Some(locked) = lock.get(&name).cloned() else {
            return Err(OpError::NotInstalled(name));
        };

        // Modified-files gate. Mandatory unless force is explicit.
        if !matches!(policy, UpgradePolicy::Force) {
            let verified =
                integrity::verify(&name, &workspace.package_dir(&name), &locked)?;
            if verified.has_integrity_data && !verified.is_clean() {
                let action = match policy {
                    UpgradePolicy::Backup => UpgradeAction::BackupAndProceed,
                    UpgradePolicy::Skip => UpgradeAction::Skip,
                    UpgradePolicy::Decide(decide) => {
                        let retained =
                            workspace.retained_dir(&name, &locked.version);
                        let diff = integrity::diff(
                            &name,
                            &workspace.package_dir(&name),
                            retained.is_dir().then_some(retained.as_path()),
                            &locked,
                        )?;
                        decide(&name, &diff)
                    }
                    UpgradePolicy::Force => unreachable!("force bypasses the gate"),
                };

                match action {
                    UpgradeAction::Skip => {
                        reporter.warning(&format!(
                            "'{name}' has local modifications; skipped"
                        ));
                        outcomes.push(UpgradeOutcome::SkippedModified { name });
                        continue;
                    }
                    UpgradeAction::BackupAndProceed => {
                        let mut files = verified.modified.clone();
                        files.extend(verified.untracked.clone());
                        let backup_dir = integrity::backup(
                            &name,
                            &workspace.package_dir(&name),
                            &workspace.backups_dir(),
                            &files,
                        )?;
                        reporter.info(&format!(
                            "backed up modified files of '{name}' to {}",
                            backup_dir.display()
                        ));
                    }
                    UpgradeAction::Force => {}
                }
            }
        }

        // Re-resolve against the package's original provenance.
        let target = resolve_target(config, &name, &locked, reporter)?;
        let to_version = match &target {
            InstallTarget::Registry(p) => p.version.clone(),
            InstallTarget::Source(p) => {
                Version::new(&format!("0.0.0-git.{}", &p.commit[..p.commit.len().min(12)]))
            }
        };
        if to_version == locked.version {
            outcomes.push(UpgradeOutcome::UpToDate {
                name,
                version: locked.version,
            });
            continue;
        }

        install::run(workspace, config, vec![target], adapter, reporter, true).await?;
        outcomes.push(UpgradeOutcome::Upgraded {
            name,
            from: locked.version,
            to: to_version,
        });
    }

    Ok(outcomes)
}

/// Find the current target for an installed package: the same source it
/// came from, or the newest registry version.
fn resolve_target(
    config: &Config,
    name: &str,
    locked: &LockedPackage,
    reporter: &dyn Reporter,
) -> Result<InstallTarget, OpError> {
    if let Some(source_name) = &locked.source_name {
        let report = source::build_source_index(config);
        for (failed_source, err) in &report.failures {
            reporter.warning(&format!("source '{failed_source}' scan failed: {err}"));
        }
        let qualified = format!("{source_name}/{name}");
        let package = report
            .index
            .find_qualified(&qualified)
            .ok_or_else(|| {
                OpError::Validation(format!(
                    "'{qualified}' no longer exists in its source; remove and reinstall"
                ))
            })?;
        return Ok(InstallTarget::Source(package.clone()));
    }

    let registries = registry::open_all(&config.registries)?;
    let resolved = crate::core::resolver::resolve(
        &[(PackageName::new(name), None)],
        &registries,
    )?;
    let package = resolved
        .into_iter()
        .find(|p| p.name == *name)
        .ok_or_else(|| OpError::Validation(format!("'{name}' did not resolve")))?;
    Ok(InstallTarget::Registry(package))
}
