//! `skillet diff`

use std::path::Path;

use anyhow::{Result, bail};

use skillet::core::integrity::{self, DiffChange};
use skillet::lockfile::LockFile;
use skillet::types::PackageName;

use crate::cmd::workspace;

pub(crate) fn run(project: &Path, package: &str) -> Result<()> {
    let workspace = workspace(project);
    let lock = LockFile::load(&workspace.lock_path())?;
    let name = PackageName::new(package);

    let Some(locked) = lock.get(&name) else {
        bail!("Package '{name}' is not installed");
    };

    let retained = workspace.retained_dir(&name, &locked.version);
    let result = integrity::diff(
        &name,
        &workspace.package_dir(&name),
        retained.is_dir().then_some(retained.as_path()),
        locked,
    )?;

    if !result.has_integrity_data {
        println!("{name}: no integrity data available");
        return Ok(());
    }
    if result.is_empty() {
        println!("{name}: no local modifications");
        return Ok(());
    }

    for entry in &result.entries {
        match &entry.change {
            DiffChange::Modified { patch: Some(patch) } => {
                println!("--- {}\n{patch}", entry.path);
            }
            DiffChange::Modified { patch: None } => {
                println!("--- {} (modified, no diff available)", entry.path);
            }
            DiffChange::Missing => println!("--- {} (missing)", entry.path),
            DiffChange::Untracked => println!("--- {} (untracked)", entry.path),
        }
    }
    Ok(())
}
