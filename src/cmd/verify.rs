//! `skillet verify`

use std::path::Path;

use anyhow::{Result, bail};

use skillet::core::integrity;
use skillet::lockfile::LockFile;

use crate::cmd::workspace;

pub(crate) fn run(project: &Path, packages: &[String]) -> Result<()> {
    let workspace = workspace(project);
    let lock = LockFile::load(&workspace.lock_path())?;

    let selected: Vec<String> = if packages.is_empty() {
        lock.packages.keys().cloned().collect()
    } else {
        packages.iter().map(|p| p.to_lowercase()).collect()
    };

    if selected.is_empty() {
        println!("No packages installed");
        return Ok(());
    }

    let mut drifted = false;
    for name in &selected {
        let Some(locked) = lock.get(name) else {
            bail!("Package '{name}' is not installed");
        };
        let result = integrity::verify(name, &workspace.package_dir(name), locked)?;

        if !result.has_integrity_data {
            println!("{name}: no integrity data available");
            continue;
        }
        if result.is_clean() {
            println!("{name}: ok ({} files)", result.ok.len());
            continue;
        }

        drifted = true;
        println!("{name}:");
        for path in &result.modified {
            println!("  modified:  {path}");
        }
        for path in &result.missing {
            println!("  missing:   {path}");
        }
        for path in &result.untracked {
            println!("  untracked: {path}");
        }
    }

    if drifted {
        bail!("verification found drift; see above");
    }
    Ok(())
}
