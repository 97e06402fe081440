//! `skillet info`

use std::path::Path;

use anyhow::{Result, bail};

use skillet::core::integrity;
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

    println!("name:     {name}");
    println!("version:  {}", locked.version);
    println!("source:   {}", locked.source);
    println!("checksum: {}", locked.checksum);
    if let Some(commit) = &locked.source_commit {
        println!("commit:   {commit}");
    }
    if !locked.dependencies.is_empty() {
        println!("dependencies:");
        for (dep, constraint) in &locked.dependencies {
            println!("  {dep} {constraint}");
        }
    }

    let verified = integrity::verify(&name, &workspace.package_dir(&name), locked)?;
    if !verified.has_integrity_data {
        println!("integrity: no data recorded");
    } else if verified.is_clean() {
        println!("integrity: ok ({} files)", verified.ok.len());
    } else {
        println!(
            "integrity: {} modified, {} missing, {} untracked",
            verified.modified.len(),
            verified.missing.len(),
            verified.untracked.len()
        );
    }
    Ok(())
}
