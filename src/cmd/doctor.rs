//! `skillet doctor` - workspace diagnostics.

use std::path::Path;

use anyhow::Result;

use skillet::lockfile::LockFile;
use skillet::ops::doctor;

use crate::cmd::workspace;

pub(crate) fn run(project: &Path, clean: bool) -> Result<()> {
    let workspace = workspace(project);

    // Lock health: loading validates the schema.
    match LockFile::load(&workspace.lock_path()) {
        Ok(lock) => println!("lock file: ok ({} packages)", lock.packages.len()),
        Err(err) => println!("lock file: {err}"),
    }

    let remnants = doctor::scan_remnants(&workspace)?;
    if remnants.is_empty() {
        println!("staging: clean");
        return Ok(());
    }

    println!(
        "staging: {} incomplete install remnant(s) - an install was interrupted",
        remnants.len()
    );
    for remnant in &remnants {
        let when = remnant.modified_at.as_deref().unwrap_or("unknown time");
        println!("  {} ({when})", remnant.path.display());
    }

    if clean {
        let cleaned = doctor::clean_remnants(&workspace)?;
        println!("removed {cleaned} remnant(s)");
    } else {
        println!("run 'skillet doctor --clean' to remove them");
    }
    Ok(())
}
