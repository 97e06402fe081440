//! `skillet list`

use std::path::Path;

use anyhow::Result;
use comfy_table::{Table, presets};

use skillet::lockfile::LockFile;

use crate::cmd::workspace;

pub(crate) fn run(project: &Path) -> Result<()> {
    let workspace = workspace(project);
    let lock = LockFile::load(&workspace.lock_path())?;

    if lock.packages.is_empty() {
        println!("No packages installed");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_header(vec!["NAME", "VERSION", "SOURCE", "INTEGRITY"]);
    for (name, package) in &lock.packages {
        let integrity = if package.files.is_some() {
            "tracked"
        } else {
            "no data"
        };
        table.add_row(vec![
            name.clone(),
            package.version.to_string(),
            package.source.clone(),
            integrity.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}
