//! `skillet pack`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use skillet::io::pack_archive;
use skillet::manifest::PackageManifest;

use skillet::MANIFEST_FILE;

pub(crate) fn run(dir: &Path, output: Option<&Path>) -> Result<()> {
    let manifest = PackageManifest::load(&dir.join(MANIFEST_FILE))
        .with_context(|| format!("no valid {MANIFEST_FILE} in {}", dir.display()))?;

    let output: PathBuf = match output {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(format!(
            "{}-{}.tar.gz",
            manifest.name.replace('/', "_").replace('@', ""),
            manifest.version
        )),
    };

    pack_archive(dir, &output)?;
    println!(
        "packed {}@{} -> {}",
        manifest.name,
        manifest.version,
        output.display()
    );
    Ok(())
}
