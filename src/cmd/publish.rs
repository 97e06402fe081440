//! `skillet publish`

use std::path::Path;

use anyhow::{Context, Result, bail};

use skillet::io::pack_archive;
use skillet::manifest::PackageManifest;
use skillet::registry;

use skillet::MANIFEST_FILE;

use crate::cmd::load_config;

pub(crate) fn run(
    project: &Path,
    dir: &Path,
    registry_name: Option<&str>,
    force: bool,
) -> Result<()> {
    let config = load_config(project)?;
    let manifest = PackageManifest::load(&dir.join(MANIFEST_FILE))
        .with_context(|| format!("no valid {MANIFEST_FILE} in {}", dir.display()))?;

    let source = match registry_name {
        Some(name) => config
            .registry(name)
            .with_context(|| format!("registry '{name}' is not configured"))?,
        None => config
            .registries
            .iter()
            .find(|r| r.default)
            .or_else(|| config.registries.first())
            .context("no registries configured; run 'skillet registry add' first")?,
    };
    let registry = registry::open(source)?;

    // Pack into a scratch archive, then hand it to the registry.
    let scratch = tempfile::tempdir()?;
    let archive = scratch.path().join("publish.tar.gz");
    pack_archive(dir, &archive)?;

    match registry.publish(&manifest, &archive, force) {
        Ok(checksum) => {
            println!(
                "published {}@{} to '{}' ({checksum})",
                manifest.name,
                manifest.version,
                registry.name()
            );
            Ok(())
        }
        Err(err) => bail!("{err}"),
    }
}
