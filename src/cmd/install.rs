//! `skillet install`

use std::path::Path;

use anyhow::{Result, bail};

use skillet::adapter::DirLayoutAdapter;
use skillet::core::version::PackageSpec;
use skillet::ops::{self, InstallTarget};
use skillet::registry;
use skillet::resolver;
use skillet::source::{self, ResolvedTarget};
use skillet::ui::ConsoleReporter;

use crate::cmd::{load_config, workspace};

pub(crate) async fn run(project: &Path, packages: &[String], force: bool) -> Result<()> {
    let reporter = ConsoleReporter;
    let config = load_config(project)?;
    let workspace = workspace(project);
    let registries = registry::open_all(&config.registries)?;

    let report = source::build_source_index(&config);
    for (name, err) in &report.failures {
        eprintln!("warning: source '{name}' scan failed: {err}");
    }

    let mut roots = Vec::new();
    let mut targets = Vec::new();
    for raw in packages {
        let spec = PackageSpec::parse(raw)?;
        match source::resolve_artifact(&spec.name, &report.index, &registries, &reporter)? {
            ResolvedTarget::Registry(name) => roots.push((name, spec.constraint)),
            ResolvedTarget::Source(package) => {
                if spec.constraint.is_some() {
                    bail!(
                        "'{raw}': version constraints do not apply to source artifacts; \
                         sources install from their fetched commit"
                    );
                }
                targets.push(InstallTarget::Source(package));
            }
        }
    }

    if !roots.is_empty() {
        let resolved = resolver::resolve(&roots, &registries)?;
        targets.extend(resolved.into_iter().map(InstallTarget::Registry));
    }

    let adapter = DirLayoutAdapter::default();
    let outcomes = ops::install(&workspace, &config, targets, &adapter, &reporter, force).await?;

    let installed = outcomes
        .iter()
        .filter(|o| matches!(o, ops::InstallOutcome::Installed { .. }))
        .count();
    if installed > 0 {
        println!("{installed} package(s) installed");
    }
    Ok(())
}
