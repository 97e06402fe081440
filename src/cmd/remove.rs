//! `skillet remove`

use std::path::Path;

use anyhow::Result;

use skillet::adapter::DirLayoutAdapter;
use skillet::ops;
use skillet::types::PackageName;
use skillet::ui::ConsoleReporter;

use crate::cmd::workspace;

pub(crate) async fn run(project: &Path, packages: &[String]) -> Result<()> {
    let names: Vec<PackageName> = packages.iter().map(|p| PackageName::new(p)).collect();
    let adapter = DirLayoutAdapter::default();
    let reporter = ConsoleReporter;
    ops::remove(&workspace(project), &names, &adapter, &reporter).await?;
    Ok(())
}
