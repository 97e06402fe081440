//! `skillet upgrade`

use std::io::Write;
use std::path::Path;

use anyhow::Result;

use skillet::adapter::DirLayoutAdapter;
use skillet::core::integrity::{DiffChange, DiffResult};
use skillet::ops::{self, UpgradeAction, UpgradePolicy};
use skillet::types::PackageName;
use skillet::ui::ConsoleReporter;

use crate::cmd::{load_config, workspace};

pub(crate) async fn run(
    project: &Path,
    packages: &[String],
    backup: bool,
    skip_modified: bool,
    force: bool,
) -> Result<()> {
    let policy = if force {
        UpgradePolicy::Force
    } else if skip_modified {
        UpgradePolicy::Skip
    } else if backup {
        UpgradePolicy::Backup
    } else {
        UpgradePolicy::Decide(Box::new(prompt_for_action))
    };

    let config = load_config(project)?;
    let names: Vec<PackageName> = packages.iter().map(|p| PackageName::new(p)).collect();
    let adapter = DirLayoutAdapter::default();
    let reporter = ConsoleReporter;

    let outcomes = ops::upgrade(
        &workspace(project),
        &config,
        &names,
        &adapter,
        &reporter,
        &policy,
    )
    .await?;

    for outcome in &outcomes {
        match outcome {
            ops::upgrade::UpgradeOutcome::Upgraded { name, from, to } => {
                println!("{name}: {from} -> {to}");
            }
            ops::upgrade::UpgradeOutcome::UpToDate { name, version } => {
                println!("{name}: up to date ({version})");
            }
            ops::upgrade::UpgradeOutcome::SkippedModified { name } => {
                println!("{name}: skipped (local modifications)");
            }
        }
    }
    Ok(())
}

/// Interactive fallback for the modified-files gate.
fn prompt_for_action(name: &str, diff: &DiffResult) -> UpgradeAction {
    eprintln!("'{name}' has local modifications:");
    for entry in &diff.entries {
        let tag = match &entry.change {
            DiffChange::Modified { .. } => "modified",
            DiffChange::Missing => "missing",
            DiffChange::Untracked => "untracked",
        };
        eprintln!("  {tag}: {}", entry.path);
    }

    loop {
        eprint!("[b]ackup and upgrade / [s]kip / [d]iff / [f]orce: ");
        let _ = std::io::stderr().flush();
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).is_err() {
            return UpgradeAction::Skip;
        }
        match line.trim().to_lowercase().as_str() {
            "b" | "backup" => return UpgradeAction::BackupAndProceed,
            "s" | "skip" | "" => return UpgradeAction::Skip,
            "f" | "force" => return UpgradeAction::Force,
            "d" | "diff" => {
                for entry in &diff.entries {
                    if let DiffChange::Modified { patch: Some(patch) } = &entry.change {
                        eprintln!("--- {}\n{patch}", entry.path);
                    } else {
                        eprintln!("--- {} (no diff available)", entry.path);
                    }
                }
            }
            _ => {}
        }
    }
}
