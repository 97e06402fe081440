//! CLI command implementations.
//!
//! Thin wrappers over the library: each command loads configuration,
//! builds the workspace, calls the corresponding operation, and renders
//! the structured result. All user-facing text lives here.

pub mod diff;
pub mod doctor;
pub mod info;
pub mod install;
pub mod list;
pub mod pack;
pub mod publish;
pub mod registry;
pub mod remove;
pub mod search;
pub mod source;
pub mod upgrade;
pub mod verify;

use std::path::Path;

use anyhow::{Context, Result};

use skillet::config::Config;
use skillet::ops::Workspace;

/// Load the merged configuration for a project.
pub(crate) fn load_config(project: &Path) -> Result<Config> {
    let home = skillet::skillet_home();
    Config::load(&home, project).context("failed to load configuration")
}

pub(crate) fn workspace(project: &Path) -> Workspace {
    Workspace::new(project)
}
