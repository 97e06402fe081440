//! skillet - a package layer for AI agent artifacts
//!
//! Installs, verifies, and upgrades agent artifacts (skills, agents, prompts,
//! instructions) from local registries and cached git sources into per-tool
//! target directories.
//!
//! # Architecture
//!
//! - **Registries**: filesystem-backed package stores with a JSON search
//!   index, per-package metadata documents, and tar.gz version archives.
//! - **Sources**: cached git checkouts scanned into an in-memory catalog of
//!   installable "virtual packages" - no pre-built archive required.
//! - **Transactions**: every mutating operation stages into a temp directory,
//!   commits with an atomic rename, and records the result in the lock file
//!   as its final step. A failure before that write leaves no trace.
//! - **Reporter**: library code never prints; progress and warnings flow
//!   through the [`ui::Reporter`] trait.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.skillet/
//! ├── config.toml   # Global configuration (registries, sources)
//! ├── sources/      # Cached git checkouts, one per configured source
//! └── registries/   # Default location for locally created registries
//!
//! <project>/
//! ├── skillet.lock  # Installed packages with per-file checksums
//! └── .skillet/
//!     ├── packages/ # Installed package trees
//!     ├── cache/    # Pristine copies retained for diffing
//!     ├── backups/  # Pre-upgrade copies of modified files
//!     └── staging/  # Transaction staging (remnants indicate a crash)
//! ```

pub mod adapter;
pub mod core;
pub mod io;
pub mod ops;
pub mod registry;
pub mod source;
pub mod types;
pub mod ui;

// Re-exports for convenience
pub use crate::core::config;
pub use crate::core::lockfile;
pub use crate::core::manifest;
pub use crate::core::resolver;
pub use crate::ops::Workspace;

use std::path::PathBuf;

use dirs::home_dir;

/// Returns the global configuration directory, or None if the user's home
/// cannot be resolved.
pub fn try_skillet_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("SKILLET_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".skillet"))
}

/// Returns the canonical skillet home directory (`~/.skillet`).
///
/// # Panics
/// Panics if the home directory cannot be determined.
pub fn skillet_home() -> PathBuf {
    try_skillet_home().expect("Could not determine home directory")
}

/// Global configuration file: ~/.skillet/config.toml
pub fn global_config_path() -> PathBuf {
    skillet_home().join("config.toml")
}

/// Cached git checkouts: ~/.skillet/sources
pub fn sources_path() -> PathBuf {
    skillet_home().join("sources")
}

/// Default extracted-size ceiling for archives (50 MB).
pub const DEFAULT_SIZE_CEILING: u64 = 50 * 1024 * 1024;

/// Current lock file schema version.
pub const LOCK_SCHEMA_VERSION: u32 = 1;

/// File name of the content manifest embedded in every archive.
pub const CONTENT_MANIFEST: &str = "MANIFEST.json";

/// File name of the package manifest.
pub const MANIFEST_FILE: &str = "skillet.toml";
