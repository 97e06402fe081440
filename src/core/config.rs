//! Configuration model and loader.
//!
//! Configuration is an explicit value passed into every entry point, never
//! process-wide state. Precedence: explicit overrides > project config
//! (`<project>/.skillet/config.toml`) > global config
//! (`~/.skillet/config.toml`) > built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::DEFAULT_SIZE_CEILING;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown {kind} '{name}'")]
    UnknownEntry { kind: &'static str, name: String },

    #[error("Duplicate {kind} '{name}'")]
    DuplicateEntry { kind: &'static str, name: String },
}

/// Registry backend type. Only `local` is implemented; configuring any
/// other type is rejected when the registry is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    #[default]
    Local,
    Http,
    Git,
}

impl std::fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryKind::Local => write!(f, "local"),
            RegistryKind::Http => write!(f, "http"),
            RegistryKind::Git => write!(f, "git"),
        }
    }
}

/// A configured registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySource {
    /// Unique registry name.
    pub name: String,
    /// Filesystem path (for `local` registries) or URL.
    pub url: String,
    #[serde(default, rename = "type")]
    pub kind: RegistryKind,
    #[serde(default)]
    pub default: bool,
}

/// A configured remote git source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Unique source name, conventionally `owner/repo` or
    /// `owner/repo:subpath`.
    pub name: String,
    /// Clone URL.
    pub url: String,
    /// Ref to fetch (branch or tag). Empty means the remote default branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Subpath scope within the repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subpath: Option<String>,
}

impl SourceEntry {
    /// Cache directory for this source's checkout, derived from the name.
    ///
    /// The `:subpath` suffix shares a checkout with its unscoped sibling.
    pub fn cache_dir(&self, home: &Path) -> PathBuf {
        let repo = self.name.split(':').next().unwrap_or(&self.name);
        let mut dir = home.join("sources");
        for part in repo.split('/') {
            dir.push(part);
        }
        dir
    }

    /// Root directory to scan: the cache dir plus any subpath scope.
    pub fn scan_root(&self, home: &Path) -> PathBuf {
        let mut root = self.cache_dir(home);
        if let Some(sub) = &self.subpath {
            root.push(sub);
        }
        root
    }
}

/// Security policy: how strictly to treat integrity data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    /// Verify archive checksums on download and install. On by default;
    /// turning this off downgrades mismatches to warnings.
    #[serde(default = "default_true")]
    pub verify_checksums: bool,
    /// Extracted-size ceiling for archives, in bytes.
    #[serde(default = "default_ceiling")]
    pub max_archive_bytes: u64,
}

fn default_true() -> bool {
    true
}

fn default_ceiling() -> u64 {
    DEFAULT_SIZE_CEILING
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            verify_checksums: true,
            max_archive_bytes: DEFAULT_SIZE_CEILING,
        }
    }
}

/// The on-disk configuration document. All fields optional so global and
/// project documents can each specify only what they override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    registries: Vec<RegistrySource>,
    #[serde(default)]
    sources: Vec<SourceEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    security: Option<SecurityPolicy>,
}

/// Resolved configuration passed into resolver, installer, and source index.
#[derive(Debug, Clone)]
pub struct Config {
    /// Ordered registries; order is resolution precedence.
    pub registries: Vec<RegistrySource>,
    /// Ordered sources; order breaks unqualified-name ties.
    pub sources: Vec<SourceEntry>,
    pub security: SecurityPolicy,
    /// Global state directory (`~/.skillet` unless overridden).
    pub home: PathBuf,
}

impl Config {
    /// Load configuration for a project, merging project over global.
    pub fn load(home: &Path, project_root: &Path) -> Result<Self, ConfigError> {
        let global = read_document(&home.join("config.toml"))?;
        let project = read_document(&project_config_path(project_root))?;

        // Project registries/sources come first: higher precedence.
        let mut registries = project.registries;
        for reg in global.registries {
            if !registries.iter().any(|r| r.name == reg.name) {
                registries.push(reg);
            }
        }
        let mut sources = project.sources;
        for src in global.sources {
            if !sources.iter().any(|s| s.name == src.name) {
                sources.push(src);
            }
        }

        Ok(Self {
            registries,
            sources,
            security: project.security.or(global.security).unwrap_or_default(),
            home: home.to_path_buf(),
        })
    }

    /// An empty configuration rooted at `home`, for tests and bootstrap.
    pub fn empty(home: &Path) -> Self {
        Self {
            registries: Vec::new(),
            sources: Vec::new(),
            security: SecurityPolicy::default(),
            home: home.to_path_buf(),
        }
    }

    /// Look up a source by name.
    pub fn source(&self, name: &str) -> Option<&SourceEntry> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Look up a registry by name.
    pub fn registry(&self, name: &str) -> Option<&RegistrySource> {
        self.registries.iter().find(|r| r.name == name)
    }
}

/// Mutation handle for the global configuration document, used by the
/// `registry add/remove` and `source add/remove` commands.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    document: ConfigDocument,
}

impl ConfigStore {
    /// Open the global configuration document for mutation.
    pub fn open_global(home: &Path) -> Result<Self, ConfigError> {
        let path = home.join("config.toml");
        let document = read_document(&path)?;
        Ok(Self { path, document })
    }

    /// Add a registry; duplicate names are rejected.
    pub fn add_registry(&mut self, registry: RegistrySource) -> Result<(), ConfigError> {
        if self.document.registries.iter().any(|r| r.name == registry.name) {
            return Err(ConfigError::DuplicateEntry {
                kind: "registry",
                name: registry.name,
            });
        }
        self.document.registries.push(registry);
        Ok(())
    }

    /// Remove a registry by name.
    pub fn remove_registry(&mut self, name: &str) -> Result<(), ConfigError> {
        let before = self.document.registries.len();
        self.document.registries.retain(|r| r.name != name);
        if self.document.registries.len() == before {
            return Err(ConfigError::UnknownEntry {
                kind: "registry",
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Add a source; duplicate names are rejected.
    pub fn add_source(&mut self, source: SourceEntry) -> Result<(), ConfigError> {
        if self.document.sources.iter().any(|s| s.name == source.name) {
            return Err(ConfigError::DuplicateEntry {
                kind: "source",
                name: source.name,
            });
        }
        self.document.sources.push(source);
        Ok(())
    }

    /// Remove a source by name.
    pub fn remove_source(&mut self, name: &str) -> Result<(), ConfigError> {
        let before = self.document.sources.len();
        self.document.sources.retain(|s| s.name != name);
        if self.document.sources.len() == before {
            return Err(ConfigError::UnknownEntry {
                kind: "source",
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Persist the document atomically.
    pub fn save(&self) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(&self.document)?;
        crate::io::atomic_write(&self.path, content.as_bytes())?;
        Ok(())
    }
}

/// Project-level configuration path.
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".skillet").join("config.toml")
}

fn read_document(path: &Path) -> Result<ConfigDocument, ConfigError> {
    if !path.exists() {
        return Ok(ConfigDocument::default());
    }
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}
