//! Artifact discovery in cached checkouts.
//!
//! A scan walks a source's checkout and emits one [`VirtualPackage`] per
//! recognized artifact:
//!
//! - a directory containing `SKILL.md` is a skill;
//! - a `.md` file inside an `agents/`, `prompts/`, or `instructions/`
//!   directory (dot-prefixed variants included) is an agent, prompt, or
//!   instruction.
//!
//! A `vendor.json` inside a skill directory, or `<stem>.vendor.json` next
//! to a file artifact, is companion metadata: it is attached to the
//! artifact and never surfaced as its own installable unit. Only text files
//! are opened; nothing in a checkout is ever executed.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::config::SourceEntry;
use crate::source::{SourceError, read_head_commit};
use crate::types::ArtifactType;

/// An installable artifact discovered in a source checkout. In-memory
/// only; rebuilt on demand since scanning is cheap relative to fetching.
#[derive(Debug, Clone)]
pub struct VirtualPackage {
    /// Unqualified artifact name; may collide across sources.
    pub name: String,
    /// `source-name/artifact-name`; globally unique.
    pub qualified_name: String,
    /// Owning source.
    pub source: String,
    pub kind: ArtifactType,
    /// Path relative to the source's scan root.
    pub path: String,
    /// HEAD commit of the checkout at scan time.
    pub commit: String,
    /// Absolute cache directory the artifact lives under.
    pub cache_dir: PathBuf,
    pub description: Option<String>,
    /// Companion vendor metadata file (absolute), when present.
    pub vendor_file: Option<PathBuf>,
}

impl VirtualPackage {
    /// Absolute path of the artifact within the checkout.
    pub fn absolute_path(&self) -> PathBuf {
        self.cache_dir.join(&self.path)
    }
}

/// Scan one source's cached checkout.
pub fn scan_source(entry: &SourceEntry, home: &Path) -> Result<Vec<VirtualPackage>, SourceError> {
    let cache_dir = entry.cache_dir(home);
    let scan_root = entry.scan_root(home);
    if !scan_root.is_dir() {
        return Err(SourceError::CacheMissing {
            name: entry.name.clone(),
            path: scan_root.display().to_string(),
        });
    }

    let commit = read_head_commit(&cache_dir).unwrap_or_else(|| "unknown".to_string());
    let mut packages = Vec::new();

    let mut walker = WalkDir::new(&scan_root).into_iter();
    while let Some(next) = walker.next() {
        let entry_info = next.map_err(|e| SourceError::Io(std::io::Error::other(e)))?;
        let path = entry_info.path();

        if entry_info.file_type().is_dir() {
            if path.file_name().is_some_and(|n| n == ".git") {
                walker.skip_current_dir();
                continue;
            }
            if path.join("SKILL.md").is_file() {
                packages.push(skill_package(entry, &scan_root, &cache_dir, path, &commit));
                walker.skip_current_dir();
            }
            continue;
        }

        if !entry_info.file_type().is_file() {
            continue;
        }
        if path.extension().is_none_or(|e| e != "md") {
            continue;
        }

        let Some(kind) = category_of(path, &scan_root) else {
            continue;
        };
        packages.push(file_package(
            entry, &scan_root, &cache_dir, path, kind, &commit,
        ));
    }

    packages.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
    tracing::debug!(source = %entry.name, count = packages.len(), "scanned source");
    Ok(packages)
}

/// Determine the artifact type of a file from its nearest category
/// directory. Dot-prefixed directory names count: `.agents` is `agents`.
fn category_of(path: &Path, scan_root: &Path) -> Option<ArtifactType> {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == scan_root.parent().unwrap_or(scan_root) {
            break;
        }
        if let Some(name) = dir.file_name() {
            let name = name.to_string_lossy();
            let trimmed = name.trim_start_matches('.');
            match trimmed {
                "agents" => return Some(ArtifactType::Agent),
                "prompts" => return Some(ArtifactType::Prompt),
                "instructions" => return Some(ArtifactType::Instruction),
                // A plain .md inside a skills dir is not a skill; skills
                // are directories with SKILL.md.
                _ => {}
            }
        }
        if dir == scan_root {
            break;
        }
        current = dir.parent();
    }
    None
}

fn skill_package(
    entry: &SourceEntry,
    scan_root: &Path,
    cache_dir: &Path,
    dir: &Path,
    commit: &str,
) -> VirtualPackage {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let vendor = dir.join("vendor.json");
    VirtualPackage {
        qualified_name: format!("{}/{name}", entry.name),
        name,
        source: entry.name.clone(),
        kind: ArtifactType::Skill,
        path: relative_to(dir, scan_root),
        commit: commit.to_string(),
        cache_dir: cache_dir.to_path_buf(),
        description: extract_description(&dir.join("SKILL.md")),
        vendor_file: vendor.is_file().then_some(vendor),
    }
}

fn file_package(
    entry: &SourceEntry,
    scan_root: &Path,
    cache_dir: &Path,
    file: &Path,
    kind: ArtifactType,
    commit: &str,
) -> VirtualPackage {
    let name = file
        .file_stem()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let vendor = file.with_extension("vendor.json");
    VirtualPackage {
        qualified_name: format!("{}/{name}", entry.name),
        name,
        source: entry.name.clone(),
        kind,
        path: relative_to(file, scan_root),
        commit: commit.to_string(),
        cache_dir: cache_dir.to_path_buf(),
        description: extract_description(file),
        vendor_file: vendor.is_file().then_some(vendor),
    }
}

fn relative_to(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Pull a short description out of a markdown artifact: a frontmatter
/// `description:` field, or the text after the first heading.
fn extract_description(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    for line in content.lines().take(30) {
        if let Some(rest) = line.strip_prefix("description:") {
            let rest = rest.trim().trim_matches('"');
            if !rest.is_empty() {
                return Some(rest.to_string());
            }
        }
    }
    for line in content.lines() {
        if let Some(heading) = line.strip_prefix('#') {
            let heading = heading.trim_start_matches('#').trim();
            if !heading.is_empty() {
                return Some(heading.to_string());
            }
        }
    }
    None
}
