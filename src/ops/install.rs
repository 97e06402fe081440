//! Install transaction.
//!
//! Per package: stage into a fresh temp directory under the workspace,
//! obtain bytes (registry archive, verified and safely extracted; or files
//! copied from a source cache with a synthesized manifest), hash the staged
//! tree, commit with an atomic rename (moving any previous version aside as
//! an implicit backup), deploy through the platform adapter, and record the
//! lock entry as the very last step. Obtaining and hashing run in parallel
//! across packages; commits are serialized under the workspace lock.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::adapter::{DeployRef, PlatformAdapter};
use crate::core::config::Config;
use crate::core::lockfile::{FileChecksums, LockFile, LockedPackage};
use crate::core::manifest::{ArtifactRef, Artifacts, PackageManifest, Provenance};
use crate::core::resolver::ResolvedPackage;
use crate::io::{archive, copy_dir_all, hashing};
use crate::ops::{OpError, Workspace, WorkspaceLock, fs_name};
use crate::registry;
use crate::source::{SourceState, VirtualPackage};
use crate::types::{PackageName, Version};
use crate::ui::Reporter;
use crate::MANIFEST_FILE;

/// What to install: a resolved registry package or a source artifact.
#[derive(Debug, Clone)]
pub enum InstallTarget {
    Registry(ResolvedPackage),
    Source(VirtualPackage),
}

impl InstallTarget {
    /// Name the package will be locked under.
    pub fn lock_name(&self) -> String {
        match self {
            InstallTarget::Registry(p) => p.name.to_string(),
            InstallTarget::Source(p) => p.name.clone(),
        }
    }
}

/// How one package's install concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed { name: String, version: Version },
    AlreadyInstalled { name: String, version: Version },
}

/// Install a set of targets into the workspace.
///
/// Obtain/hash phases run concurrently; commit/deploy/record run in target
/// order. The whole operation holds the workspace lock.
pub async fn install(
    workspace: &Workspace,
    config: &Config,
    targets: Vec<InstallTarget>,
    adapter: &dyn PlatformAdapter,
    reporter: &dyn Reporter,
    force: bool,
) -> Result<Vec<InstallOutcome>, OpError> {
    let _guard = WorkspaceLock::acquire(&workspace.state_dir())?;
    run(workspace, config, targets, adapter, reporter, force).await
}

/// Install body, for callers that already hold the workspace lock.
pub(crate) async fn run(
    workspace: &Workspace,
    config: &Config,
    targets: Vec<InstallTarget>,
    adapter: &dyn PlatformAdapter,
    reporter: &dyn Reporter,
    force: bool,
) -> Result<Vec<InstallOutcome>, OpError> {
    let mut lock = LockFile::load(&workspace.lock_path())?;

    // Skip targets already installed at the same version unless forced.
    let mut pending = Vec::new();
    let mut outcomes = Vec::new();
    for target in targets {
        let name = target.lock_name();
        let version = target_version(&target);
        let installed_same = lock
            .get(&name)
            .is_some_and(|p| p.version == version && workspace.package_dir(&name).exists());
        if installed_same && !force {
            reporter.warning(&format!("'{name}' {version} is already installed"));
            outcomes.push(InstallOutcome::AlreadyInstalled { name, version });
        } else {
            pending.push(target);
        }
    }

    // Phase 1: stage + obtain + hash, concurrently. Each task works in its
    // own temp directory; failures are collected per package.
    fs::create_dir_all(workspace.staging_dir())?;
    let mut set = tokio::task::JoinSet::new();
    for (position, target) in pending.into_iter().enumerate() {
        let workspace = workspace.clone();
        let config = config.clone();
        set.spawn_blocking(move || {
            let staged = prepare(&workspace, &config, &target)?;
            Ok::<_, OpError>((position, staged))
        });
    }

    let mut staged: Vec<(usize, StagedPackage)> = Vec::new();
    let mut first_error: Option<OpError> = None;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(item)) => staged.push(item),
            Ok(Err(err)) => {
                reporter.error(&format!("staging failed: {err}"));
                first_error.get_or_insert(err);
            }
            Err(join_err) => {
                first_error.get_or_insert(OpError::Other(join_err.to_string()));
            }
        }
    }

    // Any staging failure aborts before anything observable changed; the
    // dropped TempDirs clean their staging remnants.
    if let Some(err) = first_error {
        return Err(err);
    }
    staged.sort_by_key(|(position, _)| *position);

    // Phase 2: commit + deploy + record, in order, one transaction each.
    for (_, package) in staged {
        let name = PackageName::new(&package.name);
        reporter.working("installing", &name, &package.version);
        commit_one(workspace, &package, adapter, &mut lock)?;
        reporter.done("installed", &name, &package.version);
        outcomes.push(InstallOutcome::Installed {
            name: package.name.clone(),
            version: package.version.clone(),
        });
    }

    Ok(outcomes)
}

fn target_version(target: &InstallTarget) -> Version {
    match target {
        InstallTarget::Registry(p) => p.version.clone(),
        InstallTarget::Source(p) => Version::new(&source_version(&p.commit)),
    }
}

/// Placeholder version for source installs; a git history has no semver.
fn source_version(commit: &str) -> String {
    let short = &commit[..commit.len().min(12)];
    format!("0.0.0-git.{short}")
}

/// A fully staged package, ready to commit.
struct StagedPackage {
    name: String,
    version: Version,
    manifest: PackageManifest,
    /// Keeps the staging directory alive; dropped on failure, consumed by
    /// the commit rename on success.
    staging: TempDir,
    /// The staged tree inside `staging`.
    tree: PathBuf,
    checksum: String,
    files: BTreeMap<String, String>,
    install_source: String,
    source_name: Option<String>,
    source_commit: Option<String>,
}

/// Stage and obtain one target. Runs on a blocking thread.
fn prepare(
    workspace: &Workspace,
    config: &Config,
    target: &InstallTarget,
) -> Result<StagedPackage, OpError> {
    let staging = tempfile::Builder::new()
        .prefix(&format!("install-{}-", fs_name(&target.lock_name())))
        .tempdir_in(workspace.staging_dir())?;
    let tree = staging.path().join("pkg");
    fs::create_dir_all(&tree)?;

    match target {
        InstallTarget::Registry(resolved) => {
            prepare_registry(config, resolved, staging, tree)
        }
        InstallTarget::Source(virtual_pkg) => {
            prepare_source(config, virtual_pkg, staging, tree)
        }
    }
}

fn prepare_registry(
    config: &Config,
    resolved: &ResolvedPackage,
    staging: TempDir,
    tree: PathBuf,
) -> Result<StagedPackage, OpError> {
    let source = config
        .registry(&resolved.registry)
        .ok_or_else(|| OpError::Validation(format!("registry '{}' not configured", resolved.registry)))?;
    let registry = registry::open(source)?;

    // Download verifies the archive checksum before returning. A policy
    // that disables enforcement downgrades a mismatch to a warning.
    let download_dir = staging.path().join("download");
    let archive_path = match registry.download(&resolved.name, &resolved.version, &download_dir) {
        Ok(path) => path,
        Err(err @ crate::registry::RegistryError::ChecksumMismatch { .. })
            if !config.security.verify_checksums =>
        {
            tracing::warn!(package = %resolved.name, "{err}; checksum enforcement disabled");
            registry.download_unverified(&resolved.name, &resolved.version, &download_dir)?
        }
        Err(err) => return Err(err.into()),
    };

    archive::unpack_archive(&archive_path, &tree, config.security.max_archive_bytes)?;

    let manifest_path = tree.join(MANIFEST_FILE);
    if !manifest_path.is_file() {
        return Err(OpError::Validation(format!(
            "archive for '{}' contains no {MANIFEST_FILE}",
            resolved.name
        )));
    }
    let manifest = PackageManifest::load(&manifest_path)?;

    let files = hashing::hash_tree(&tree)?;
    Ok(StagedPackage {
        name: resolved.name.to_string(),
        version: resolved.version.clone(),
        manifest,
        staging,
        tree,
        checksum: resolved.checksum.clone(),
        files,
        install_source: resolved.registry.clone(),
        source_name: None,
        source_commit: None,
    })
}

fn prepare_source(
    config: &Config,
    package: &VirtualPackage,
    staging: TempDir,
    tree: PathBuf,
) -> Result<StagedPackage, OpError> {
    let artifact_source = package.absolute_path();
    let relative = format!("{}/{}", package.kind.dir_name(), artifact_file_name(package));
    let dest = tree.join(&relative);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    if artifact_source.is_dir() {
        copy_dir_all(&artifact_source, &dest)?;
    } else if artifact_source.is_file() {
        fs::copy(&artifact_source, &dest)?;
    } else {
        return Err(OpError::Validation(format!(
            "artifact path missing from source cache: {}",
            artifact_source.display()
        )));
    }

    // The vendor companion travels with its artifact.
    if let Some(vendor) = &package.vendor_file {
        if artifact_source.is_file() {
            let vendor_name = vendor
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "vendor.json".to_string());
            fs::copy(vendor, dest.parent().unwrap_or(&tree).join(vendor_name))?;
        }
        // Directory artifacts already carried their vendor.json in the copy.
    }

    let entry = config
        .source(&package.source)
        .ok_or_else(|| OpError::Validation(format!("source '{}' not configured", package.source)))?;
    let fetched_at = SourceState::load(&package.cache_dir)
        .map(|s| s.fetched_at)
        .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());

    // Synthesize a manifest with provenance; a checkout has none of its own.
    let version = Version::new(&source_version(&package.commit));
    let mut artifacts = Artifacts::default();
    artifacts.of_type_mut(package.kind).push(ArtifactRef {
        name: package.name.clone(),
        path: relative,
        description: package.description.clone(),
    });
    let manifest = PackageManifest {
        name: PackageName::new(&package.name),
        version: version.clone(),
        description: package.description.clone(),
        keywords: Vec::new(),
        artifacts,
        dependencies: BTreeMap::new(),
        platforms: BTreeMap::new(),
        quality: None,
        provenance: Some(Provenance {
            kind: "git".into(),
            url: entry.url.clone(),
            reference: entry.reference.clone(),
            subpath: entry.subpath.clone(),
            commit: package.commit.clone(),
            fetched_at,
        }),
    };
    manifest.save(&tree.join(MANIFEST_FILE))?;

    let files = hashing::hash_tree(&tree)?;
    let checksum = tree_checksum(&files);
    Ok(StagedPackage {
        name: package.name.clone(),
        version,
        manifest,
        staging,
        tree,
        checksum,
        files,
        install_source: package.source.clone(),
        source_name: Some(package.source.clone()),
        source_commit: Some(package.commit.clone()),
    })
}

fn artifact_file_name(package: &VirtualPackage) -> String {
    Path::new(&package.path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| package.name.clone())
}

/// Archive-level checksum for a source install: the digest of the staged
/// tree's content manifest.
fn tree_checksum(files: &BTreeMap<String, String>) -> String {
    let serialized = serde_json::to_vec(files).expect("checksum map serialization cannot fail");
    hashing::sha256_bytes(&serialized).to_string()
}

/// Commit one staged package: atomic rename, retained copy, deploy,
/// record. Any failure after the rename restores the previous version, so
/// a working install is never left broken.
fn commit_one(
    workspace: &Workspace,
    package: &StagedPackage,
    adapter: &dyn PlatformAdapter,
    lock: &mut LockFile,
) -> Result<(), OpError> {
    let final_dir = workspace.package_dir(&package.name);
    fs::create_dir_all(workspace.packages_dir())?;

    // Move any previous version aside rather than deleting it; it is the
    // rollback point until the lock entry is written.
    let previous = workspace
        .packages_dir()
        .join(format!(".prev-{}", fs_name(&package.name)));
    if previous.exists() {
        fs::remove_dir_all(&previous)?;
    }
    let had_previous = final_dir.exists();
    if had_previous {
        fs::rename(&final_dir, &previous)?;
    }

    // Staging lives under .skillet on the same volume, so this rename is
    // atomic.
    if let Err(err) = fs::rename(&package.tree, &final_dir) {
        if had_previous {
            let _ = fs::rename(&previous, &final_dir);
        }
        return Err(err.into());
    }

    let result = deploy_and_record(workspace, package, adapter, lock, &final_dir);
    match result {
        Ok(()) => {
            if had_previous {
                let _ = fs::remove_dir_all(&previous);
            }
            Ok(())
        }
        Err(err) => {
            // Restore the previously working install.
            let _ = fs::remove_dir_all(&final_dir);
            if had_previous {
                let _ = fs::rename(&previous, &final_dir);
            }
            Err(err)
        }
    }
}

fn deploy_and_record(
    workspace: &Workspace,
    package: &StagedPackage,
    adapter: &dyn PlatformAdapter,
    lock: &mut LockFile,
    final_dir: &Path,
) -> Result<(), OpError> {
    // Retain a pristine copy so diff keeps working after local edits.
    let retained = workspace.retained_dir(&package.name, &package.version);
    if retained.exists() {
        fs::remove_dir_all(&retained)?;
    }
    copy_dir_all(final_dir, &retained)?;

    for (kind, artifact) in package.manifest.artifacts.iter() {
        adapter.deploy(
            &DeployRef {
                kind,
                name: artifact.name.clone(),
                source: final_dir.join(&artifact.path),
            },
            workspace.root(),
        )?;
    }

    // The lock write is the last step; everything before it is invisible
    // to "what is installed".
    lock.upsert(
        &package.name,
        LockedPackage {
            version: package.version.clone(),
            source: package.install_source.clone(),
            checksum: package.checksum.clone(),
            dependencies: package
                .manifest
                .dependencies
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            files: Some(FileChecksums::sha256(package.files.clone())),
            source_name: package.source_name.clone(),
            source_commit: package.source_commit.clone(),
        },
    );
    lock.save(&workspace.lock_path())?;
    Ok(())
}
