//! Local filesystem registry.
//!
//! Layout:
//!
//! ```text
//! <root>/
//! ├── index.json                          # search index
//! └── packages/<name>/
//!     ├── metadata.json                   # per-version metadata
//!     └── <version>/<name>-<version>.tar.gz
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::manifest::PackageManifest;
use crate::io::{atomic_write, hashing};
use crate::registry::RegistryError;
use crate::registry::index::{
    IndexEntry, PackageMetadata, RegistryIndex, REGISTRY_SCHEMA_VERSION, VersionMetadata,
};
use crate::types::{ArtifactType, Sha256Digest};

/// A filesystem-backed registry.
#[derive(Debug, Clone)]
pub struct LocalRegistry {
    name: String,
    root: PathBuf,
}

impl LocalRegistry {
    /// Create a handle; the directory need not exist until first publish.
    pub fn new(name: &str, root: &Path) -> Self {
        Self {
            name: name.to_string(),
            root: root.to_path_buf(),
        }
    }

    /// Registry name from configuration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registry root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("index.json")
    }

    fn package_dir(&self, name: &str) -> PathBuf {
        self.root.join("packages").join(name)
    }

    fn metadata_path(&self, name: &str) -> PathBuf {
        self.package_dir(name).join("metadata.json")
    }

    fn archive_path(&self, name: &str, version: &str) -> PathBuf {
        let file_name = format!("{}-{version}.tar.gz", name.replace('/', "_"));
        self.package_dir(name).join(version).join(file_name)
    }

    /// Load the search index. A registry with no index is empty.
    pub fn load_index(&self) -> Result<RegistryIndex, RegistryError> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(RegistryIndex::default());
        }
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| RegistryError::Malformed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Search the index by query and optional type filter.
    pub fn search(
        &self,
        query: &str,
        type_filter: Option<ArtifactType>,
    ) -> Result<Vec<IndexEntry>, RegistryError> {
        let index = self.load_index()?;
        Ok(index
            .search(query, type_filter)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Fetch the metadata document for a package.
    pub fn get_metadata(&self, name: &str) -> Result<PackageMetadata, RegistryError> {
        let path = self.metadata_path(name);
        if !path.exists() {
            return Err(RegistryError::PackageNotFound(name.to_string()));
        }
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| RegistryError::Malformed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Copy the archive for `name@version` into `dest_dir`, verifying its
    /// checksum against the metadata document before returning.
    pub fn download(
        &self,
        name: &str,
        version: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, RegistryError> {
        let metadata = self.get_metadata(name)?;
        let version_meta =
            metadata
                .versions
                .get(version)
                .ok_or_else(|| RegistryError::VersionNotFound {
                    name: name.to_string(),
                    version: version.to_string(),
                })?;

        let source = self.archive_path(name, version);
        if !source.exists() {
            return Err(RegistryError::VersionNotFound {
                name: name.to_string(),
                version: version.to_string(),
            });
        }

        fs::create_dir_all(dest_dir)?;
        let dest = dest_dir.join(source.file_name().expect("archive path has a file name"));
        fs::copy(&source, &dest)?;

        let actual = hashing::sha256_file(&dest)?;
        if actual.as_str() != version_meta.checksum {
            fs::remove_file(&dest).ok();
            return Err(RegistryError::ChecksumMismatch {
                name: name.to_string(),
                version: version.to_string(),
                expected: version_meta.checksum.clone(),
                actual: actual.to_string(),
            });
        }

        Ok(dest)
    }

    /// Copy an archive without checksum verification. Only for callers
    /// whose security policy explicitly disables enforcement; `download`
    /// is the normal path.
    pub fn download_unverified(
        &self,
        name: &str,
        version: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, RegistryError> {
        let source = self.archive_path(name, version);
        if !source.exists() {
            return Err(RegistryError::VersionNotFound {
                name: name.to_string(),
                version: version.to_string(),
            });
        }
        fs::create_dir_all(dest_dir)?;
        let dest = dest_dir.join(source.file_name().expect("archive path has a file name"));
        fs::copy(&source, &dest)?;
        Ok(dest)
    }

    /// Publish an archive under the manifest's name and version.
    ///
    /// Re-publishing an existing version fails unless `overwrite` is set.
    /// The search index rewrite is all-or-nothing: a crash mid-publish can
    /// leave a dangling archive but never a half-written index.
    pub fn publish(
        &self,
        manifest: &PackageManifest,
        archive: &Path,
        overwrite: bool,
    ) -> Result<Sha256Digest, RegistryError> {
        let name = manifest.name.as_str();
        let version = manifest.version.as_str();

        let mut metadata = match self.get_metadata(name) {
            Ok(m) => m,
            Err(RegistryError::PackageNotFound(_)) => PackageMetadata {
                version: REGISTRY_SCHEMA_VERSION,
                name: name.to_string(),
                description: String::new(),
                keywords: Vec::new(),
                kinds: Vec::new(),
                dist_tags: Default::default(),
                versions: Default::default(),
            },
            Err(e) => return Err(e),
        };

        if metadata.versions.contains_key(version) && !overwrite {
            return Err(RegistryError::DuplicateVersion {
                name: name.to_string(),
                version: version.to_string(),
            });
        }

        let checksum = hashing::sha256_file(archive)?;
        let size = fs::metadata(archive)?.len();

        // Write the archive into the version store first; the metadata and
        // index writes below are what make it visible.
        let dest = self.archive_path(name, version);
        fs::create_dir_all(dest.parent().expect("archive path has a parent"))?;
        fs::copy(archive, &dest)?;

        metadata.description = manifest.description.clone().unwrap_or_default();
        metadata.keywords = manifest.keywords.clone();
        metadata.kinds = kinds_of(manifest);
        metadata.versions.insert(
            version.to_string(),
            VersionMetadata {
                checksum: checksum.to_string(),
                size,
                dependencies: manifest.dependencies.clone(),
            },
        );
        let latest = metadata
            .latest()
            .map(ToString::to_string)
            .unwrap_or_else(|| version.to_string());
        let newest = pick_newer(&latest, version);
        metadata
            .dist_tags
            .insert("latest".to_string(), newest.clone());

        let metadata_json =
            serde_json::to_vec_pretty(&metadata).expect("metadata serialization cannot fail");
        atomic_write(&self.metadata_path(name), &metadata_json)?;

        let mut index = self.load_index()?;
        index.upsert(IndexEntry {
            name: name.to_string(),
            description: metadata.description.clone(),
            keywords: metadata.keywords.clone(),
            kinds: metadata.kinds.clone(),
            latest: newest,
            versions: metadata.versions.keys().cloned().collect(),
        });
        let index_json = serde_json::to_vec_pretty(&index).expect("index serialization cannot fail");
        atomic_write(&self.index_path(), &index_json)?;

        tracing::info!(registry = %self.name, package = name, version, "published");
        Ok(checksum)
    }
}

fn kinds_of(manifest: &PackageManifest) -> Vec<ArtifactType> {
    let mut kinds = Vec::new();
    for (kind, _) in manifest.artifacts.iter() {
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    kinds
}

fn pick_newer(a: &str, b: &str) -> String {
    match (semver::Version::parse(a), semver::Version::parse(b)) {
        (Ok(va), Ok(vb)) if vb > va => b.to_string(),
        (Ok(_), Ok(_)) => a.to_string(),
        _ => b.to_string(),
    }
}
