//! Registry abstraction: filesystem-backed package stores.
//!
//! Only `local` registries are implemented. Opening a registry configured
//! with any other backend type fails with a clear error rather than being
//! silently ignored.

pub mod index;
pub mod local;

pub use index::{IndexEntry, RegistryIndex};
pub use local::LocalRegistry;

use thiserror::Error;

use crate::core::config::{RegistryKind, RegistrySource};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported registry type '{kind}' for registry '{name}': only 'local' is implemented")]
    Unsupported { name: String, kind: String },

    #[error("Package '{0}' not found in registry")]
    PackageNotFound(String),

    #[error("Version '{version}' of '{name}' not found in registry")]
    VersionNotFound { name: String, version: String },

    #[error("Checksum mismatch for {name}@{version}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        name: String,
        version: String,
        expected: String,
        actual: String,
    },

    #[error("Version {version} of '{name}' already published; pass overwrite to replace it")]
    DuplicateVersion { name: String, version: String },

    #[error("Malformed registry document {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error("Manifest error: {0}")]
    Manifest(#[from] crate::core::manifest::ManifestError),
}

/// Open a configured registry, rejecting unimplemented backend types.
pub fn open(source: &RegistrySource) -> Result<LocalRegistry, RegistryError> {
    match source.kind {
        RegistryKind::Local => Ok(LocalRegistry::new(&source.name, source.url.as_ref())),
        other => Err(RegistryError::Unsupported {
            name: source.name.clone(),
            kind: other.to_string(),
        }),
    }
}

/// Open every configured registry in order, failing on the first
/// unsupported entry.
pub fn open_all(sources: &[RegistrySource]) -> Result<Vec<LocalRegistry>, RegistryError> {
    sources.iter().map(open).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_kind_rejected() {
        let source = RegistrySource {
            name: "remote".into(),
            url: "https://example.com".into(),
            kind: RegistryKind::Http,
            default: false,
        };
        let err = open(&source).unwrap_err();
        assert!(err.to_string().contains("Unsupported registry type"));
    }
}
