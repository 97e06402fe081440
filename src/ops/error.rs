//! Domain-specific errors for package operations.

use thiserror::Error;

use crate::adapter::AdapterError;
use crate::core::integrity::IntegrityError;
use crate::core::lockfile::LockError;
use crate::core::manifest::ManifestError;
use crate::core::resolver::ResolveError;
use crate::io::archive::ArchiveError;
use crate::registry::RegistryError;
use crate::source::SourceError;
use crate::source::index::LookupError;

#[derive(Error, Debug)]
pub enum OpError {
    #[error("Package '{0}' is not installed")]
    NotInstalled(String),

    #[error("Failed to resolve dependencies: {0}")]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Lock file error: {0}")]
    Lock(#[from] LockError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("Deploy failed: {0}")]
    Deploy(#[from] AdapterError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for OpError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
