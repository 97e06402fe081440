//! Platform adapter: deploys installed artifacts into tool directories.
//!
//! The core treats target-tool specifics (file-format conversion, editor
//! config syntax) as an external concern behind this trait. The bundled
//! [`DirLayoutAdapter`] deploys artifacts into per-type directories under
//! the project root, which is both the default layout and the fixture
//! adapter for tests.
//!
//! Contract: deploy is idempotent; undeploy of a never-deployed artifact is
//! a no-op, not an error.

pub mod layout;

pub use layout::DirLayoutAdapter;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::ArtifactType;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Deploy failed for {artifact}: {reason}")]
    Deploy { artifact: String, reason: String },
}

/// A deployable artifact: its type, name, and installed location.
#[derive(Debug, Clone)]
pub struct DeployRef {
    pub kind: ArtifactType,
    pub name: String,
    /// Absolute path of the artifact within the installed package tree.
    pub source: PathBuf,
}

/// A deployed artifact as discovered in a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedRef {
    pub kind: ArtifactType,
    pub name: String,
    pub path: PathBuf,
}

pub trait PlatformAdapter: Send + Sync {
    /// Deploy a skill directory.
    fn deploy_skill(&self, artifact: &DeployRef, project_root: &Path) -> Result<(), AdapterError>;

    /// Deploy an agent definition.
    fn deploy_agent(&self, artifact: &DeployRef, project_root: &Path) -> Result<(), AdapterError>;

    /// Deploy a prompt template.
    fn deploy_prompt(&self, artifact: &DeployRef, project_root: &Path) -> Result<(), AdapterError>;

    /// Deploy a standing instruction.
    fn deploy_instruction(
        &self,
        artifact: &DeployRef,
        project_root: &Path,
    ) -> Result<(), AdapterError>;

    /// Remove a deployed artifact. Must be a no-op when nothing was
    /// deployed.
    fn undeploy(&self, artifact: &DeployRef, project_root: &Path) -> Result<(), AdapterError>;

    /// Enumerate artifacts currently deployed under `project_root`.
    fn list_deployed(&self, project_root: &Path) -> Result<Vec<DeployedRef>, AdapterError>;

    /// Dispatch on artifact type.
    fn deploy(&self, artifact: &DeployRef, project_root: &Path) -> Result<(), AdapterError> {
        match artifact.kind {
            ArtifactType::Skill => self.deploy_skill(artifact, project_root),
            ArtifactType::Agent => self.deploy_agent(artifact, project_root),
            ArtifactType::Prompt => self.deploy_prompt(artifact, project_root),
            ArtifactType::Instruction => self.deploy_instruction(artifact, project_root),
        }
    }
}
