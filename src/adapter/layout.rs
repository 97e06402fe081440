//! Directory-layout adapter.
//!
//! Deploys artifacts into `<project_root>/<base>/<type-plural>/<name>`,
//! copying skill directories wholesale and single-file artifacts as
//! `<name>.md`. Re-deploying overwrites in place with identical content, so
//! the operation is idempotent.

use std::fs;
use std::path::{Path, PathBuf};

use crate::adapter::{AdapterError, DeployRef, DeployedRef, PlatformAdapter};
use crate::io::copy_dir_all;
use crate::types::ArtifactType;

/// Default base directory for deployed artifacts.
pub const DEFAULT_BASE: &str = ".agents";

/// Adapter that lays artifacts out in per-type directories.
#[derive(Debug, Clone)]
pub struct DirLayoutAdapter {
    base: String,
}

impl DirLayoutAdapter {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    fn target_for(&self, artifact: &DeployRef, project_root: &Path) -> PathBuf {
        let dir = project_root.join(&self.base).join(artifact.kind.dir_name());
        if artifact.kind == ArtifactType::Skill {
            dir.join(&artifact.name)
        } else {
            dir.join(format!("{}.md", artifact.name))
        }
    }

    fn deploy_any(&self, artifact: &DeployRef, project_root: &Path) -> Result<(), AdapterError> {
        let target = self.target_for(artifact, project_root);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        if artifact.source.is_dir() {
            if target.exists() {
                fs::remove_dir_all(&target)?;
            }
            copy_dir_all(&artifact.source, &target)?;
        } else if artifact.source.is_file() {
            fs::copy(&artifact.source, &target)?;
        } else {
            return Err(AdapterError::Deploy {
                artifact: artifact.name.clone(),
                reason: format!("source missing: {}", artifact.source.display()),
            });
        }

        tracing::debug!(name = %artifact.name, kind = %artifact.kind, "deployed");
        Ok(())
    }
}

impl Default for DirLayoutAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_BASE)
    }
}

impl PlatformAdapter for DirLayoutAdapter {
    fn deploy_skill(&self, artifact: &DeployRef, project_root: &Path) -> Result<(), AdapterError> {
        self.deploy_any(artifact, project_root)
    }

    fn deploy_agent(&self, artifact: &DeployRef, project_root: &Path) -> Result<(), AdapterError> {
        self.deploy_any(artifact, project_root)
    }

    fn deploy_prompt(&self, artifact: &DeployRef, project_root: &Path) -> Result<(), AdapterError> {
        self.deploy_any(artifact, project_root)
    }

    fn deploy_instruction(
        &self,
        artifact: &DeployRef,
        project_root: &Path,
    ) -> Result<(), AdapterError> {
        self.deploy_any(artifact, project_root)
    }

    fn undeploy(&self, artifact: &DeployRef, project_root: &Path) -> Result<(), AdapterError> {
        let target = self.target_for(artifact, project_root);
        if target.is_dir() {
            fs::remove_dir_all(&target)?;
        } else if target.is_file() {
            fs::remove_file(&target)?;
        }
        // Absent target: never deployed, nothing to do.
        Ok(())
    }

    fn list_deployed(&self, project_root: &Path) -> Result<Vec<DeployedRef>, AdapterError> {
        let mut deployed = Vec::new();
        for kind in ArtifactType::ALL {
            let dir = project_root.join(&self.base).join(kind.dir_name());
            if !dir.exists() {
                continue;
            }
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                deployed.push(DeployedRef { kind, name, path });
            }
        }
        Ok(deployed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn skill_ref(source: &Path) -> DeployRef {
        DeployRef {
            kind: ArtifactType::Skill,
            name: "code-review".into(),
            source: source.to_path_buf(),
        }
    }

    #[test]
    fn test_deploy_skill_dir_and_list() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("pkg/skills/code-review");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("SKILL.md"), "# Review").unwrap();

        let project = dir.path().join("project");
        let adapter = DirLayoutAdapter::default();
        adapter.deploy(&skill_ref(&source), &project).unwrap();

        assert!(project.join(".agents/skills/code-review/SKILL.md").exists());
        let listed = adapter.list_deployed(&project).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "code-review");
    }

    #[test]
    fn test_deploy_is_idempotent() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("pkg/skills/code-review");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("SKILL.md"), "# Review").unwrap();

        let project = dir.path().join("project");
        let adapter = DirLayoutAdapter::default();
        adapter.deploy(&skill_ref(&source), &project).unwrap();
        adapter.deploy(&skill_ref(&source), &project).unwrap();

        let target = project.join(".agents/skills/code-review");
        assert_eq!(fs::read_to_string(target.join("SKILL.md")).unwrap(), "# Review");
        assert_eq!(adapter.list_deployed(&project).unwrap().len(), 1);
    }

    #[test]
    fn test_undeploy_never_deployed_is_noop() {
        let dir = tempdir().unwrap();
        let adapter = DirLayoutAdapter::default();
        let artifact = DeployRef {
            kind: ArtifactType::Prompt,
            name: "ghost".into(),
            source: dir.path().join("nowhere.md"),
        };
        adapter.undeploy(&artifact, dir.path()).unwrap();
    }

    #[test]
    fn test_file_artifact_deploys_as_named_md() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("pkg/prompts/triage.md");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, "# Triage").unwrap();

        let project = dir.path().join("project");
        let adapter = DirLayoutAdapter::default();
        adapter
            .deploy(
                &DeployRef {
                    kind: ArtifactType::Prompt,
                    name: "triage".into(),
                    source,
                },
                &project,
            )
            .unwrap();

        assert!(project.join(".agents/prompts/triage.md").exists());
    }
}
