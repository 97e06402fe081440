//! Package manifest (`skillet.toml`): the authoring-time description of a
//! package and its artifacts.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ArtifactType, PackageName, Version};

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid manifest: {0}")]
    Invalid(String),
}

/// A single artifact declared by a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Artifact name, unique within its type.
    pub name: String,
    /// Path relative to the package root.
    pub path: String,
    /// Short description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Artifacts grouped by type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artifacts {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<ArtifactRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agents: Vec<ArtifactRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prompts: Vec<ArtifactRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instructions: Vec<ArtifactRef>,
}

impl Artifacts {
    /// Iterate over all artifacts with their type.
    pub fn iter(&self) -> impl Iterator<Item = (ArtifactType, &ArtifactRef)> {
        self.skills
            .iter()
            .map(|a| (ArtifactType::Skill, a))
            .chain(self.agents.iter().map(|a| (ArtifactType::Agent, a)))
            .chain(self.prompts.iter().map(|a| (ArtifactType::Prompt, a)))
            .chain(
                self.instructions
                    .iter()
                    .map(|a| (ArtifactType::Instruction, a)),
            )
    }

    /// Total artifact count.
    pub fn len(&self) -> usize {
        self.skills.len() + self.agents.len() + self.prompts.len() + self.instructions.len()
    }

    /// True when no artifact is declared.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutable list for one artifact type.
    pub fn of_type_mut(&mut self, kind: ArtifactType) -> &mut Vec<ArtifactRef> {
        match kind {
            ArtifactType::Skill => &mut self.skills,
            ArtifactType::Agent => &mut self.agents,
            ArtifactType::Prompt => &mut self.prompts,
            ArtifactType::Instruction => &mut self.instructions,
        }
    }
}

/// Where a source-installed package came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Source kind; currently always "git".
    pub kind: String,
    /// Clone URL of the origin repository.
    pub url: String,
    /// Ref that was fetched (branch or tag).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Subpath within the repository, if the source is scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subpath: Option<String>,
    /// Full commit SHA the artifact was copied from.
    pub commit: String,
    /// When the source cache was last fetched (RFC 3339).
    pub fetched_at: String,
}

/// Optional quality metadata attached by authors or curation tooling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
}

/// The package manifest: `skillet.toml` at the package root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// Package name, optionally scoped (`@scope/name`).
    pub name: PackageName,
    /// Semantic version.
    pub version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub artifacts: Artifacts,
    /// Dependency name to version constraint string.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    /// Per-platform configuration, keyed by platform name. Opaque to the
    /// core; interpreted by platform adapters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub platforms: BTreeMap<String, toml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityMetadata>,
    /// Present when the package originated from a remote source rather than
    /// being authored directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl PackageManifest {
    /// Load and validate a manifest from a `skillet.toml` file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path)?;
        let manifest: Self = toml::from_str(&content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Serialize to TOML and write to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Enforce the manifest invariants: at least one artifact, all artifact
    /// paths relative and confined to the package root.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.artifacts.is_empty() {
            return Err(ManifestError::Invalid(format!(
                "package '{}' declares no artifacts",
                self.name
            )));
        }

        for (kind, artifact) in self.artifacts.iter() {
            let path = Path::new(&artifact.path);
            if path.is_absolute() {
                return Err(ManifestError::Invalid(format!(
                    "{kind} '{}' has an absolute path: {}",
                    artifact.name, artifact.path
                )));
            }
            if path
                .components()
                .any(|c| matches!(c, Component::ParentDir))
            {
                return Err(ManifestError::Invalid(format!(
                    "{kind} '{}' path escapes the package root: {}",
                    artifact.name, artifact.path
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn minimal() -> PackageManifest {
        PackageManifest {
            name: PackageName::new("demo"),
            version: Version::new("1.0.0"),
            description: Some("demo package".into()),
            keywords: vec!["review".into()],
            artifacts: Artifacts {
                skills: vec![ArtifactRef {
                    name: "code-review".into(),
                    path: "skills/code-review".into(),
                    description: None,
                }],
                ..Artifacts::default()
            },
            dependencies: BTreeMap::new(),
            platforms: BTreeMap::new(),
            quality: None,
            provenance: None,
        }
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("skillet.toml");
        let manifest = minimal();
        manifest.save(&path).unwrap();

        let loaded = PackageManifest::load(&path).unwrap();
        assert_eq!(loaded, manifest);
    }

    #[test]
    fn test_no_artifacts_rejected() {
        let mut manifest = minimal();
        manifest.artifacts = Artifacts::default();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_escaping_path_rejected() {
        let mut manifest = minimal();
        manifest.artifacts.skills[0].path = "../outside".into();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_absolute_path_rejected() {
        let mut manifest = minimal();
        manifest.artifacts.skills[0].path = "/etc/skills".into();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_iter_covers_all_types() {
        let mut manifest = minimal();
        manifest.artifacts.prompts.push(ArtifactRef {
            name: "triage".into(),
            path: "prompts/triage.md".into(),
            description: None,
        });
        let kinds: Vec<ArtifactType> = manifest.artifacts.iter().map(|(k, _)| k).collect();
        assert_eq!(kinds, vec![ArtifactType::Skill, ArtifactType::Prompt]);
    }
}
