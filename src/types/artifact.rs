use serde::{Deserialize, Serialize};

/// The kind of an agent artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    /// A skill: a directory with a `SKILL.md` entry point.
    Skill,
    /// An agent definition file.
    Agent,
    /// A prompt template file.
    Prompt,
    /// A standing instruction file.
    Instruction,
}

impl ArtifactType {
    /// All artifact types, in canonical order.
    pub const ALL: [ArtifactType; 4] = [
        ArtifactType::Skill,
        ArtifactType::Agent,
        ArtifactType::Prompt,
        ArtifactType::Instruction,
    ];

    /// Singular name, as used in manifests and filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Skill => "skill",
            ArtifactType::Agent => "agent",
            ArtifactType::Prompt => "prompt",
            ArtifactType::Instruction => "instruction",
        }
    }

    /// Plural directory name, as used in deploy layouts and source scans.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ArtifactType::Skill => "skills",
            ArtifactType::Agent => "agents",
            ArtifactType::Prompt => "prompts",
            ArtifactType::Instruction => "instructions",
        }
    }
}

impl std::fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ArtifactType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skill" | "skills" => Ok(ArtifactType::Skill),
            "agent" | "agents" => Ok(ArtifactType::Agent),
            "prompt" | "prompts" => Ok(ArtifactType::Prompt),
            "instruction" | "instructions" => Ok(ArtifactType::Instruction),
            other => Err(format!("Unknown artifact type: {other}")),
        }
    }
}
