//! Registry search index and per-package metadata documents.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::ArtifactType;

/// Schema version of registry documents.
pub const REGISTRY_SCHEMA_VERSION: u32 = 1;

/// Cap on entries returned for an empty search query.
pub const SEARCH_CAP: usize = 200;

/// One package in the registry-wide search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Artifact types the latest version provides.
    #[serde(default)]
    pub kinds: Vec<ArtifactType>,
    /// Latest published version.
    pub latest: String,
    /// All published versions.
    #[serde(default)]
    pub versions: Vec<String>,
}

impl IndexEntry {
    /// Case-insensitive substring match over name, description, and
    /// keywords.
    pub fn matches(&self, query_lower: &str) -> bool {
        self.name.to_lowercase().contains(query_lower)
            || self.description.to_lowercase().contains(query_lower)
            || self
                .keywords
                .iter()
                .any(|k| k.to_lowercase().contains(query_lower))
    }
}

/// The registry-wide search index (`index.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryIndex {
    #[serde(default = "default_schema")]
    pub version: u32,
    #[serde(default)]
    pub entries: Vec<IndexEntry>,
}

fn default_schema() -> u32 {
    REGISTRY_SCHEMA_VERSION
}

impl RegistryIndex {
    /// Search entries by query and optional artifact-type filter. An empty
    /// query returns all entries, capped.
    pub fn search(&self, query: &str, type_filter: Option<ArtifactType>) -> Vec<&IndexEntry> {
        let query_lower = query.to_lowercase();
        self.entries
            .iter()
            .filter(|e| query_lower.is_empty() || e.matches(&query_lower))
            .filter(|e| type_filter.is_none_or(|t| e.kinds.contains(&t)))
            .take(SEARCH_CAP)
            .collect()
    }

    /// Insert or replace the entry for a package.
    pub fn upsert(&mut self, entry: IndexEntry) {
        self.entries.retain(|e| e.name != entry.name);
        self.entries.push(entry);
        self.entries.sort_by(|a, b| a.name.cmp(&b.name));
    }
}

/// Metadata for one published version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionMetadata {
    /// Hex SHA-256 of the version archive.
    pub checksum: String,
    /// Archive size in bytes.
    pub size: u64,
    /// Dependency name to constraint string.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

/// Per-package metadata document (`packages/<name>/metadata.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageMetadata {
    #[serde(default = "default_schema")]
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Artifact types provided, per the latest version's manifest.
    #[serde(default)]
    pub kinds: Vec<ArtifactType>,
    /// Dist-tags, e.g. `latest`.
    #[serde(default)]
    pub dist_tags: BTreeMap<String, String>,
    /// Published versions.
    #[serde(default)]
    pub versions: BTreeMap<String, VersionMetadata>,
}

impl PackageMetadata {
    /// The version the `latest` dist-tag points at, falling back to the
    /// highest semver among published versions.
    pub fn latest(&self) -> Option<&str> {
        if let Some(tag) = self.dist_tags.get("latest") {
            return Some(tag);
        }
        self.versions
            .keys()
            .filter_map(|v| semver::Version::parse(v).ok().map(|parsed| (parsed, v)))
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, description: &str, keywords: &[&str]) -> IndexEntry {
        IndexEntry {
            name: name.into(),
            description: description.into(),
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
            kinds: vec![ArtifactType::Skill],
            latest: "1.0.0".into(),
            versions: vec!["1.0.0".into()],
        }
    }

    #[test]
    fn test_search_matches_name_description_keywords() {
        let mut index = RegistryIndex::default();
        index.upsert(entry("code-review", "Review helper", &[]));
        index.upsert(entry("triage", "Sorts issues", &["review"]));
        index.upsert(entry("deploy", "Ships things", &[]));

        let hits = index.search("review", None);
        let names: Vec<&str> = hits.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["code-review", "triage"]);
    }

    #[test]
    fn test_search_case_insensitive() {
        let mut index = RegistryIndex::default();
        index.upsert(entry("Code-Review", "", &[]));
        assert_eq!(index.search("CODE", None).len(), 1);
    }

    #[test]
    fn test_empty_query_returns_all() {
        let mut index = RegistryIndex::default();
        index.upsert(entry("a", "", &[]));
        index.upsert(entry("b", "", &[]));
        assert_eq!(index.search("", None).len(), 2);
    }

    #[test]
    fn test_type_filter() {
        let mut index = RegistryIndex::default();
        let mut prompt_entry = entry("triage", "", &[]);
        prompt_entry.kinds = vec![ArtifactType::Prompt];
        index.upsert(prompt_entry);
        index.upsert(entry("code-review", "", &[]));

        assert_eq!(index.search("", Some(ArtifactType::Prompt)).len(), 1);
        assert_eq!(index.search("", Some(ArtifactType::Skill)).len(), 1);
        assert_eq!(index.search("", Some(ArtifactType::Agent)).len(), 0);
    }

    #[test]
    fn test_upsert_replaces() {
        let mut index = RegistryIndex::default();
        index.upsert(entry("demo", "old", &[]));
        index.upsert(entry("demo", "new", &[]));
        assert_eq!(index.entries.len(), 1);
        assert_eq!(index.entries[0].description, "new");
    }

    #[test]
    fn test_latest_falls_back_to_highest_semver() {
        let mut versions = BTreeMap::new();
        for v in ["1.0.0", "1.10.0", "1.2.0"] {
            versions.insert(
                v.to_string(),
                VersionMetadata {
                    checksum: "00".repeat(32),
                    size: 1,
                    dependencies: BTreeMap::new(),
                },
            );
        }
        let metadata = PackageMetadata {
            version: REGISTRY_SCHEMA_VERSION,
            name: "demo".into(),
            description: String::new(),
            keywords: vec![],
            kinds: vec![],
            dist_tags: BTreeMap::new(),
            versions,
        };
        assert_eq!(metadata.latest(), Some("1.10.0"));
    }
}
