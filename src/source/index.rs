//! Aggregate artifact index across all configured sources, and name
//! resolution against registries plus that index.

use std::collections::HashMap;

use thiserror::Error;

use crate::core::config::Config;
use crate::registry::{LocalRegistry, RegistryError};
use crate::source::scan::{VirtualPackage, scan_source};
use crate::source::SourceError;
use crate::types::PackageName;
use crate::ui::Reporter;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error(
        "'{query}' not found in any registry or source; try 'skillet search {query}' or a \
         qualified name like '<source>/{query}'"
    )]
    NotFound { query: String },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// The aggregate result of scanning all configured sources.
///
/// Never persisted: rebuilding is cheap relative to network operations,
/// and a fresh build can never be stale.
#[derive(Debug, Default)]
pub struct ArtifactIndex {
    /// Unqualified name to candidates; may hold several entries when
    /// sources collide.
    by_name: HashMap<String, Vec<VirtualPackage>>,
    /// Qualified name to package; always unambiguous.
    by_qualified_name: HashMap<String, VirtualPackage>,
}

impl ArtifactIndex {
    /// All candidates for an unqualified name, in source-configuration
    /// order.
    pub fn find(&self, name: &str) -> &[VirtualPackage] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Exact lookup by qualified name.
    pub fn find_qualified(&self, qualified: &str) -> Option<&VirtualPackage> {
        self.by_qualified_name.get(qualified)
    }

    /// Every indexed package, in qualified-name order.
    pub fn all(&self) -> Vec<&VirtualPackage> {
        let mut all: Vec<&VirtualPackage> = self.by_qualified_name.values().collect();
        all.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
        all
    }

    /// Number of indexed packages.
    pub fn len(&self) -> usize {
        self.by_qualified_name.len()
    }

    /// True when no source contributed any artifact.
    pub fn is_empty(&self) -> bool {
        self.by_qualified_name.is_empty()
    }

    fn insert(&mut self, package: VirtualPackage) {
        self.by_qualified_name
            .insert(package.qualified_name.clone(), package.clone());
        self.by_name.entry(package.name.clone()).or_default().push(package);
    }
}

/// Index build result: the index plus per-source failures. One corrupted
/// or missing cache never aborts indexing of the remaining sources.
#[derive(Debug)]
pub struct IndexReport {
    pub index: ArtifactIndex,
    pub failures: Vec<(String, SourceError)>,
}

/// Scan every configured source into an [`ArtifactIndex`].
pub fn build_source_index(config: &Config) -> IndexReport {
    let mut index = ArtifactIndex::default();
    let mut failures = Vec::new();

    for entry in &config.sources {
        match scan_source(entry, &config.home) {
            Ok(packages) => {
                for package in packages {
                    index.insert(package);
                }
            }
            Err(err) => {
                tracing::warn!(source = %entry.name, error = %err, "source scan failed");
                failures.push((entry.name.clone(), err));
            }
        }
    }

    IndexReport { index, failures }
}

/// What a name resolved to.
#[derive(Debug, Clone)]
pub enum ResolvedTarget {
    /// The name belongs to a registry package; version selection is the
    /// resolver's job.
    Registry(PackageName),
    /// The name is a source artifact.
    Source(VirtualPackage),
}

/// Resolve a name or qualified name against registries and the source
/// index.
///
/// Qualified names (`source/name`) resolve directly and unambiguously.
/// Unqualified names check registries first - a registry hit always wins
/// over a source hit, so a name reused by a source cannot shadow a
/// published package. When several sources offer the name, the first by
/// configuration order wins and the ambiguity is reported with the
/// qualified alternative.
pub fn resolve_artifact(
    name: &PackageName,
    index: &ArtifactIndex,
    registries: &[LocalRegistry],
    reporter: &dyn Reporter,
) -> Result<ResolvedTarget, LookupError> {
    if name.is_qualified() {
        if let Some(package) = index.find_qualified(name.as_str()) {
            return Ok(ResolvedTarget::Source(package.clone()));
        }
        return Err(LookupError::NotFound {
            query: name.to_string(),
        });
    }

    for registry in registries {
        match registry.get_metadata(name) {
            Ok(_) => return Ok(ResolvedTarget::Registry(name.clone())),
            Err(RegistryError::PackageNotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    let candidates = index.find(name);
    match candidates {
        [] => Err(LookupError::NotFound {
            query: name.to_string(),
        }),
        [only] => Ok(ResolvedTarget::Source(only.clone())),
        [first, rest @ ..] => {
            let alternatives: Vec<&str> =
                rest.iter().map(|p| p.qualified_name.as_str()).collect();
            reporter.warning(&format!(
                "'{name}' is provided by multiple sources; using '{}' (also available: {})",
                first.qualified_name,
                alternatives.join(", ")
            ));
            Ok(ResolvedTarget::Source(first.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SourceEntry;
    use crate::types::ArtifactType;
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Reporter that records warnings for assertions.
    #[derive(Default)]
    struct RecordingReporter {
        warnings: Mutex<Vec<String>>,
    }

    impl Reporter for RecordingReporter {
        fn working(&self, _: &str, _: &PackageName, _: &crate::types::Version) {}
        fn done(&self, _: &str, _: &PackageName, _: &crate::types::Version) {}
        fn failed(&self, _: &PackageName, _: &str) {}
        fn info(&self, _: &str) {}
        fn warning(&self, msg: &str) {
            self.warnings.lock().unwrap().push(msg.to_string());
        }
        fn error(&self, _: &str) {}
    }

    fn make_source(home: &Path, name: &str, artifacts: &[&str]) -> SourceEntry {
        let entry = SourceEntry {
            name: name.into(),
            url: format!("https://example.com/{name}.git"),
            reference: None,
            subpath: None,
        };
        let root = entry.cache_dir(home);
        for artifact in artifacts {
            let dir = root.join("skills").join(artifact);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("SKILL.md"), format!("# {artifact}\n")).unwrap();
        }
        entry
    }

    fn config_with(home: &Path, sources: Vec<SourceEntry>) -> Config {
        let mut config = Config::empty(home);
        config.sources = sources;
        config
    }

    #[test]
    fn test_build_index_aggregates_sources() {
        let home = tempdir().unwrap();
        let a = make_source(home.path(), "alpha/skills", &["code-review", "deploy"]);
        let b = make_source(home.path(), "beta/skills", &["triage"]);
        let config = config_with(home.path(), vec![a, b]);

        let report = build_source_index(&config);
        assert!(report.failures.is_empty());
        assert_eq!(report.index.len(), 3);
        assert!(report.index.find_qualified("beta/skills/triage").is_some());
    }

    #[test]
    fn test_failed_source_does_not_abort_others() {
        let home = tempdir().unwrap();
        let good = make_source(home.path(), "alpha/skills", &["code-review"]);
        let missing = SourceEntry {
            name: "ghost/skills".into(),
            url: "https://example.com/ghost.git".into(),
            reference: None,
            subpath: None,
        };
        let config = config_with(home.path(), vec![missing, good]);

        let report = build_source_index(&config);
        assert_eq!(report.index.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "ghost/skills");
    }

    #[test]
    fn test_ambiguous_name_first_source_wins_with_warning() {
        let home = tempdir().unwrap();
        let a = make_source(home.path(), "alpha/skills", &["code-review"]);
        let b = make_source(home.path(), "beta/skills", &["code-review"]);
        let config = config_with(home.path(), vec![a, b]);

        let report = build_source_index(&config);
        let reporter = RecordingReporter::default();
        let target = resolve_artifact(
            &PackageName::new("code-review"),
            &report.index,
            &[],
            &reporter,
        )
        .unwrap();

        match target {
            ResolvedTarget::Source(p) => {
                assert_eq!(p.qualified_name, "alpha/skills/code-review");
            }
            other => panic!("expected source target, got {other:?}"),
        }
        let warnings = reporter.warnings.lock().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("beta/skills/code-review"));
    }

    #[test]
    fn test_qualified_name_no_warning() {
        let home = tempdir().unwrap();
        let a = make_source(home.path(), "alpha/skills", &["code-review"]);
        let b = make_source(home.path(), "beta/skills", &["code-review"]);
        let config = config_with(home.path(), vec![a, b]);

        let report = build_source_index(&config);
        let reporter = RecordingReporter::default();
        let target = resolve_artifact(
            &PackageName::new("beta/skills/code-review"),
            &report.index,
            &[],
            &reporter,
        )
        .unwrap();

        match target {
            ResolvedTarget::Source(p) => assert_eq!(p.source, "beta/skills"),
            other => panic!("expected source target, got {other:?}"),
        }
        assert!(reporter.warnings.lock().unwrap().is_empty());
    }

    #[test]
    fn test_registry_wins_over_source() {
        use crate::core::manifest::{ArtifactRef, Artifacts, PackageManifest};
        use crate::io::archive::pack_archive;
        use crate::types::Version;

        let home = tempdir().unwrap();
        let source = make_source(home.path(), "alpha/skills", &["code-review"]);
        let config = config_with(home.path(), vec![source]);
        let report = build_source_index(&config);

        // Publish the same name to a registry.
        let reg = LocalRegistry::new("main", &home.path().join("registry"));
        let manifest = PackageManifest {
            name: PackageName::new("code-review"),
            version: Version::new("1.0.0"),
            description: None,
            keywords: vec![],
            artifacts: Artifacts {
                skills: vec![ArtifactRef {
                    name: "code-review".into(),
                    path: "skills/code-review".into(),
                    description: None,
                }],
                ..Artifacts::default()
            },
            dependencies: Default::default(),
            platforms: Default::default(),
            quality: None,
            provenance: None,
        };
        let tree = home.path().join("tree");
        fs::create_dir_all(tree.join("skills/code-review")).unwrap();
        fs::write(tree.join("skills/code-review/SKILL.md"), "# r").unwrap();
        let archive = home.path().join("a.tar.gz");
        pack_archive(&tree, &archive).unwrap();
        reg.publish(&manifest, &archive, false).unwrap();

        let reporter = RecordingReporter::default();
        let target = resolve_artifact(
            &PackageName::new("code-review"),
            &report.index,
            &[reg],
            &reporter,
        )
        .unwrap();
        assert!(matches!(target, ResolvedTarget::Registry(_)));
    }

    #[test]
    fn test_not_found_suggests_search() {
        let home = tempdir().unwrap();
        let config = config_with(home.path(), vec![]);
        let report = build_source_index(&config);
        let reporter = RecordingReporter::default();

        let err = resolve_artifact(
            &PackageName::new("ghost"),
            &report.index,
            &[],
            &reporter,
        )
        .unwrap_err();
        assert!(err.to_string().contains("skillet search ghost"));
    }

    #[test]
    fn test_index_all_sorted() {
        let home = tempdir().unwrap();
        let a = make_source(home.path(), "alpha/skills", &["zeta", "alpha"]);
        let config = config_with(home.path(), vec![a]);
        let report = build_source_index(&config);

        let names: Vec<&str> = report
            .index
            .all()
            .iter()
            .map(|p| p.qualified_name.as_str())
            .collect();
        assert_eq!(names, vec!["alpha/skills/alpha", "alpha/skills/zeta"]);
        assert_eq!(report.index.all()[0].kind, ArtifactType::Skill);
    }
}
