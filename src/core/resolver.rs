//! Dependency resolver.
//!
//! Breadth-first traversal over registry metadata. For each requested name
//! the first registry (in configured order) that knows the package wins,
//! and the highest version satisfying the constraint is selected. A name
//! that resolves twice under compatible constraints is deduplicated; under
//! incompatible constraints resolution fails immediately, naming both
//! constraints and both requesters. No backtracking is attempted - artifact
//! dependency graphs are shallow, and a loud conflict beats a surprising
//! pick.

use std::collections::{BTreeMap, HashMap, VecDeque};

use thiserror::Error;

use crate::core::manifest::PackageManifest;
use crate::core::version::Constraint;
use crate::registry::{LocalRegistry, RegistryError};
use crate::types::{PackageName, Version};

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Package '{0}' not found in any configured registry")]
    PackageNotFound(String),

    #[error(
        "No version of '{name}' satisfies '{constraint}' (required by {requested_by}); available: {available}"
    )]
    NoMatchingVersion {
        name: String,
        constraint: String,
        requested_by: String,
        available: String,
    },

    #[error(transparent)]
    Conflict(Box<ConflictError>),

    #[error("Invalid constraint '{constraint}' on '{name}': {reason}")]
    InvalidConstraint {
        name: String,
        constraint: String,
        reason: String,
    },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Details of a dependency conflict: both constraints and both requesting
/// packages, so the error names everything needed to untangle it.
#[derive(Error, Debug)]
#[error(
    "Dependency conflict on '{name}': '{first_constraint}' (required by {first_requester}) \
     is incompatible with '{second_constraint}' (required by {second_requester})"
)]
pub struct ConflictError {
    pub name: String,
    pub first_constraint: String,
    pub first_requester: String,
    pub second_constraint: String,
    pub second_requester: String,
}

/// Resolver output for one package.
#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    pub name: PackageName,
    pub version: Version,
    /// Name of the registry that supplied the package.
    pub registry: String,
    /// Hex SHA-256 of the version archive.
    pub checksum: String,
    /// Archive location, once downloaded. The resolver leaves this unset.
    pub archive_path: Option<std::path::PathBuf>,
    /// Parsed manifest, when already available.
    pub manifest: Option<Box<PackageManifest>>,
    /// Declared dependencies of the resolved version.
    pub dependencies: BTreeMap<String, String>,
}

/// A root request: a name and an optional constraint.
pub type RootRequest = (PackageName, Option<Constraint>);

/// Resolve root requests plus transitive dependencies into a flat set.
///
/// Output order is traversal order; it is not build-significant since
/// artifacts are files, not compiled units.
pub fn resolve(
    roots: &[RootRequest],
    registries: &[LocalRegistry],
) -> Result<Vec<ResolvedPackage>, ResolveError> {
    let mut resolved: HashMap<PackageName, Resolution> = HashMap::new();
    let mut order: Vec<PackageName> = Vec::new();
    let mut queue: VecDeque<Request> = roots
        .iter()
        .map(|(name, constraint)| Request {
            name: name.clone(),
            constraint: constraint.clone().unwrap_or_else(any),
            requested_by: "(root)".to_string(),
        })
        .collect();

    while let Some(request) = queue.pop_front() {
        if let Some(existing) = resolved.get(&request.name) {
            // Already resolved: compatible constraints dedup, incompatible
            // constraints fail loudly with both sides named.
            if request.constraint.matches(&existing.package.version) {
                continue;
            }
            return Err(ResolveError::Conflict(Box::new(ConflictError {
                name: request.name.to_string(),
                first_constraint: existing.constraint.to_string(),
                first_requester: existing.requested_by.clone(),
                second_constraint: request.constraint.to_string(),
                second_requester: request.requested_by,
            })));
        }

        let package = resolve_one(&request, registries)?;
        tracing::debug!(
            name = %package.name,
            version = %package.version,
            registry = %package.registry,
            "resolved"
        );

        for (dep_name, dep_constraint) in &package.dependencies {
            let constraint = Constraint::parse(dep_constraint).map_err(|e| {
                ResolveError::InvalidConstraint {
                    name: dep_name.clone(),
                    constraint: dep_constraint.clone(),
                    reason: e.to_string(),
                }
            })?;
            queue.push_back(Request {
                name: PackageName::new(dep_name),
                constraint,
                requested_by: package.name.to_string(),
            });
        }

        order.push(request.name.clone());
        resolved.insert(
            request.name.clone(),
            Resolution {
                package,
                constraint: request.constraint,
                requested_by: request.requested_by,
            },
        );
    }

    Ok(order
        .into_iter()
        .map(|name| {
            resolved
                .remove(&name)
                .expect("every ordered name was resolved")
                .package
        })
        .collect())
}

struct Request {
    name: PackageName,
    constraint: Constraint,
    requested_by: String,
}

struct Resolution {
    package: ResolvedPackage,
    constraint: Constraint,
    requested_by: String,
}

fn any() -> Constraint {
    Constraint::parse("*").expect("'*' is a valid constraint")
}

/// Query registries in configured order; first hit wins.
fn resolve_one(
    request: &Request,
    registries: &[LocalRegistry],
) -> Result<ResolvedPackage, ResolveError> {
    for registry in registries {
        let metadata = match registry.get_metadata(&request.name) {
            Ok(m) => m,
            Err(RegistryError::PackageNotFound(_)) => continue,
            Err(e) => return Err(e.into()),
        };

        let available: Vec<Version> = metadata.versions.keys().map(|v| Version::new(v)).collect();
        let best = request.constraint.select_best(&available).ok_or_else(|| {
            ResolveError::NoMatchingVersion {
                name: request.name.to_string(),
                constraint: request.constraint.to_string(),
                requested_by: request.requested_by.clone(),
                available: metadata
                    .versions
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            }
        })?;

        let version_meta = &metadata.versions[best.as_str()];
        return Ok(ResolvedPackage {
            name: request.name.clone(),
            version: best,
            registry: registry.name().to_string(),
            checksum: version_meta.checksum.clone(),
            archive_path: None,
            manifest: None,
            dependencies: version_meta.dependencies.clone(),
        });
    }

    Err(ResolveError::PackageNotFound(request.name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::{ArtifactRef, Artifacts, PackageManifest};
    use crate::io::archive::pack_archive;
    use crate::registry::LocalRegistry;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn publish(
        registry: &LocalRegistry,
        scratch: &Path,
        name: &str,
        version: &str,
        deps: &[(&str, &str)],
    ) {
        let manifest = PackageManifest {
            name: PackageName::new(name),
            version: Version::new(version),
            description: None,
            keywords: vec![],
            artifacts: Artifacts {
                prompts: vec![ArtifactRef {
                    name: name.into(),
                    path: format!("prompts/{name}.md"),
                    description: None,
                }],
                ..Artifacts::default()
            },
            dependencies: deps
                .iter()
                .map(|(n, c)| ((*n).to_string(), (*c).to_string()))
                .collect(),
            platforms: Default::default(),
            quality: None,
            provenance: None,
        };

        let tree = scratch.join(format!("{name}-{version}"));
        fs::create_dir_all(tree.join("prompts")).unwrap();
        fs::write(tree.join(format!("prompts/{name}.md")), "# p").unwrap();
        manifest.save(&tree.join("skillet.toml")).unwrap();
        let archive = scratch.join(format!("{name}-{version}.tar.gz"));
        pack_archive(&tree, &archive).unwrap();
        registry.publish(&manifest, &archive, false).unwrap();
    }

    fn root(name: &str, constraint: Option<&str>) -> RootRequest {
        (
            PackageName::new(name),
            constraint.map(|c| Constraint::parse(c).unwrap()),
        )
    }

    #[test]
    fn test_selects_maximum_satisfying() {
        let dir = tempdir().unwrap();
        let reg = LocalRegistry::new("main", &dir.path().join("reg"));
        for v in ["1.1.0", "1.2.0", "1.3.0", "2.0.0"] {
            publish(&reg, dir.path(), "demo", v, &[]);
        }

        let resolved = resolve(&[root("demo", Some("^1.2.0"))], &[reg]).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].version, "1.3.0");
    }

    #[test]
    fn test_transitive_resolution() {
        let dir = tempdir().unwrap();
        let reg = LocalRegistry::new("main", &dir.path().join("reg"));
        publish(&reg, dir.path(), "helpers", "1.1.0", &[]);
        publish(&reg, dir.path(), "demo", "1.0.0", &[("helpers", "^1.0")]);

        let resolved = resolve(&[root("demo", None)], &[reg]).unwrap();
        let names: Vec<&str> = resolved.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["demo", "helpers"]);
    }

    #[test]
    fn test_compatible_constraints_dedup() {
        let dir = tempdir().unwrap();
        let reg = LocalRegistry::new("main", &dir.path().join("reg"));
        publish(&reg, dir.path(), "shared", "1.2.0", &[]);
        publish(&reg, dir.path(), "a", "1.0.0", &[("shared", "^1.0")]);
        publish(&reg, dir.path(), "b", "1.0.0", &[("shared", ">=1.1")]);

        let resolved = resolve(&[root("a", None), root("b", None)], &[reg]).unwrap();
        let shared_count = resolved.iter().filter(|p| p.name == "shared").count();
        assert_eq!(shared_count, 1);
    }

    #[test]
    fn test_incompatible_constraints_conflict() {
        let dir = tempdir().unwrap();
        let reg = LocalRegistry::new("main", &dir.path().join("reg"));
        publish(&reg, dir.path(), "shared", "1.2.0", &[]);
        publish(&reg, dir.path(), "shared", "2.0.0", &[]);
        publish(&reg, dir.path(), "a", "1.0.0", &[("shared", "^1.0")]);
        publish(&reg, dir.path(), "b", "1.0.0", &[("shared", "^2.0")]);

        let err = resolve(&[root("a", None), root("b", None)], &[reg]).unwrap_err();
        match err {
            ResolveError::Conflict(details) => {
                assert_eq!(details.name, "shared");
                assert!(details.first_constraint.contains("1.0"));
                assert!(details.second_constraint.contains("2.0"));
                assert_eq!(details.first_requester, "a");
                assert_eq!(details.second_requester, "b");
            }
            other => panic!("expected conflict, got {other}"),
        }
    }

    #[test]
    fn test_cycle_terminates() {
        let dir = tempdir().unwrap();
        let reg = LocalRegistry::new("main", &dir.path().join("reg"));
        publish(&reg, dir.path(), "a", "1.0.0", &[("b", "*")]);
        publish(&reg, dir.path(), "b", "1.0.0", &[("a", "*")]);

        let resolved = resolve(&[root("a", None)], &[reg]).unwrap();
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn test_first_registry_wins() {
        let dir = tempdir().unwrap();
        let first = LocalRegistry::new("first", &dir.path().join("first"));
        let second = LocalRegistry::new("second", &dir.path().join("second"));
        publish(&first, dir.path(), "demo", "1.0.0", &[]);
        publish(&second, dir.path(), "demo", "9.0.0", &[]);

        let resolved = resolve(&[root("demo", None)], &[first, second]).unwrap();
        assert_eq!(resolved[0].registry, "first");
        assert_eq!(resolved[0].version, "1.0.0");
    }

    #[test]
    fn test_not_found() {
        let dir = tempdir().unwrap();
        let reg = LocalRegistry::new("main", &dir.path().join("reg"));
        let err = resolve(&[root("ghost", None)], &[reg]).unwrap_err();
        assert!(matches!(err, ResolveError::PackageNotFound(_)));
    }
}
