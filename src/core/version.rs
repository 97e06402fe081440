//! Version constraints and package specifiers.
//!
//! Constraint grammar: exact (`1.2.3`), comparators (`>=1.0`), comma-joined
//! ranges (`>=1.0, <2.0`), caret (`^1.2`) and tilde (`~1.2`) shorthand.
//! A bare version means exact, not caret.

use anyhow::{Result, bail};

use crate::types::{PackageName, Version};

/// Parsed package specifier with optional constraint, e.g. `demo@^1.2`.
#[derive(Debug, Clone)]
pub struct PackageSpec {
    pub name: PackageName,
    pub constraint: Option<Constraint>,
}

impl PackageSpec {
    /// Parse a specifier like `demo`, `demo@1.0.0`, or `demo@>=1.0, <2.0`.
    pub fn parse(spec: &str) -> Result<Self> {
        if let Some((name, constraint)) = spec.split_once('@') {
            // A leading '@' is a scope, not a separator.
            if name.is_empty() {
                return Self::parse_scoped(spec);
            }
            if constraint.is_empty() {
                bail!("Invalid package specifier: missing constraint after @");
            }
            let constraint = if constraint == "latest" {
                None
            } else {
                Some(Constraint::parse(constraint)?)
            };
            Ok(Self {
                name: PackageName::new(name),
                constraint,
            })
        } else {
            Ok(Self {
                name: PackageName::new(spec),
                constraint: None,
            })
        }
    }

    fn parse_scoped(spec: &str) -> Result<Self> {
        // `@scope/name` or `@scope/name@constraint`
        match spec[1..].split_once('@') {
            Some((name, constraint)) => {
                if constraint.is_empty() {
                    bail!("Invalid package specifier: missing constraint after @");
                }
                Ok(Self {
                    name: PackageName::new(&spec[..name.len() + 1]),
                    constraint: Some(Constraint::parse(constraint)?),
                })
            }
            None => Ok(Self {
                name: PackageName::new(spec),
                constraint: None,
            }),
        }
    }
}

/// A version constraint.
///
/// Kept as both the original string (for error messages and lock files) and
/// the parsed requirement.
#[derive(Debug, Clone)]
pub struct Constraint {
    raw: String,
    kind: ConstraintKind,
}

#[derive(Debug, Clone)]
enum ConstraintKind {
    /// A bare version: matches exactly that version.
    Exact(semver::Version),
    /// Anything else semver understands: `>=`, ranges, caret, tilde.
    Req(semver::VersionReq),
}

impl Constraint {
    /// Parse a constraint string.
    pub fn parse(s: &str) -> Result<Self> {
        let raw = s.trim().to_string();
        if raw.is_empty() || raw == "*" || raw == "latest" {
            return Ok(Self {
                raw: "*".into(),
                kind: ConstraintKind::Req(semver::VersionReq::STAR),
            });
        }

        // A bare version is an exact pin. semver's VersionReq would read it
        // as caret, so check this form first.
        if let Ok(v) = semver::Version::parse(&raw) {
            return Ok(Self {
                raw,
                kind: ConstraintKind::Exact(v),
            });
        }

        let stripped = raw.strip_prefix('=').unwrap_or(&raw).trim();
        if let Ok(v) = semver::Version::parse(stripped) {
            return Ok(Self {
                raw,
                kind: ConstraintKind::Exact(v),
            });
        }

        match semver::VersionReq::parse(&raw) {
            Ok(req) => Ok(Self {
                raw,
                kind: ConstraintKind::Req(req),
            }),
            Err(e) => bail!("Invalid version constraint '{raw}': {e}"),
        }
    }

    /// Whether `version` satisfies this constraint. Non-semver version
    /// strings only satisfy `*`.
    pub fn matches(&self, version: &Version) -> bool {
        match &self.kind {
            ConstraintKind::Exact(pin) => version
                .as_semver()
                .map(|v| v == *pin)
                .unwrap_or(version.as_str() == pin.to_string()),
            ConstraintKind::Req(req) => {
                if *req == semver::VersionReq::STAR {
                    return true;
                }
                version.as_semver().map(|v| req.matches(&v)).unwrap_or(false)
            }
        }
    }

    /// Select the highest version satisfying this constraint.
    pub fn select_best<'a, I>(&self, versions: I) -> Option<Version>
    where
        I: IntoIterator<Item = &'a Version>,
    {
        let mut best: Option<(semver::Version, Version)> = None;
        for candidate in versions {
            if !self.matches(candidate) {
                continue;
            }
            let Some(parsed) = candidate.as_semver() else {
                continue;
            };
            match &best {
                Some((current, _)) if *current >= parsed => {}
                _ => best = Some((parsed, candidate.clone())),
            }
        }
        best.map(|(_, v)| v)
    }

    /// The original constraint string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}
