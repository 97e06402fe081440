use std::borrow::Borrow;

/// A normalized package name.
///
/// Package names are automatically lowercased to ensure consistent lookups
/// and comparisons. Names may be scoped (`@scope/name`) or qualified with a
/// source (`source-name/artifact-name`); both forms pass through unchanged
/// apart from case normalization.
///
/// # Example
///
/// ```
/// use skillet::types::PackageName;
///
/// let name = PackageName::new("Code-Review");
/// assert_eq!(name.as_str(), "code-review");
/// ```
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    /// Create a new package name, automatically normalizing to lowercase.
    pub fn new(name: &str) -> Self {
        Self(name.to_lowercase())
    }

    /// Get the normalized package name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this name is qualified with a source prefix (`source/name`).
    ///
    /// Scoped registry names (`@scope/name`) are not qualified names.
    pub fn is_qualified(&self) -> bool {
        !self.0.starts_with('@') && self.0.contains('/')
    }

    /// Split a qualified name into `(source, artifact)` parts.
    pub fn split_qualified(&self) -> Option<(&str, &str)> {
        if self.is_qualified() {
            self.0.split_once('/')
        } else {
            None
        }
    }
}

impl std::fmt::Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for PackageName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::path::Path> for PackageName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

impl Borrow<str> for PackageName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for PackageName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.to_lowercase()
    }
}

impl PartialEq<&str> for PackageName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.to_lowercase()
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

/// A version string.
///
/// Versions are stored as strings so lock files and registry documents can
/// round-trip exactly; ordering and constraint matching parse them as
/// semantic versions where applicable (see [`crate::core::version`]).
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Create a new version from a string.
    pub fn new(v: &str) -> Self {
        Self(v.to_string())
    }

    /// Get the version string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse as a semantic version, if the string is one.
    pub fn as_semver(&self) -> Option<semver::Version> {
        semver::Version::parse(&self.0).ok()
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for Version {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::path::Path> for Version {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl PartialEq<str> for Version {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Version {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_normalization() {
        assert_eq!(PackageName::new("JQ").as_str(), "jq");
        assert_eq!(PackageName::new("Code-Review"), "code-review");
    }

    #[test]
    fn test_qualified_names() {
        let plain = PackageName::new("code-review");
        assert!(!plain.is_qualified());

        let qualified = PackageName::new("acme/code-review");
        assert!(qualified.is_qualified());
        assert_eq!(qualified.split_qualified(), Some(("acme", "code-review")));

        let scoped = PackageName::new("@acme/code-review");
        assert!(!scoped.is_qualified());
    }

    #[test]
    fn test_version_semver() {
        assert!(Version::new("1.2.3").as_semver().is_some());
        assert!(Version::new("not-a-version").as_semver().is_none());
    }
}
