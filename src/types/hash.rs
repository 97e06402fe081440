use serde::{Deserialize, Deserializer, Serialize};

/// A validated SHA-256 digest (64 hex characters).
///
/// This newtype ensures that all digests in the system are validated at
/// deserialization time, preventing invalid hex strings from propagating
/// through registry metadata and the lock file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Create a new digest, validating the input.
    ///
    /// Accepts strings with or without a "sha256:" prefix. Returns an error
    /// if the digest is not exactly 64 hex characters.
    pub fn new(s: impl Into<String>) -> Result<Self, String> {
        let s = s.into();
        let hex = s.strip_prefix("sha256:").unwrap_or(&s);

        if hex.len() != 64 {
            return Err(format!(
                "Invalid SHA-256 digest: expected 64 hex characters, got {} in '{s}'",
                hex.len()
            ));
        }

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!(
                "Invalid SHA-256 digest: contains non-hex characters in '{s}'"
            ));
        }

        Ok(Self(hex.to_lowercase()))
    }

    /// Get the digest as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Sha256Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
