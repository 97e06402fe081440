pub mod artifact;
pub mod hash;
pub mod package;

pub use artifact::ArtifactType;
pub use hash::Sha256Digest;
pub use package::{PackageName, Version};
