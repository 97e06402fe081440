//! Filesystem and archive primitives shared by the registry and installer.

pub mod archive;
pub mod hashing;

pub use archive::{ArchiveError, pack_archive, unpack_archive};
pub use hashing::{hash_tree, sha256_bytes, sha256_file};

use std::fs;
use std::io;
use std::path::Path;

/// Recursively copy a directory tree.
///
/// Symlinks in the tree are not followed; they are skipped, since package
/// content is plain files and a link could point anywhere.
pub fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = dst.join(entry.file_name());
        if file_type.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Write `contents` to `path` atomically: write to a sibling temp file, then
/// rename over the original. A crash mid-write can never leave a torn file.
pub fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    io::Write::write_all(&mut tmp, contents)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_copy_dir_all() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("a.md"), "alpha").unwrap();
        fs::write(src.join("nested/b.md"), "beta").unwrap();

        let dst = dir.path().join("dst");
        copy_dir_all(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("a.md")).unwrap(), "alpha");
        assert_eq!(fs::read_to_string(dst.join("nested/b.md")).unwrap(), "beta");
    }

    #[test]
    fn test_atomic_write_replaces() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");
        atomic_write(&path, b"one").unwrap();
        atomic_write(&path, b"two").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"two");
    }
}
