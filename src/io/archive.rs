//! Archive pack/unpack for tar.gz package archives.
//!
//! Every archive carries a `MANIFEST.json` content manifest (relative path
//! to SHA-256) at its root. Extraction enforces the safety invariants:
//! absolute entry paths, `..` traversal, symlinks resolving outside the
//! extraction root, and extracted sizes beyond the configured ceiling are
//! all hard failures - never silently skipped.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Component, Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use thiserror::Error;

use crate::CONTENT_MANIFEST;
use crate::io::hashing::hash_tree;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Archive safety violation: {0}")]
    Safety(String),

    #[error("Archive exceeds size ceiling: {actual} bytes extracted, limit is {limit}")]
    SizeExceeded { actual: u64, limit: u64 },

    #[error("Malformed archive: {0}")]
    Format(String),
}

/// Create a tar.gz archive of `src_dir` at `dest`, embedding a content
/// manifest of per-file SHA-256 digests at the archive root.
pub fn pack_archive(src_dir: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let checksums = hash_tree(src_dir)?;
    let manifest = serde_json::to_vec_pretty(&checksums)
        .map_err(|e| ArchiveError::Format(e.to_string()))?;

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(dest)?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let mut header = tar::Header::new_gnu();
    header.set_size(manifest.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, CONTENT_MANIFEST, manifest.as_slice())?;

    for (relative, _) in &checksums {
        let path = src_dir.join(relative);
        let mut f = File::open(&path)?;
        builder.append_file(relative, &mut f)?;
    }

    let encoder = builder.into_inner()?;
    encoder.finish()?;
    Ok(())
}

/// Extract a tar.gz archive into `dest_dir`, enforcing safety invariants
/// and the extracted-size ceiling. Returns the content manifest found in
/// the archive, if any.
pub fn unpack_archive(
    archive_path: &Path,
    dest_dir: &Path,
    size_ceiling: u64,
) -> Result<Option<BTreeMap<String, String>>, ArchiveError> {
    fs::create_dir_all(dest_dir)?;
    let file = File::open(archive_path)?;
    let decoder = GzDecoder::new(BufReader::new(file));
    let mut archive = tar::Archive::new(decoder);

    let mut manifest: Option<BTreeMap<String, String>> = None;
    let mut extracted_bytes: u64 = 0;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?.into_owned();
        let entry_type = entry.header().entry_type();

        let relative = sanitize_entry_path(&entry_path)?;

        extracted_bytes = extracted_bytes.saturating_add(entry.size());
        if extracted_bytes > size_ceiling {
            return Err(ArchiveError::SizeExceeded {
                actual: extracted_bytes,
                limit: size_ceiling,
            });
        }

        if entry_type.is_symlink() || entry_type.is_hard_link() {
            check_link_target(&entry, &relative)?;
        }

        if entry_type.is_dir() {
            fs::create_dir_all(dest_dir.join(&relative))?;
            continue;
        }

        let absolute = dest_dir.join(&relative);
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent)?;
        }

        if relative == Path::new(CONTENT_MANIFEST) {
            let mut buf = Vec::new();
            io::Read::read_to_end(&mut entry, &mut buf)?;
            manifest = Some(
                serde_json::from_slice(&buf)
                    .map_err(|e| ArchiveError::Format(format!("bad content manifest: {e}")))?,
            );
            fs::write(&absolute, &buf)?;
            continue;
        }

        entry.unpack(&absolute)?;
    }

    Ok(manifest)
}

/// Reject absolute paths and `..` traversal in an archive entry path.
fn sanitize_entry_path(path: &Path) -> Result<PathBuf, ArchiveError> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(ArchiveError::Safety(format!(
                    "entry path escapes archive root: {}",
                    path.display()
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ArchiveError::Safety(format!(
                    "absolute entry path in archive: {}",
                    path.display()
                )));
            }
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(ArchiveError::Safety("empty entry path in archive".into()));
    }
    Ok(clean)
}

/// Reject links whose target resolves outside the extraction root.
fn check_link_target<R: io::Read>(
    entry: &tar::Entry<'_, R>,
    entry_relative: &Path,
) -> Result<(), ArchiveError> {
    let target = entry
        .link_name()
        .map_err(ArchiveError::Io)?
        .ok_or_else(|| ArchiveError::Format("link entry without target".into()))?;

    if target.is_absolute() {
        return Err(ArchiveError::Safety(format!(
            "symlink to absolute path: {} -> {}",
            entry_relative.display(),
            target.display()
        )));
    }

    // Resolve the target relative to the link's parent directory, counting
    // depth; the moment it goes negative the link escapes the root.
    let mut depth: i64 = entry_relative.components().count() as i64 - 1;
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return Err(ArchiveError::Safety(format!(
                        "symlink escapes archive root: {} -> {}",
                        entry_relative.display(),
                        target.display()
                    )));
                }
            }
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => {
                return Err(ArchiveError::Safety(format!(
                    "symlink to absolute path: {} -> {}",
                    entry_relative.display(),
                    target.display()
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_source_tree(root: &Path) {
        fs::create_dir_all(root.join("prompts")).unwrap();
        fs::write(root.join("skillet.toml"), "[package]").unwrap();
        fs::write(root.join("prompts/triage.md"), "# Triage").unwrap();
    }

    #[test]
    fn test_pack_unpack_round_trip() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("pkg");
        make_source_tree(&src);

        let archive = dir.path().join("pkg.tar.gz");
        pack_archive(&src, &archive).unwrap();

        let out = dir.path().join("out");
        let manifest = unpack_archive(&archive, &out, u64::MAX).unwrap().unwrap();

        assert!(out.join("prompts/triage.md").exists());
        assert!(manifest.contains_key("prompts/triage.md"));
        assert_eq!(
            fs::read_to_string(out.join("prompts/triage.md")).unwrap(),
            "# Triage"
        );
    }

    #[test]
    fn test_size_ceiling_enforced() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("pkg");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("big.md"), vec![b'x'; 4096]).unwrap();

        let archive = dir.path().join("pkg.tar.gz");
        pack_archive(&src, &archive).unwrap();

        let out = dir.path().join("out");
        let err = unpack_archive(&archive, &out, 100).unwrap_err();
        assert!(matches!(err, ArchiveError::SizeExceeded { .. }));
    }

    #[test]
    fn test_traversal_rejected() {
        let dir = tempdir().unwrap();

        // Hand-build a tar with a traversal path
        let archive_path = dir.path().join("evil.tar.gz");
        {
            let file = File::create(&archive_path).unwrap();
            let encoder = GzEncoder::new(file, Compression::default());
            let mut builder = tar::Builder::new(encoder);
            let data = b"owned";
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            // Write the traversal path directly into the header bytes: the
            // high-level `append_data`/`set_path` API refuses to build an
            // archive whose entry path contains `..`, so bypass it to forge
            // the malicious entry this test needs.
            let name = b"../outside.md";
            header.as_gnu_mut().unwrap().name[..name.len()].copy_from_slice(name);
            header.set_cksum();
            builder.append(&header, data.as_slice()).unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let out = dir.path().join("out");
        let err = unpack_archive(&archive_path, &out, u64::MAX).unwrap_err();
        assert!(matches!(err, ArchiveError::Safety(_)));
        assert!(!dir.path().join("outside.md").exists());
    }

    #[test]
    fn test_escaping_symlink_rejected() {
        let dir = tempdir().unwrap();

        let archive_path = dir.path().join("evil.tar.gz");
        {
            let file = File::create(&archive_path).unwrap();
            let encoder = GzEncoder::new(file, Compression::default());
            let mut builder = tar::Builder::new(encoder);
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_size(0);
            header.set_cksum();
            builder
                .append_link(&mut header, "link.md", "../../etc/passwd")
                .unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let out = dir.path().join("out");
        let err = unpack_archive(&archive_path, &out, u64::MAX).unwrap_err();
        assert!(matches!(err, ArchiveError::Safety(_)));
    }

    #[test]
    fn test_internal_symlink_allowed() {
        let dir = tempdir().unwrap();

        let archive_path = dir.path().join("ok.tar.gz");
        {
            let file = File::create(&archive_path).unwrap();
            let encoder = GzEncoder::new(file, Compression::default());
            let mut builder = tar::Builder::new(encoder);

            let data = b"real";
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, "docs/readme.md", data.as_slice())
                .unwrap();

            let mut link = tar::Header::new_gnu();
            link.set_entry_type(tar::EntryType::Symlink);
            link.set_size(0);
            link.set_cksum();
            builder
                .append_link(&mut link, "docs/alias.md", "readme.md")
                .unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let out = dir.path().join("out");
        unpack_archive(&archive_path, &out, u64::MAX).unwrap();
        assert!(out.join("docs/readme.md").exists());
    }
}
