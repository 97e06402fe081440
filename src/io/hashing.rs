//! SHA-256 hashing over files and directory trees.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::types::Sha256Digest;

/// Hash a byte slice.
pub fn sha256_bytes(data: &[u8]) -> Sha256Digest {
    let digest = Sha256::digest(data);
    Sha256Digest::new(hex::encode(digest)).expect("hex encoding of a digest is always valid")
}

/// Hash a file's contents in 64 KB chunks.
pub fn sha256_file(path: &Path) -> io::Result<Sha256Digest> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 65536];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    let digest = hasher.finalize();
    Ok(Sha256Digest::new(hex::encode(digest)).expect("hex encoding of a digest is always valid"))
}

/// Hash every regular file under `root`, keyed by `/`-separated relative
/// path. The `BTreeMap` keeps the result deterministic regardless of
/// directory iteration order.
pub fn hash_tree(root: &Path) -> io::Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();

    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.map_err(io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(io::Error::other)?
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let digest = sha256_file(entry.path())?;
        map.insert(relative, digest.to_string());
    }

    Ok(map)
}
