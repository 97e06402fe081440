//! Workspace mutual exclusion.
//!
//! A single advisory file lock serializes every mutating operation on a
//! workspace; concurrent invocations block until the holder releases. The
//! lock file and package directories are not safe for concurrent writers,
//! and this is the only hard exclusion requirement in the system.
//! Read-only operations never take this lock.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs4::FileExt;

/// Held exclusive lock on a workspace. Released on drop (and by the OS if
/// the process dies).
#[derive(Debug)]
pub struct WorkspaceLock {
    file: File,
    path: PathBuf,
}

impl WorkspaceLock {
    /// Acquire the lock, blocking until any other holder releases.
    pub fn acquire(state_dir: &Path) -> io::Result<Self> {
        let path = state_dir.join("workspace.lock");
        fs::create_dir_all(state_dir)?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        file.lock_exclusive()?;
        tracing::debug!(path = %path.display(), "workspace lock acquired");
        Ok(Self { file, path })
    }

    /// Try to acquire without blocking; None when another process holds it.
    pub fn try_acquire(state_dir: &Path) -> io::Result<Option<Self>> {
        let path = state_dir.join("workspace.lock");
        fs::create_dir_all(state_dir)?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { file, path })),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        tracing::debug!(path = %self.path.display(), "workspace lock released");
    }
}
