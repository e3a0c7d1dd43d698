//! Run-level lock file.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, RouterError};

/// Exclusive claim on a monitored folder, released on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Create the lock file at `path`; fails with [`RouterError::Locked`]
    /// if it already exists.
    pub fn acquire(path: &Path) -> Result<Self> {
        Self::acquire_with(path, stamp_owner)
    }

    fn acquire_with(path: &Path, stamp: impl FnOnce(&mut File) -> io::Result<()>) -> Result<Self> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(RouterError::Locked(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        // From here on the file is ours; dropping the guard removes it.
        let lock = Self {
            path: path.to_path_buf(),
        };
        stamp(&mut file)?;
        debug!("Acquired run lock {}", path.display());
        Ok(lock)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn stamp_owner(file: &mut File) -> io::Result<()> {
    writeln!(file, "pid={}", std::process::id())?;
    writeln!(file, "started={}", chrono::Utc::now().to_rfc3339())
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove run lock {}: {}", self.path.display(), e);
        }
    }
}
