//! Single-instance run lock.
//!
//! [`RunLock::acquire`] takes a non-blocking exclusive `flock` on a well-known
//! path. A held lock fails immediately with [`VrcError::LockContention`]; there
//! is no waiting or retry. The lock is released when the guard drops, and the
//! kernel releases it with the file descriptor if the process dies without
//! unwinding, so a stale lock file never blocks the next run.

#![allow(missing_docs)]

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};

use crate::core::errors::{Result, VrcError};

/// RAII ownership of the run lock.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    _lock: Flock<File>,
}

impl RunLock {
    /// Try to take the lock at `path`, creating the file (and parent
    /// directory) if needed. Records the owning PID in the file.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| VrcError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .mode(0o644)
            .open(path)
            .map_err(|e| VrcError::io(path, e))?;

        let lock = match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => lock,
            Err((_, Errno::EWOULDBLOCK)) => {
                return Err(VrcError::LockContention {
                    path: path.to_path_buf(),
                });
            }
            Err((_, errno)) => {
                return Err(VrcError::io(path, std::io::Error::from(errno)));
            }
        };

        let mut handle: &File = &lock;
        handle
            .set_len(0)
            .and_then(|()| handle.seek(SeekFrom::Start(0)))
            .and_then(|_| writeln!(handle, "{}", std::process::id()))
            .map_err(|e| VrcError::io(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            _lock: lock,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// PID recorded by the current (or last) holder, for diagnostics only.
#[must_use]
pub fn holder_pid(path: &Path) -> Option<u32> {
    let mut raw = String::new();
    File::open(path).ok()?.read_to_string(&mut raw).ok()?;
    raw.trim().parse().ok()
}
