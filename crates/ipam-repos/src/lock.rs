//! Lock serializing writers of the reservation table across processes
//!
//! The lock is an exclusive `flock` on a lock file next to the table. The OS
//! drops it when the holder exits, so a crashed writer never blocks others.
//! The file itself stays in place; it only carries the holder's info.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use serde::{Deserialize, Serialize};

use deploy_ipam_core::{IpamError, Result};

const RETRY_INTERVAL: Duration = Duration::from_millis(20);

/// Lock information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    /// Seconds since the epoch at which the lock was acquired
    pub timestamp: u64,
    pub operation: String,
}

/// Held for the duration of one table transaction; released on drop.
pub struct TableLock {
    path: PathBuf,
    file: Flock<File>,
    lock_info: LockInfo,
}

impl TableLock {
    /// Wait up to `timeout` for the lock.
    pub fn acquire(path: &Path, operation: &str, timeout: Duration) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let start_time = Instant::now();
        loop {
            match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
                Ok(locked) => return Self::locked(path, locked, operation),
                Err((unlocked, Errno::EINTR)) => file = unlocked,
                Err((unlocked, Errno::EWOULDBLOCK)) => {
                    if start_time.elapsed() > timeout {
                        let holder = Self::read_holder(path)
                            .map(|holder| format!(" (held by pid {} for '{}')", holder.pid, holder.operation))
                            .unwrap_or_default();
                        return Err(IpamError::Storage {
                            message: format!(
                                "failed to acquire lock '{}' within {:?}{}",
                                path.display(),
                                timeout,
                                holder
                            ),
                        });
                    }
                    file = unlocked;
                    std::thread::sleep(RETRY_INTERVAL);
                }
                Err((_, errno)) => return Err(io::Error::from(errno).into()),
            }
        }
    }

    fn locked(path: &Path, file: Flock<File>, operation: &str) -> Result<Self> {
        let lock_info = LockInfo {
            pid: std::process::id(),
            timestamp: now_secs(),
            operation: operation.to_string(),
        };

        let mut handle: &File = &file;
        handle.set_len(0)?;
        handle.write_all(&serde_json::to_vec(&lock_info)?)?;
        log::trace!("Acquired lock {} for '{}'", path.display(), operation);

        Ok(Self {
            path: path.to_path_buf(),
            file,
            lock_info,
        })
    }

    /// `None` while the lock is free or its holder is still writing.
    fn read_holder(path: &Path) -> Option<LockInfo> {
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn lock_info(&self) -> &LockInfo {
        &self.lock_info
    }
}

impl std::fmt::Debug for TableLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableLock")
            .field("path", &self.path)
            .field("lock_info", &self.lock_info)
            .finish()
    }
}

impl Drop for TableLock {
    fn drop(&mut self) {
        let handle: &File = &self.file;
        if let Err(e) = handle.set_len(0) {
            log::warn!("Failed to clear lock {}: {}", self.path.display(), e);
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
