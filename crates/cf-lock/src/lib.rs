//! Advisory exclusive locking over a run directory.
//!
//! Two drivers racing to write `pipeline_state.json` for the same run is
//! the one concurrency hazard this workspace guards against explicitly -
//! a run directory is mutated exclusively by whichever process holds the
//! lock. `RunLock` is a thin
//! wrapper over an `fd_lock::RwLock<File>` so acquisition is a single
//! non-blocking syscall rather than a poll loop; it is advisory (cooperating
//! processes only), not a security boundary, matching the lock system this
//! crate's lineage implements for concurrent spec execution.

use std::fs::{self, File, OpenOptions};
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while acquiring or releasing a run lock.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("run '{run_id}' is already locked by another process (pid {pid}, since {since})")]
    Held {
        run_id: String,
        pid: u32,
        since: String,
    },
    #[error("failed to acquire lock for run '{run_id}': {reason}")]
    AcquisitionFailed { run_id: String, reason: String },
}

/// Metadata written into the lock file, useful for diagnosing a held lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LockInfo {
    pid: u32,
    created_at: DateTime<Utc>,
}

/// An exclusive hold on a run directory's lock file. Dropping it releases
/// the underlying OS lock; the lock file itself is left on disk (its
/// presence is not load-bearing - only the OS-level advisory lock is).
pub struct RunLock {
    _guard: RwLock<File>,
    path: Utf8PathBuf,
}

impl RunLock {
    /// Attempt to acquire the lock for `run_dir` immediately, without
    /// blocking. Returns `LockError::Held` if another live process holds it.
    pub fn acquire(run_dir: &Utf8Path, run_id: &str) -> Result<Self, LockError> {
        fs::create_dir_all(run_dir).map_err(|e| LockError::AcquisitionFailed {
            run_id: run_id.to_string(),
            reason: e.to_string(),
        })?;
        let path = run_dir.join(".lock");

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path.as_std_path())
            .map_err(|e| LockError::AcquisitionFailed {
                run_id: run_id.to_string(),
                reason: e.to_string(),
            })?;

        let mut rw_lock = RwLock::new(file);
        let info = LockInfo {
            pid: std::process::id(),
            created_at: Utc::now(),
        };

        match rw_lock.try_write() {
            Ok(mut guard) => {
                let payload = serde_json::to_vec(&info).unwrap_or_default();
                write_lock_payload(&mut guard, &payload)
                    .map_err(|e| LockError::AcquisitionFailed {
                        run_id: run_id.to_string(),
                        reason: e.to_string(),
                    })?;
                drop(guard);
                Ok(Self {
                    _guard: rw_lock,
                    path,
                })
            }
            Err(_) => {
                let existing = read_lock_info(&path).unwrap_or(LockInfo {
                    pid: 0,
                    created_at: Utc::now(),
                });
                Err(LockError::Held {
                    run_id: run_id.to_string(),
                    pid: existing.pid,
                    since: existing.created_at.to_rfc3339(),
                })
            }
        }
    }

    /// Path of the lock file backing this hold.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

fn write_lock_payload(file: &mut File, payload: &[u8]) -> io::Result<()> {
    use std::io::{Seek, SeekFrom, Write};
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(payload)?;
    file.sync_all()
}

fn read_lock_info(path: &Utf8Path) -> Option<LockInfo> {
    let content = fs::read(path.as_std_path()).ok()?;
    serde_json::from_slice(&content).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_succeeds_on_fresh_directory() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let lock = RunLock::acquire(&run_dir, "run-1");
        assert!(lock.is_ok());
    }

    #[test]
    fn second_acquire_in_same_process_contends() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let first = RunLock::acquire(&run_dir, "run-1").unwrap();
        let second = RunLock::acquire(&run_dir, "run-1");
        assert!(second.is_err());
        drop(first);
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        {
            let _lock = RunLock::acquire(&run_dir, "run-1").unwrap();
        }
        let reacquired = RunLock::acquire(&run_dir, "run-1");
        assert!(reacquired.is_ok());
    }
}
