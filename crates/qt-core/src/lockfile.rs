//! Single-writer lock for a memory file.
//!
//! The store rewrites the whole document on every mutation and has no
//! internal locking, so at most one process may mutate a given file. A
//! [`WriterLock`] is a sibling file `<memory>.lock` holding the owner's PID.
//!
//! ## Race safety
//!
//! [`WriterLock::acquire`] creates the lock with `O_CREAT | O_EXCL`. Two
//! racing writers get exactly one winner; the loser sees `AlreadyExists` and
//! checks whether the winner is still alive.
//!
//! ## Stale lock recovery
//!
//! If the recorded PID is dead (crash, SIGKILL) the lock is removed and the
//! acquire is retried once.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Contents of a lock file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    pub acquired_at: String,
    /// What the holder is doing, e.g. `run`.
    pub command: String,
}

impl LockInfo {
    pub fn is_alive(&self) -> bool {
        pid_alive(self.pid)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("memory file is locked by pid {} ({}) since {}", .0.pid, .0.command, .0.acquired_at)]
    Held(LockInfo),
    #[error("failed to acquire lock after stale cleanup: {0}")]
    Contended(String),
    #[error("lock I/O error: {0}")]
    Io(#[from] std::io::Error),
}

enum Attempt {
    Acquired,
    Held(LockInfo),
    StaleRemoved,
}

/// Held for as long as this value lives; the file is removed on drop.
#[derive(Debug)]
pub struct WriterLock {
    path: PathBuf,
    info: LockInfo,
}

impl WriterLock {
    /// Lock path for a memory file: `<memory>.lock`.
    pub fn path_for(memory_path: &Path) -> PathBuf {
        let mut name = memory_path.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Take the writer lock for `memory_path`, clearing a stale lock once.
    pub fn acquire(memory_path: &Path, command: &str) -> Result<Self, LockError> {
        let path = Self::path_for(memory_path);
        let info = LockInfo {
            pid: std::process::id(),
            acquired_at: chrono::Utc::now().to_rfc3339(),
            command: command.to_string(),
        };

        for attempt in 0..2 {
            match try_create(&path, &info)? {
                Attempt::Acquired => {
                    tracing::debug!(lock = %path.display(), "writer lock acquired");
                    return Ok(Self { path, info });
                }
                Attempt::Held(holder) => return Err(LockError::Held(holder)),
                Attempt::StaleRemoved if attempt == 0 => {
                    tracing::info!(lock = %path.display(), "stale writer lock removed, retrying");
                }
                Attempt::StaleRemoved => break,
            }
        }
        Err(LockError::Contended(path.display().to_string()))
    }

    /// Current holder of the lock for `memory_path`, if any and alive.
    pub fn holder(memory_path: &Path) -> Option<LockInfo> {
        read(&Self::path_for(memory_path)).filter(LockInfo::is_alive)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self) -> &LockInfo {
        &self.info
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
        tracing::debug!(lock = %self.path.display(), "writer lock released");
    }
}

fn try_create(path: &Path, info: &LockInfo) -> Result<Attempt, LockError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            let json = serde_json::to_string_pretty(info).map_err(std::io::Error::other)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
            Ok(Attempt::Acquired)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => match read(path) {
            Some(existing) if existing.is_alive() => Ok(Attempt::Held(existing)),
            // Dead holder or unreadable contents.
            _ => {
                tracing::info!(lock = %path.display(), "removing stale writer lock");
                let _ = std::fs::remove_file(path);
                Ok(Attempt::StaleRemoved)
            }
        },
        Err(e) => Err(e.into()),
    }
}

fn read(path: &Path) -> Option<LockInfo> {
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

#[cfg(unix)]
fn pid_alive(pid: u32) -> bool {
    // SAFETY: signal 0 only checks that the process exists.
    unsafe { libc::kill(pid as i32, 0) == 0 }
}

#[cfg(not(unix))]
fn pid_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_pid_is_alive() {
        assert!(pid_alive(std::process::id()));
    }

    #[test]
    fn bogus_pid_is_dead() {
        assert!(!pid_alive(4_000_000));
    }

    #[test]
    fn lock_path_appends_suffix() {
        let path = WriterLock::path_for(Path::new("/tmp/four_agent_memory.json"));
        assert_eq!(path, PathBuf::from("/tmp/four_agent_memory.json.lock"));
    }

    #[test]
    fn second_live_writer_is_refused() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let memory = dir.path().join("memory.json");

        let first = WriterLock::acquire(&memory, "run").unwrap();
        assert!(first.path().exists());
        assert_eq!(WriterLock::holder(&memory).unwrap().command, "run");

        let err = WriterLock::acquire(&memory, "reset").unwrap_err();
        assert!(matches!(err, LockError::Held(ref info) if info.pid == std::process::id()));

        drop(first);
        assert!(WriterLock::holder(&memory).is_none());
        WriterLock::acquire(&memory, "reset").unwrap();
    }

    #[test]
    fn stale_lock_is_reclaimed() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let memory = dir.path().join("memory.json");
        let stale = LockInfo {
            pid: 4_000_000,
            acquired_at: "2026-01-01T00:00:00Z".into(),
            command: "run".into(),
        };
        std::fs::write(
            WriterLock::path_for(&memory),
            serde_json::to_string(&stale).unwrap(),
        )
        .unwrap();

        let lock = WriterLock::acquire(&memory, "dashboard").unwrap();
        assert_eq!(lock.info().pid, std::process::id());
    }

    #[test]
    fn garbage_lock_is_reclaimed() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let memory = dir.path().join("memory.json");
        std::fs::write(WriterLock::path_for(&memory), "not json").unwrap();
        assert!(WriterLock::acquire(&memory, "run").is_ok());
    }
}
