//! Single-run mutual exclusion with staleness-based reclamation.
//!
//! [`RunLock`] is the abstraction the orchestrator holds for the duration
//! of a run. Acquisition never blocks: a fresh lock held by someone else is
//! an immediate [`LockError::Held`]. A lock older than the staleness window
//! is presumed abandoned and reclaimed.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::{LockError, UtcDateTime};

/// A process-wide exclusive resource guarding one run at a time.
pub trait RunLock: Send + Sync {
    /// Take the lock, reclaiming it if the current holder is stale.
    fn try_acquire(&self) -> Result<(), LockError>;

    /// Give the lock back. A no-op unless this instance acquired it.
    fn release(&self) -> Result<(), LockError>;

    /// Human-readable location of the lock, for logs and errors.
    fn describe(&self) -> String;
}

/// Scoped holder that releases the lock on every exit path.
pub struct RunLockGuard<'a> {
    lock: &'a dyn RunLock,
}

impl<'a> RunLockGuard<'a> {
    pub fn acquire(lock: &'a dyn RunLock) -> Result<Self, LockError> {
        lock.try_acquire()?;
        tracing::debug!(lock = %lock.describe(), "run lock acquired");
        Ok(Self { lock })
    }
}

impl Drop for RunLockGuard<'_> {
    fn drop(&mut self) {
        match self.lock.release() {
            Ok(()) => tracing::debug!(lock = %self.lock.describe(), "run lock released"),
            Err(error) => {
                tracing::warn!(lock = %self.lock.describe(), %error, "failed to release run lock");
            }
        }
    }
}

/// Lock backed by a sentinel file holding the acquisition timestamp.
///
/// Staleness is judged from the file's modification time.
#[derive(Debug)]
pub struct FileRunLock {
    path: PathBuf,
    stale_after: Duration,
    acquired: AtomicBool,
}

impl FileRunLock {
    pub fn new(path: impl Into<PathBuf>, stale_after: Duration) -> Self {
        Self {
            path: path.into(),
            stale_after,
            acquired: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_acquired(&self) -> bool {
        self.acquired.load(Ordering::SeqCst)
    }

    fn create(&self) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)?;
        file.write_all(UtcDateTime::now().format_rfc3339().as_bytes())?;
        file.sync_all()
    }

    fn age(&self) -> std::io::Result<Duration> {
        file_age(&self.path)
    }

    /// Move the lock file aside under a name unique to this attempt, then
    /// delete it.
    ///
    /// Returns `false` when the file moved aside is fresh: another contender
    /// reclaimed and re-created the lock after our staleness check. That lock
    /// is linked back into place untouched.
    fn reclaim(&self) -> std::io::Result<bool> {
        let aside = self.aside_path();
        match fs::rename(&self.path, &aside) {
            Ok(()) => {}
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(true),
            Err(error) => return Err(error),
        }

        let age = file_age(&aside)?;
        if age < self.stale_after {
            let restored = fs::hard_link(&aside, &self.path);
            fs::remove_file(&aside)?;
            return match restored {
                Ok(()) => Ok(false),
                Err(error) if error.kind() == ErrorKind::AlreadyExists => Ok(false),
                Err(error) => Err(error),
            };
        }

        fs::remove_file(&aside)?;
        Ok(true)
    }

    fn aside_path(&self) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".stale-{}-{nanos}", std::process::id()));
        self.path.with_file_name(name)
    }
}

fn file_age(path: &Path) -> std::io::Result<Duration> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO))
}

impl RunLock for FileRunLock {
    fn try_acquire(&self) -> Result<(), LockError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // One reclaim attempt: if a new holder appears after the stale file
        // is gone, that holder wins.
        for _ in 0..2 {
            match self.create() {
                Ok(()) => {
                    self.acquired.store(true, Ordering::SeqCst);
                    return Ok(());
                }
                Err(error) if error.kind() == ErrorKind::AlreadyExists => {}
                Err(error) => return Err(error.into()),
            }

            let age = match self.age() {
                Ok(age) => age,
                Err(error) if error.kind() == ErrorKind::NotFound => continue,
                Err(error) => return Err(error.into()),
            };
            if age < self.stale_after {
                return Err(LockError::Held {
                    location: self.describe(),
                    age_seconds: age.as_secs(),
                });
            }

            tracing::warn!(
                lock = %self.describe(),
                age_seconds = age.as_secs(),
                "reclaiming stale run lock"
            );
            if !self.reclaim()? {
                return Err(LockError::Held {
                    location: self.describe(),
                    age_seconds: 0,
                });
            }
        }

        Err(LockError::Held {
            location: self.describe(),
            age_seconds: 0,
        })
    }

    fn release(&self) -> Result<(), LockError> {
        if !self.acquired.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process lock; handles created with [`MemoryRunLock::handle`] contend
/// for the same slot. Useful where a file is not wanted (tests, embedding).
#[derive(Debug)]
pub struct MemoryRunLock {
    slot: Arc<Mutex<Option<Instant>>>,
    stale_after: Duration,
    acquired: AtomicBool,
}

impl MemoryRunLock {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            stale_after,
            acquired: AtomicBool::new(false),
        }
    }

    /// Another contender for the same slot.
    pub fn handle(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
            stale_after: self.stale_after,
            acquired: AtomicBool::new(false),
        }
    }

    fn poisoned() -> LockError {
        LockError::Io(std::io::Error::other("memory run lock poisoned"))
    }
}

impl RunLock for MemoryRunLock {
    fn try_acquire(&self) -> Result<(), LockError> {
        let mut slot = self.slot.lock().map_err(|_| Self::poisoned())?;
        if let Some(taken_at) = *slot {
            let age = taken_at.elapsed();
            if age < self.stale_after {
                return Err(LockError::Held {
                    location: self.describe(),
                    age_seconds: age.as_secs(),
                });
            }
            tracing::warn!(age_seconds = age.as_secs(), "reclaiming stale in-memory run lock");
        }
        *slot = Some(Instant::now());
        self.acquired.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) -> Result<(), LockError> {
        if !self.acquired.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        let mut slot = self.slot.lock().map_err(|_| Self::poisoned())?;
        *slot = None;
        Ok(())
    }

    fn describe(&self) -> String {
        String::from("memory")
    }
}
