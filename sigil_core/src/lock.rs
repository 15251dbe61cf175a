//! Exclusive lock scoped to a base directory.
//!
//! Two layers: a process-wide registry of held directories (threads in the
//! same process wait on a condvar), and on Unix an advisory `flock` on the
//! directory handle itself so other processes are excluded too. Nothing is
//! written inside the base directory.

use crate::error::Result;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, MutexGuard, OnceLock, PoisonError};

type Registry = (Mutex<HashSet<PathBuf>>, Condvar);

fn registry() -> &'static Registry {
    static HELD: OnceLock<Registry> = OnceLock::new();
    HELD.get_or_init(|| (Mutex::new(HashSet::new()), Condvar::new()))
}

fn held() -> MutexGuard<'static, HashSet<PathBuf>> {
    registry().0.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Guard holding the exclusive lock for one base directory.
///
/// Released on drop.
#[derive(Debug)]
pub struct DirLock {
    dir: PathBuf,
    #[cfg(unix)]
    handle: fs::File,
}

impl DirLock {
    /// Block until the lock for `dir` is acquired.
    ///
    /// `dir` must exist; it is canonicalized so different spellings of the
    /// same directory share one lock.
    pub fn acquire(dir: &Path) -> Result<Self> {
        let dir = fs::canonicalize(dir)?;

        let (_, available) = registry();
        let mut guard = held();
        while guard.contains(&dir) {
            guard = available
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
        guard.insert(dir.clone());
        drop(guard);

        #[cfg(unix)]
        {
            let handle = match fs::File::open(&dir).and_then(|f| f.lock().map(|()| f)) {
                Ok(handle) => handle,
                Err(e) => {
                    release(&dir);
                    return Err(e.into());
                }
            };
            tracing::trace!(dir = %dir.display(), "acquired directory lock");
            Ok(Self { dir, handle })
        }

        #[cfg(not(unix))]
        {
            tracing::trace!(dir = %dir.display(), "acquired directory lock");
            Ok(Self { dir })
        }
    }

    /// The canonical directory this lock guards.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn release(dir: &Path) {
    let (_, available) = registry();
    held().remove(dir);
    available.notify_all();
}

impl Drop for DirLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        let _ = self.handle.unlock();
        release(&self.dir);
    }
}
