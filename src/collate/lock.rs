use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

use crate::error::{HarnessError, HarnessResult};

/// Lock file name placed in the screenshots root during a collation pass
pub const LOCK_FILE_NAME: &str = ".collate.lock";

/// A lock file without a readable PID is only reclaimed after this long,
/// so a pass that has created the file but not yet written to it is safe.
pub const UNREADABLE_LOCK_GRACE: Duration = Duration::from_secs(60);

/// Exclusive advisory lock over an organized output tree.
///
/// Held for the duration of one collation pass. The lock file is created
/// atomically, holds the owner's PID and is removed when the guard drops.
/// A lock left behind by a process that no longer exists is reclaimed.
#[derive(Debug)]
pub struct CollationLock {
    path: PathBuf,
}

impl CollationLock {
    /// Take the lock in `dir`, failing with `Locked` if a live pass holds it
    pub fn acquire(dir: &Path) -> HarnessResult<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(LOCK_FILE_NAME);

        match Self::create(&path) {
            Err(HarnessError::Locked(_)) if is_stale(&path) => {
                warn!(lock = %path.display(), "reclaiming stale collation lock");
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                Self::create(&path)
            }
            other => other,
        }
    }

    fn create(path: &Path) -> HarnessResult<Self> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(HarnessError::Locked(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", std::process::id())?;

        debug!(lock = %path.display(), "acquired collation lock");
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CollationLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), error = %e, "failed to release collation lock");
        }
    }
}

/// Whether the lock at `path` was left behind by a pass that is gone
fn is_stale(path: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(path) else {
        return false;
    };
    match contents.trim().parse::<i32>() {
        Ok(pid) => !process_alive(pid),
        Err(_) => fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .is_some_and(|age| age > UNREADABLE_LOCK_GRACE),
    }
}

#[cfg(unix)]
fn process_alive(pid: i32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    // 0 and negative values address process groups, never a lock owner
    if pid <= 0 {
        return false;
    }
    // EPERM still means the process exists
    !matches!(kill(Pid::from_raw(pid), None::<Signal>), Err(Errno::ESRCH))
}

#[cfg(not(unix))]
fn process_alive(_pid: i32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_is_exclusive_and_released_on_drop() {
        let tmp = TempDir::new().unwrap();

        let lock = CollationLock::acquire(tmp.path()).unwrap();
        assert!(lock.path().exists());
        assert!(matches!(
            CollationLock::acquire(tmp.path()),
            Err(HarnessError::Locked(_))
        ));

        drop(lock);
        assert!(!tmp.path().join(LOCK_FILE_NAME).exists());
        assert!(CollationLock::acquire(tmp.path()).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_lock_of_dead_process_is_reclaimed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(LOCK_FILE_NAME);
        fs::write(&path, "999999999\n").unwrap();

        let lock = CollationLock::acquire(tmp.path()).unwrap();
        let owner = fs::read_to_string(lock.path()).unwrap();
        assert_eq!(owner.trim(), std::process::id().to_string());
    }

    #[test]
    fn test_lock_of_live_process_is_kept() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(LOCK_FILE_NAME);
        fs::write(&path, format!("{}\n", std::process::id())).unwrap();

        assert!(matches!(
            CollationLock::acquire(tmp.path()),
            Err(HarnessError::Locked(_))
        ));
        assert!(path.exists());
    }

    #[test]
    fn test_unreadable_lock_reclaimed_only_after_grace() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(LOCK_FILE_NAME);
        fs::write(&path, "").unwrap();

        assert!(matches!(
            CollationLock::acquire(tmp.path()),
            Err(HarnessError::Locked(_))
        ));

        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - UNREADABLE_LOCK_GRACE * 2)
            .unwrap();
        drop(file);

        assert!(CollationLock::acquire(tmp.path()).is_ok());
    }
}
