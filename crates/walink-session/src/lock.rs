// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exclusive per-device lock file.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};

use tracing::warn;
use walink_core::WalinkError;

/// Lock files held by this process.
static HELD: LazyLock<Mutex<HashSet<PathBuf>>> = LazyLock::new(|| Mutex::new(HashSet::new()));

fn held() -> std::sync::MutexGuard<'static, HashSet<PathBuf>> {
    HELD.lock().unwrap_or_else(|e| e.into_inner())
}

/// Held for the lifetime of a credential store; removes the lock file on drop.
#[derive(Debug)]
pub(crate) struct DeviceLock {
    path: PathBuf,
}

impl DeviceLock {
    /// Create `path` exclusively, recording our pid.
    ///
    /// A lock left behind by a process that no longer exists is reclaimed once.
    /// So is one that records our own pid without this process holding it
    /// (a restart that reused the pid, e.g. PID 1 in a container).
    pub(crate) fn acquire(path: &Path) -> Result<Self, WalinkError> {
        match Self::try_create(path) {
            Ok(lock) => Ok(lock),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let owner = read_owner(path);
                if owner.is_some_and(|pid| is_stale(pid, path)) {
                    warn!(
                        lock = %path.display(),
                        stale_pid = owner,
                        "reclaiming stale device lock"
                    );
                    std::fs::remove_file(path).map_err(|e| {
                        WalinkError::credential(
                            format!("failed to remove stale lock {}", path.display()),
                            e,
                        )
                    })?;
                    return Self::try_create(path).map_err(|e| {
                        WalinkError::credential(
                            format!("failed to create lock {}", path.display()),
                            e,
                        )
                    });
                }
                Err(WalinkError::Credential {
                    message: format!(
                        "device is already in use (lock {} held by pid {})",
                        path.display(),
                        owner.map_or_else(|| "unknown".to_string(), |p| p.to_string())
                    ),
                    source: None,
                })
            }
            Err(e) => Err(WalinkError::credential(
                format!("failed to create lock {}", path.display()),
                e,
            )),
        }
    }

    fn try_create(path: &Path) -> std::io::Result<Self> {
        let mut file = OpenOptions::new().create_new(true).write(true).open(path)?;
        if let Err(e) = writeln!(file, "pid={}", std::process::id()) {
            let _ = std::fs::remove_file(path);
            return Err(e);
        }
        held().insert(path.to_path_buf());
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for DeviceLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
        held().remove(&self.path);
    }
}

fn read_owner(path: &Path) -> Option<u32> {
    let content = std::fs::read_to_string(path).ok()?;
    content.trim().strip_prefix("pid=")?.parse().ok()
}

fn is_stale(owner: u32, path: &Path) -> bool {
    if owner == std::process::id() {
        return !held().contains(path);
    }
    !process_alive(owner)
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists()
}

// Without /proc there is no cheap liveness probe; assume the owner is alive.
#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dev.lock");

        let _held = DeviceLock::acquire(&path).unwrap();
        let err = DeviceLock::acquire(&path).unwrap_err();
        assert!(err.to_string().contains("already in use"), "{err}");
    }

    #[test]
    fn drop_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dev.lock");

        drop(DeviceLock::acquire(&path).unwrap());
        assert!(!path.exists());
        let _again = DeviceLock::acquire(&path).unwrap();
    }

    #[test]
    fn lock_recording_our_pid_is_reclaimed_when_not_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dev.lock");
        // Left by an earlier run that had the same pid.
        std::fs::write(&path, format!("pid={}\n", std::process::id())).unwrap();

        let lock = DeviceLock::acquire(&path).unwrap();
        assert!(path.exists());
        // Once we hold it, a second acquire in this process is refused.
        assert!(DeviceLock::acquire(&path).is_err());
        drop(lock);
        assert!(!path.exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn stale_lock_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dev.lock");
        // pid_max on Linux is at most 2^22, so this pid cannot exist.
        std::fs::write(&path, "pid=4294967\n").unwrap();

        let _lock = DeviceLock::acquire(&path).unwrap();
        assert_eq!(read_owner(&path), Some(std::process::id()));
    }
}
