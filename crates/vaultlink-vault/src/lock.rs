use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use vaultlink_protocol::{RelayError, VAULT_LOCK_FILE};

/// How long to wait for a competing writer before giving up.
const ACQUIRE_ATTEMPTS: u32 = 20;
const ACQUIRE_BACKOFF: Duration = Duration::from_millis(50);

/// Scoped exclusive lock on a vault directory.
///
/// Concurrent processes sharing one vault directory must not write
/// simultaneously; the lock file (created with `create_new`, removed on
/// drop) serializes them. Held only for the duration of a single record
/// write.
pub(crate) struct VaultLock {
    path: PathBuf,
}

impl VaultLock {
    pub(crate) fn acquire(dir: &Path) -> Result<Self, RelayError> {
        let path = dir.join(VAULT_LOCK_FILE);
        for attempt in 0..ACQUIRE_ATTEMPTS {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if attempt + 1 == ACQUIRE_ATTEMPTS {
                        break;
                    }
                    std::thread::sleep(ACQUIRE_BACKOFF);
                }
                Err(e) => return Err(RelayError::Io(e)),
            }
        }
        Err(RelayError::Io(io::Error::new(
            io::ErrorKind::WouldBlock,
            format!("vault directory is locked: {}", path.display()),
        )))
    }
}

impl Drop for VaultLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to release vault lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_is_exclusive_and_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let lock = VaultLock::acquire(dir.path()).unwrap();
        assert!(dir.path().join(VAULT_LOCK_FILE).exists());
        drop(lock);
        assert!(!dir.path().join(VAULT_LOCK_FILE).exists());
        // Re-acquirable after release.
        let _lock = VaultLock::acquire(dir.path()).unwrap();
    }
}
