//! Exclusive interface allocation ("lock-is-resource").
//!
//! Each interface name maps to a lock file under a fixed directory. Claiming an
//! interface *is* taking a non-blocking exclusive `flock` on its file, so
//! selection and locking happen in one step and two callers can never both
//! claim the same interface. `flock` locks belong to the open file
//! description: they conflict between tasks of the same process as well as
//! between processes, and the kernel drops them when the process exits.

use std::fs::File;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use tracing::{debug, info, warn};

use crate::error::{DialError, Result};
use crate::types::InterfaceHandle;

/// Hands out exclusive claims on interfaces.
#[derive(Debug, Clone)]
pub struct InterfaceAllocator {
    lock_dir: PathBuf,
}

/// Exclusive claim on one interface. Dropping it releases the claim.
#[derive(Debug)]
#[must_use]
pub struct InterfaceLock {
    interface: String,
    path: PathBuf,
    _lock: Flock<File>,
}

impl InterfaceLock {
    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl InterfaceAllocator {
    pub fn new(lock_dir: PathBuf) -> Self {
        Self { lock_dir }
    }

    pub fn lock_dir(&self) -> &Path {
        &self.lock_dir
    }

    /// Lock file for an interface: `<lock_dir>/<iface>.lock`.
    pub fn lock_path(&self, interface: &str) -> PathBuf {
        self.lock_dir.join(format!("{interface}.lock"))
    }

    /// Create the lock directory if needed.
    pub fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.lock_dir).map_err(|e| {
            DialError::Lock(format!("create {}: {e}", self.lock_dir.display()))
        })
    }

    /// Claim the first idle candidate, in order.
    ///
    /// Returns `Ok(None)` when every candidate is held by someone else; the
    /// caller reports exhaustion instead of waiting. Lock files are created
    /// lazily and never removed.
    pub fn try_acquire(
        &self,
        candidates: &[InterfaceHandle],
    ) -> Result<Option<(InterfaceHandle, InterfaceLock)>> {
        for candidate in candidates {
            let path = self.lock_path(&candidate.name);
            let file = File::options()
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)
                .map_err(|e| DialError::Lock(format!("open {}: {e}", path.display())))?;
            match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
                Ok(lock) => {
                    info!(iface = %candidate.name, "claimed interface");
                    return Ok(Some((
                        candidate.clone(),
                        InterfaceLock {
                            interface: candidate.name.clone(),
                            path,
                            _lock: lock,
                        },
                    )));
                }
                Err((_, Errno::EWOULDBLOCK)) => {
                    debug!(iface = %candidate.name, "interface busy");
                }
                Err((_, errno)) => {
                    warn!(iface = %candidate.name, %errno, "unexpected flock error, skipping interface");
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier};

    use super::*;

    fn pool(n: u16) -> Vec<InterfaceHandle> {
        (0..n).map(|i| InterfaceHandle::vlan("eth0", 100 + i)).collect()
    }

    #[test]
    fn acquires_first_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = InterfaceAllocator::new(dir.path().to_path_buf());

        let (iface, lock) = alloc.try_acquire(&pool(3)).unwrap().unwrap();
        assert_eq!(iface.name, "eth0.100");
        assert_eq!(lock.interface(), "eth0.100");
        assert!(lock.path().exists());
    }

    #[test]
    fn skips_held_interfaces() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = InterfaceAllocator::new(dir.path().to_path_buf());
        let candidates = pool(3);

        let (a, _hold_a) = alloc.try_acquire(&candidates).unwrap().unwrap();
        let (b, _hold_b) = alloc.try_acquire(&candidates).unwrap().unwrap();
        let (c, _hold_c) = alloc.try_acquire(&candidates).unwrap().unwrap();

        assert_eq!(a.name, "eth0.100");
        assert_eq!(b.name, "eth0.101");
        assert_eq!(c.name, "eth0.102");
    }

    #[test]
    fn exhausted_pool_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = InterfaceAllocator::new(dir.path().to_path_buf());
        let candidates = pool(2);

        let _held: Vec<_> = (0..2)
            .map(|_| alloc.try_acquire(&candidates).unwrap().unwrap())
            .collect();

        assert!(alloc.try_acquire(&candidates).unwrap().is_none());
    }

    #[test]
    fn released_lock_is_immediately_reacquirable() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = InterfaceAllocator::new(dir.path().to_path_buf());
        let candidates = pool(1);

        let (_, lock) = alloc.try_acquire(&candidates).unwrap().unwrap();
        assert!(alloc.try_acquire(&candidates).unwrap().is_none());

        drop(lock);

        let (again, _lock) = alloc.try_acquire(&candidates).unwrap().unwrap();
        assert_eq!(again.name, "eth0.100");
    }

    #[test]
    fn separate_allocators_share_lock_state() {
        let dir = tempfile::tempdir().unwrap();
        let first = InterfaceAllocator::new(dir.path().to_path_buf());
        let second = InterfaceAllocator::new(dir.path().to_path_buf());
        let candidates = pool(1);

        let _held = first.try_acquire(&candidates).unwrap().unwrap();
        assert!(second.try_acquire(&candidates).unwrap().is_none());
    }

    #[test]
    fn missing_lock_dir_is_lock_error() {
        let alloc = InterfaceAllocator::new(PathBuf::from("/nonexistent/lock/dir"));
        let err = alloc.try_acquire(&pool(1)).unwrap_err();
        assert!(matches!(err, DialError::Lock(_)), "got: {err}");
    }

    #[test]
    fn ensure_dir_creates_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = InterfaceAllocator::new(dir.path().join("a/b"));
        alloc.ensure_dir().unwrap();
        assert!(dir.path().join("a/b").is_dir());
    }

    #[test]
    fn empty_candidate_list_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = InterfaceAllocator::new(dir.path().to_path_buf());
        assert!(alloc.try_acquire(&[]).unwrap().is_none());
    }

    #[test]
    fn concurrent_claims_are_pairwise_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = Arc::new(InterfaceAllocator::new(dir.path().to_path_buf()));
        let candidates = Arc::new(pool(4));
        let barrier = Arc::new(Barrier::new(10));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let alloc = Arc::clone(&alloc);
                let candidates = Arc::clone(&candidates);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    alloc.try_acquire(&candidates).unwrap()
                })
            })
            .collect();

        // Winners return their lock, so every claim stays held until the end.
        let mut names = Vec::new();
        let mut held = Vec::new();
        for handle in handles {
            if let Some((iface, lock)) = handle.join().unwrap() {
                names.push(iface.name);
                held.push(lock);
            }
        }

        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(names.len(), 4);
        assert_eq!(unique.len(), 4);
    }
}
