use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// A shared session store that may hold a lock for the duration of a request.
///
/// Streaming responses call [`SessionStore::release`] before the handler
/// callback runs so a long-lived connection never pins the lock.
pub trait SessionStore: Send + Sync {
    /// Persists pending writes and gives up the lock. Must be idempotent.
    fn release(&self);

    fn is_locked(&self) -> bool;
}

/// In-process session store backed by atomics.
pub struct MemorySession {
    locked: AtomicBool,
    /// Number of times the lock was actually given up.
    releases: AtomicUsize,
}

impl MemorySession {
    /// Creates a session that starts out locked, as a session opened for a request would.
    pub fn new() -> Self {
        Self {
            locked: AtomicBool::new(true),
            releases: AtomicUsize::new(0),
        }
    }

    pub fn lock(&self) {
        self.locked.store(true, Ordering::Release);
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::Acquire)
    }
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySession {
    fn release(&self) {
        if self
            .locked
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.releases.fetch_add(1, Ordering::AcqRel);
            tracing::debug!("MemorySession: lock released");
        }
    }

    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}
