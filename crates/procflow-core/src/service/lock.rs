//! Per-process trigger serialization.
//!
//! Trigger calls on the same process must never interleave; calls on
//! different processes run concurrently. `ProcessLocks` hands out one async
//! mutex per process id, created on first use and dropped again once the
//! last holder or waiter lets go, so the map only holds processes in use.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

type LockMap = DashMap<Uuid, Arc<Mutex<()>>>;

/// Registry of per-process mutexes.
///
/// Cloning produces a shared view of the same locks (backed by `Arc`).
#[derive(Debug, Clone, Default)]
pub struct ProcessLocks {
    inner: Arc<LockMap>,
}

/// Exclusive access to one process. Releasing it forgets the mutex when no
/// other task is waiting for the same process.
#[derive(Debug)]
pub struct ProcessGuard {
    id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap>,
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters clone the Arc under the shard lock, so a count of one means
        // only the map still refers to the mutex.
        self.locks
            .remove_if(&self.id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl ProcessLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to process `id`.
    ///
    /// The `DashMap` guard is released before awaiting the mutex.
    pub async fn acquire(&self, id: Uuid) -> ProcessGuard {
        let mutex = self
            .inner
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        let guard = mutex.lock_owned().await;
        ProcessGuard {
            id,
            guard: Some(guard),
            locks: Arc::clone(&self.inner),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
