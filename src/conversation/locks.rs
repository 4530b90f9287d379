//! Per-thread mutual exclusion.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Async locks keyed by thread id.
///
/// A turn holds its thread's lock from the first read of the history to the
/// final append, so two requests on one thread never interleave. Entries are
/// dropped once nobody holds or waits on them.
#[derive(Default)]
pub struct ThreadLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ThreadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `thread_id`.
    pub async fn acquire(&self, thread_id: &str) -> ThreadGuard<'_> {
        let lock = self
            .locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = lock.lock_owned().await;

        ThreadGuard {
            locks: self,
            thread_id: thread_id.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of lock entries currently tracked.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive access to one thread; released on drop.
pub struct ThreadGuard<'a> {
    locks: &'a ThreadLocks,
    thread_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ThreadGuard<'_> {
    fn drop(&mut self) {
        // Release the mutex first so its Arc no longer counts as a holder.
        drop(self.guard.take());
        self.locks
            .locks
            .remove_if(&self.thread_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_entries_pruned_after_release() {
        let locks = ThreadLocks::new();
        {
            let _guard = locks.acquire("t1").await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_same_thread_is_serialised() {
        let locks = Arc::new(ThreadLocks::new());
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let locks = locks.clone();
            let active = active.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("shared").await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_threads_do_not_block() {
        let locks = ThreadLocks::new();
        let _a = locks.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("b")).await;
        assert!(b.is_ok());
    }
}
