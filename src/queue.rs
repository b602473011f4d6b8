//! Serialization queue.
//!
//! A [`TaskQueue`] admits asynchronous tasks strictly one at a time and in
//! submission order. Every property runs its consumer facing reads and writes
//! through the queue it is assigned, so a network write and a local write to
//! the same property never interleave. Queues are cheap handles: cloning one
//! shares the underlying slot.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct QueueInner {
    // tokio's mutex hands out the lock in FIFO order
    slot: Mutex<()>,
    pending: AtomicUsize,
}

/// Single-concurrency FIFO task runner.
#[derive(Debug, Clone, Default)]
pub struct TaskQueue {
    inner: Arc<QueueInner>,
}

struct PendingGuard<'a>(&'a AtomicUsize);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `task` once every previously submitted task has completed and
    /// returns its output. A failing task only affects its own caller.
    pub async fn run<F>(&self, task: F) -> F::Output
    where
        F: Future,
    {
        self.inner.pending.fetch_add(1, Ordering::AcqRel);
        let _pending = PendingGuard(&self.inner.pending);
        let _slot = self.inner.slot.lock().await;
        task.await
    }

    /// Number of tasks submitted and not yet completed, the running one
    /// included.
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Whether both handles share the same underlying queue.
    pub fn same_queue(&self, other: &TaskQueue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BacnetError;
    use parking_lot::Mutex as SyncMutex;
    use tokio::sync::oneshot;
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn test_second_task_waits_for_first() {
        let queue = TaskQueue::new();
        let (tx, rx) = oneshot::channel::<u32>();

        let mut first = task::spawn(queue.run(async move { rx.await.unwrap_or(0) }));
        let mut second = task::spawn(queue.run(async { 7 }));

        assert_pending!(first.poll());
        assert_pending!(second.poll());
        assert_eq!(queue.pending(), 2);

        tx.send(3).unwrap();
        assert!(first.is_woken());
        assert_eq!(assert_ready!(first.poll()), 3);
        assert!(second.is_woken());
        assert_eq!(assert_ready!(second.poll()), 7);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_tasks_run_in_submission_order() {
        let queue = TaskQueue::new();
        let log = Arc::new(SyncMutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..10u32 {
            let queue = queue.clone();
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .run(async move {
                        log.lock().push(format!("start {i}"));
                        tokio::task::yield_now().await;
                        log.lock().push(format!("end {i}"));
                    })
                    .await
            }));
            // let the spawned task enqueue before the next one
            tokio::task::yield_now().await;
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let log = log.lock();
        for (i, pair) in log.chunks(2).enumerate() {
            assert_eq!(pair[0], format!("start {i}"));
            assert_eq!(pair[1], format!("end {i}"));
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_halt_queue() {
        let queue = TaskQueue::new();
        let failed: Result<(), BacnetError> = queue
            .run(async { Err(BacnetError::internal("boom")) })
            .await;
        assert!(failed.is_err());

        let ok = queue.run(async { 42 }).await;
        assert_eq!(ok, 42);
    }

    #[test]
    fn test_clones_share_queue() {
        let a = TaskQueue::new();
        let b = a.clone();
        assert!(a.same_queue(&b));
        assert!(!a.same_queue(&TaskQueue::new()));
    }
}
