//! The process-wide worker pool.

use std::fmt;
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use super::task::{TaskControl, TaskHandle};

/// Runs indexing, usage searches and symbol searches.
pub struct WorkerPool {
    pool: ThreadPool,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

impl WorkerPool {
    /// A pool with `threads` workers; 0 picks rayon's default.
    pub fn new(threads: usize) -> crate::Result<Arc<Self>> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("codemodel-worker-{i}"))
            .build()?;
        debug!(threads = pool.current_num_threads(), "worker pool started");
        Ok(Arc::new(Self { pool }))
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `job` on the pool under `control`. The job is skipped if the task
    /// was canceled before a worker picked it up; otherwise the task is
    /// finished when the job returns.
    pub fn spawn(&self, control: Arc<TaskControl>, job: impl FnOnce(&TaskControl) + Send + 'static) -> TaskHandle {
        let handle = TaskHandle::new(control.clone());
        self.pool.spawn(move || {
            if !control.start() {
                debug!(task = %control.id(), name = control.name(), "canceled before start");
                return;
            }
            job(&control);
            let state = control.finish();
            debug!(task = %control.id(), name = control.name(), ?state, "task finished");
        });
        handle
    }

    /// Run a parallel computation inside the pool.
    pub fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        self.pool.install(op)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::ide::task::TaskState;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_spawn_runs_and_finishes() {
        let pool = WorkerPool::new(2).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = counter.clone();
        let handle = pool.spawn(TaskControl::new("count"), move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(handle.wait(), TaskState::Completed);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_canceled_task_is_skipped() {
        let pool = WorkerPool::new(1).unwrap();
        let control = TaskControl::new("skipped");
        control.cancel();
        let ran = Arc::new(AtomicUsize::new(0));
        let seen = ran.clone();
        let handle = pool.spawn(control, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(handle.wait(), TaskState::Canceled);
        pool.install(|| ());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_wait_inside_pool_does_not_starve() {
        let pool = WorkerPool::new(1).unwrap();
        let inner_pool = pool.clone();
        let outer = pool.spawn(TaskControl::new("outer"), move |_| {
            let inner = inner_pool.spawn(TaskControl::new("inner"), |_| {});
            assert_eq!(inner.wait(), TaskState::Completed);
        });
        assert_eq!(outer.wait(), TaskState::Completed);
    }
}
