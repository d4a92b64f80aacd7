//! Bounded worker pool.

use crate::config::WorkerPoolConfig;
use crate::error::{CoreError, CoreResult};
use crate::worker::OperationFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::oneshot;
use tracing::debug;

/// Runs blocking operations on a bounded set of threads.
///
/// At most `threads` tasks run at once; further tasks wait in the queue.
pub struct WorkerPool {
    runtime: Option<Runtime>,
    threads: usize,
}

impl WorkerPool {
    /// Starts a pool.
    pub fn new(config: &WorkerPoolConfig) -> CoreResult<Self> {
        if config.threads == 0 {
            return Err(CoreError::worker_unavailable("pool needs at least one thread"));
        }
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(config.threads)
            .thread_name(config.thread_name.clone())
            .enable_all()
            .build()
            .map_err(|e| CoreError::worker_unavailable(e.to_string()))?;
        debug!(threads = config.threads, "started worker pool");
        Ok(Self {
            runtime: Some(runtime),
            threads: config.threads,
        })
    }

    /// Returns the maximum number of concurrently running tasks.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Schedules a task.
    ///
    /// If the returned future is cancelled before the task starts, the task
    /// is skipped and the future completes with `Cancelled`. A panicking task
    /// completes the future with `WorkerLost`.
    pub fn submit<T, F>(&self, task: F) -> OperationFuture<T>
    where
        T: Send + 'static,
        F: FnOnce() -> CoreResult<T> + Send + 'static,
    {
        let Some(runtime) = &self.runtime else {
            return OperationFuture::failed(CoreError::worker_unavailable("pool is shut down"));
        };
        let (sender, receiver) = oneshot::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        runtime.spawn_blocking(move || {
            let result = if flag.load(Ordering::SeqCst) {
                Err(CoreError::Cancelled)
            } else {
                task()
            };
            // The caller may have dropped the future.
            let _ = sender.send(result);
        });
        OperationFuture::pending(receiver, cancelled)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
            debug!("worker pool shut down");
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads)
            .field("running", &self.runtime.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::time::Duration;

    fn pool(threads: usize) -> WorkerPool {
        WorkerPool::new(&WorkerPoolConfig::new().threads(threads)).unwrap()
    }

    #[test]
    fn runs_tasks() {
        let pool = pool(2);
        assert_eq!(pool.submit(|| Ok(21 * 2)).wait().unwrap(), 42);
    }

    #[test]
    fn zero_threads_rejected() {
        assert!(WorkerPool::new(&WorkerPoolConfig::new().threads(0)).is_err());
    }

    #[test]
    fn cancelled_before_start_skips_task() {
        let pool = pool(1);
        let gate = Arc::new(Barrier::new(2));
        let blocker = {
            let gate = Arc::clone(&gate);
            pool.submit(move || {
                gate.wait();
                Ok(())
            })
        };

        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let queued = pool.submit(move || {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });
        assert!(queued.cancel());
        gate.wait();

        blocker.wait().unwrap();
        assert!(matches!(queued.wait(), Err(CoreError::Cancelled)));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn panicking_task_is_worker_lost() {
        let pool = pool(1);
        let future = pool.submit::<(), _>(|| panic!("boom"));
        assert!(matches!(future.wait(), Err(CoreError::WorkerLost { .. })));
        assert_eq!(pool.submit(|| Ok(1)).wait().unwrap(), 1);
    }

    #[test]
    fn concurrency_is_bounded() {
        let pool = pool(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let futures: Vec<_> = (0..8)
            .map(|_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                pool.submit(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(10));
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();
        for future in futures {
            future.wait().unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
