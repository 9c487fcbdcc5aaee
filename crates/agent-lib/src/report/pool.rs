//! Bounded worker pool with batch completion synchronization
//!
//! A fixed number of permanently running workers consume tasks from a
//! bounded queue. The caller tracks batch completion through `drain`, which
//! waits until every task submitted so far has finished executing. The pool
//! is reused across collection cycles; it is never rebuilt mid-run.

use async_trait::async_trait;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::debug;

/// A unit of work executed by a pool worker.
///
/// Implementations form a closed, tagged set of variants; the worker never
/// inspects the payload beyond calling `run`. A task owns everything it
/// needs and handles its own failures internally — `run` does not return an
/// error because nothing upstream could act on one.
#[async_trait]
pub trait PoolTask: Send + 'static {
    async fn run(self);
}

/// Submission failure. The task is dropped, the drop is counted, and the
/// caller decides whether that matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("worker pool is closed")]
    Closed,
}

/// Configuration for a [`ReportPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of concurrent workers. Fixed at construction.
    pub workers: usize,
    /// Queue capacity. Sized to absorb a full cycle's worth of tasks so
    /// submission does not block in the steady state.
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            queue_capacity: 1024,
        }
    }
}

/// State shared between the pool handle and its workers.
struct PoolShared {
    /// Tasks submitted but not yet completed. Incremented before a task is
    /// handed to the queue, decremented exactly once when its body finishes.
    pending: AtomicUsize,
    /// Signaled whenever `pending` drops to zero.
    drained: Notify,
    /// Closed pools reject all further submissions.
    closed: AtomicBool,
    /// Tasks rejected at submission time.
    dropped: AtomicU64,
}

impl PoolShared {
    fn complete_one(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_waiters();
        }
    }
}

/// Decrements the pending counter when dropped, so a task body that unwinds
/// still counts as completed and `drain` terminates.
struct CompletionGuard {
    shared: Arc<PoolShared>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.shared.complete_one();
    }
}

/// Fixed-size worker pool executing a stream of [`PoolTask`]s.
pub struct ReportPool<T> {
    queue: mpsc::Sender<T>,
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
}

impl<T: PoolTask> ReportPool<T> {
    /// Spawn the workers and return the pool handle.
    pub fn new(config: PoolConfig) -> Self {
        let worker_count = config.workers.max(1);
        let (queue, receiver) = mpsc::channel::<T>(config.queue_capacity.max(1));
        let shared = Arc::new(PoolShared {
            pending: AtomicUsize::new(0),
            drained: Notify::new(),
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        });

        // Workers pull from one shared receiver; the mutex is held only for
        // the duration of a single recv.
        let receiver = Arc::new(Mutex::new(receiver));
        let workers = (0..worker_count)
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                let shared = Arc::clone(&shared);
                tokio::spawn(async move {
                    debug!(worker, "Report worker started");
                    loop {
                        let task = { receiver.lock().await.recv().await };
                        let Some(task) = task else { break };
                        let guard = CompletionGuard {
                            shared: Arc::clone(&shared),
                        };
                        task.run().await;
                        drop(guard);
                    }
                    debug!(worker, "Report worker stopped");
                })
            })
            .collect();

        Self {
            queue,
            shared,
            workers,
        }
    }

    /// Enqueue a task for execution by some worker.
    ///
    /// Returns as soon as the queue accepts the task, without waiting for it
    /// to run. If the pool is closed the task is dropped and counted, and
    /// the pending counter is restored so `drain` is unaffected.
    pub async fn submit(&self, task: T) -> Result<(), SubmitError> {
        if self.shared.closed.load(Ordering::Acquire) {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(SubmitError::Closed);
        }

        self.shared.pending.fetch_add(1, Ordering::AcqRel);
        if self.queue.send(task).await.is_err() {
            self.shared.complete_one();
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(SubmitError::Closed);
        }
        Ok(())
    }

    /// Wait until every task submitted so far has completed.
    ///
    /// Returns immediately when nothing is pending. Safe to call repeatedly
    /// across submit/drain cycles and from concurrent callers.
    pub async fn drain(&self) {
        let mut notified = pin!(self.shared.drained.notified());
        loop {
            if self.shared.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            // Register interest before the re-check so a decrement landing
            // in between cannot be missed.
            notified.as_mut().enable();
            if self.shared.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.as_mut().await;
            notified.set(self.shared.drained.notified());
        }
    }

    /// Stop accepting submissions. Queued tasks still execute.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
    }

    /// Close the pool, let queued tasks finish, and join the workers.
    pub async fn shutdown(self) {
        let Self {
            queue,
            shared,
            workers,
        } = self;
        shared.closed.store(true, Ordering::Release);
        drop(queue);
        for worker in workers {
            let _ = worker.await;
        }
    }

    /// Number of tasks rejected at submission time since construction.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Tasks submitted but not yet completed.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Task that records executions and the peak concurrency it observed.
    struct ProbeTask {
        runs: Arc<AtomicUsize>,
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        fail: bool,
    }

    impl ProbeTask {
        fn batch(count: usize) -> (Vec<Self>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
            let runs = Arc::new(AtomicUsize::new(0));
            let in_flight = Arc::new(AtomicUsize::new(0));
            let peak = Arc::new(AtomicUsize::new(0));
            let tasks = (0..count)
                .map(|i| ProbeTask {
                    runs: Arc::clone(&runs),
                    in_flight: Arc::clone(&in_flight),
                    peak: Arc::clone(&peak),
                    fail: i % 3 == 0,
                })
                .collect();
            (tasks, runs, peak)
        }
    }

    #[async_trait]
    impl PoolTask for ProbeTask {
        async fn run(self) {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(1)).await;
            if self.fail {
                // Internal failure path: the body logs and swallows it.
                tracing::warn!("simulated task failure");
            }
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_drain_with_no_tasks_returns_immediately() {
        let pool: ReportPool<ProbeTask> = ReportPool::new(PoolConfig::default());
        pool.drain().await;
        assert_eq!(pool.pending(), 0);
    }

    #[tokio::test]
    async fn test_single_task_executes_once() {
        let pool = ReportPool::new(PoolConfig::default());
        let (mut tasks, runs, _) = ProbeTask::batch(1);

        pool.submit(tasks.pop().unwrap()).await.unwrap();
        pool.drain().await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(pool.pending(), 0);
    }

    #[tokio::test]
    async fn test_thousand_tasks_all_execute_despite_failures() {
        let pool = ReportPool::new(PoolConfig {
            workers: 8,
            queue_capacity: 64,
        });
        let (tasks, runs, _) = ProbeTask::batch(1000);

        for task in tasks {
            pool.submit(task).await.unwrap();
        }
        pool.drain().await;

        assert_eq!(runs.load(Ordering::SeqCst), 1000);
        assert_eq!(pool.pending(), 0);
        assert_eq!(pool.dropped(), 0);
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_worker_count() {
        let pool = ReportPool::new(PoolConfig {
            workers: 4,
            queue_capacity: 256,
        });
        let (tasks, runs, peak) = ProbeTask::batch(100);

        for task in tasks {
            pool.submit(task).await.unwrap();
        }
        pool.drain().await;

        assert_eq!(runs.load(Ordering::SeqCst), 100);
        assert!(peak.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn test_pool_reusable_across_cycles() {
        let pool = ReportPool::new(PoolConfig {
            workers: 2,
            queue_capacity: 16,
        });

        for _cycle in 0..3 {
            let (tasks, runs, _) = ProbeTask::batch(10);
            for task in tasks {
                pool.submit(task).await.unwrap();
            }
            pool.drain().await;
            assert_eq!(runs.load(Ordering::SeqCst), 10);
            assert_eq!(pool.pending(), 0);
        }
    }

    #[tokio::test]
    async fn test_closed_pool_rejects_and_counts_drops() {
        let pool = ReportPool::new(PoolConfig::default());
        let (tasks, runs, _) = ProbeTask::batch(2);
        let mut tasks = tasks.into_iter();

        pool.submit(tasks.next().unwrap()).await.unwrap();
        pool.close();
        let rejected = pool.submit(tasks.next().unwrap()).await;

        assert_eq!(rejected, Err(SubmitError::Closed));
        assert_eq!(pool.dropped(), 1);

        // Drain still terminates and accounts only for the accepted task.
        pool.drain().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_runs_queued_tasks() {
        let pool = ReportPool::new(PoolConfig {
            workers: 2,
            queue_capacity: 64,
        });
        let (tasks, runs, _) = ProbeTask::batch(20);

        for task in tasks {
            pool.submit(task).await.unwrap();
        }
        pool.shutdown().await;

        assert_eq!(runs.load(Ordering::SeqCst), 20);
    }
}
