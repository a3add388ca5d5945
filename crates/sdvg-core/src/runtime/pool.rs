//! Bounded worker pool with first-error fan-in.
//!
//! A fixed number of workers drain one job channel. The first job error is
//! latched (later errors are dropped) and a pending-jobs counter signals a
//! done latch when it reaches zero, so `wait` returns as soon as either the
//! queue drains or something fails.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use crate::error::{Result, SdvgError};

pub type Job = BoxFuture<'static, Result<()>>;

pub struct WorkerPool {
    job_tx: mpsc::Sender<Job>,
    pending: Arc<AtomicU64>,
    done: Arc<Notify>,
    first_error: Arc<Mutex<Option<SdvgError>>>,
    stopped: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(workers_count: usize) -> WorkerPool {
        let workers_count = workers_count.max(1);
        let (job_tx, job_rx) = mpsc::channel::<Job>(workers_count * 2);
        let job_rx = Arc::new(tokio::sync::Mutex::new(job_rx));
        let pending = Arc::new(AtomicU64::new(0));
        let done = Arc::new(Notify::new());
        let first_error = Arc::new(Mutex::new(None));

        let workers = (0..workers_count)
            .map(|_| {
                let job_rx = Arc::clone(&job_rx);
                let pending = Arc::clone(&pending);
                let done = Arc::clone(&done);
                let first_error = Arc::clone(&first_error);
                tokio::spawn(async move {
                    loop {
                        let job = { job_rx.lock().await.recv().await };
                        let Some(job) = job else { break };
                        if let Err(e) = job.await {
                            let mut latch = first_error.lock().expect("error latch");
                            if latch.is_none() {
                                *latch = Some(e);
                            }
                            drop(latch);
                            done.notify_waiters();
                        }
                        if pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                            done.notify_waiters();
                        }
                    }
                })
            })
            .collect();

        WorkerPool {
            job_tx,
            pending,
            done,
            first_error,
            stopped: Arc::new(AtomicBool::new(false)),
            workers,
        }
    }

    /// Queue a job. Safe to call concurrently; a no-op after `stop`.
    pub async fn submit(&self, job: Job) -> Result<()> {
        if self.stopped.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.job_tx.send(job).await.is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(SdvgError::Internal {
                message: "worker pool job channel closed".to_string(),
            });
        }
        Ok(())
    }

    /// Wait until the queue drains or a job fails; the first error wins.
    pub async fn wait(&self) -> Option<SdvgError> {
        loop {
            let notified = self.done.notified();
            if self.first_error.lock().expect("error latch").is_some() {
                break;
            }
            if self.pending.load(Ordering::SeqCst) == 0 {
                break;
            }
            notified.await;
        }
        self.first_error.lock().expect("error latch").take()
    }

    /// Refuse further submissions. Safe after a failure; running jobs keep
    /// draining.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Wait until every queued job has run, regardless of errors. `wait`
    /// returns on the first failure; callers that are about to tear shared
    /// sinks down drain the stragglers first.
    pub async fn drain(&self) {
        loop {
            let notified = self.done.notified();
            if self.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_runs_all_jobs() {
        let pool = WorkerPool::new(4);
        let counter = Arc::new(AtomicU64::new(0));
        for _ in 0..32 {
            let counter = Arc::clone(&counter);
            pool.submit(Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .await
            .unwrap();
        }
        assert!(pool.wait().await.is_none());
        assert_eq!(counter.load(Ordering::SeqCst), 32);
    }

    #[tokio::test]
    async fn test_first_error_wins() {
        let pool = WorkerPool::new(2);
        for i in 0..8 {
            pool.submit(Box::pin(async move {
                if i == 3 {
                    Err(SdvgError::Internal {
                        message: "job 3 failed".to_string(),
                    })
                } else {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Ok(())
                }
            }))
            .await
            .unwrap();
        }
        let err = pool.wait().await.expect("an error must surface");
        assert!(format!("{}", err).contains("job 3 failed"));
        // Stop after failure must be safe.
        pool.stop();
    }

    #[tokio::test]
    async fn test_submit_after_stop_is_noop() {
        let pool = WorkerPool::new(1);
        pool.stop();
        let counter = Arc::new(AtomicU64::new(0));
        let c = Arc::clone(&counter);
        pool.submit(Box::pin(async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .await
        .unwrap();
        assert!(pool.wait().await.is_none());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wait_with_no_jobs_returns_immediately() {
        let pool = WorkerPool::new(2);
        assert!(pool.wait().await.is_none());
    }
}
