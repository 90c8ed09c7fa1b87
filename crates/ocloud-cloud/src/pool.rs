//! Bounded, fail-fast worker pool

use crate::error::{CloudError, Result};
use futures_util::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_WORKER_COUNT: usize = 12;

/// A unit of work. Jobs own everything they touch.
pub type Job = BoxFuture<'static, Result<()>>;

/// Runs queued jobs on a fixed number of worker tasks.
///
/// The first failing job stops the other workers from taking new jobs.
/// `run` always waits for every worker, so no job is still running once it
/// returns.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKER_COUNT)
    }
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Queue `jobs`, close the queue and run it to completion.
    pub async fn run_all(&self, cancel: &CancellationToken, jobs: Vec<Job>) -> Result<()> {
        if jobs.is_empty() {
            return Ok(());
        }
        let (tx, rx) = mpsc::channel(jobs.len());
        for job in jobs {
            tx.try_send(job)
                .map_err(|_| CloudError::Join("job queue rejected a job".to_string()))?;
        }
        drop(tx);
        self.run(cancel, rx).await
    }

    /// Drain `jobs` until the sender side is dropped, a job fails, or `cancel` fires.
    pub async fn run(&self, cancel: &CancellationToken, jobs: mpsc::Receiver<Job>) -> Result<()> {
        let group = cancel.child_token();
        let queue = Arc::new(Mutex::new(jobs));
        let mut workers = JoinSet::new();

        for _ in 0..self.workers {
            let queue = Arc::clone(&queue);
            let group = group.clone();
            workers.spawn(async move {
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = group.cancelled() => return Err(CloudError::Cancelled),
                        job = next_job(&queue) => job,
                    };
                    let Some(job) = next else {
                        return Ok(());
                    };
                    if let Err(err) = job.await {
                        group.cancel();
                        return Err(err);
                    }
                }
            });
        }

        let mut first: Option<CloudError> = None;
        while let Some(joined) = workers.join_next().await {
            let outcome = joined
                .map_err(|e| CloudError::Join(e.to_string()))
                .and_then(|r| r);
            if let Err(err) = outcome {
                group.cancel();
                // Sibling workers report Cancelled after a real failure; keep the cause.
                let replace = match &first {
                    None => true,
                    Some(prev) => prev.is_cancelled() && !err.is_cancelled(),
                };
                if replace {
                    first = Some(err);
                }
            }
        }

        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

async fn next_job(queue: &Mutex<mpsc::Receiver<Job>>) -> Option<Job> {
    queue.lock().await.recv().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_runs_every_job() {
        let pool = WorkerPool::new(4);
        let cancel = CancellationToken::new();
        let done = Arc::new(AtomicUsize::new(0));

        let jobs: Vec<Job> = (0..20)
            .map(|_| {
                let done = Arc::clone(&done);
                async move {
                    done.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
                .boxed()
            })
            .collect();

        pool.run_all(&cancel, jobs).await.unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let pool = WorkerPool::new(3);
        let cancel = CancellationToken::new();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let jobs: Vec<Job> = (0..12)
            .map(|_| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
                .boxed()
            })
            .collect();

        pool.run_all(&cancel, jobs).await.unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_error_stops_remaining_jobs() {
        let pool = WorkerPool::new(3);
        let cancel = CancellationToken::new();
        let ran = Arc::new(std::sync::Mutex::new(Vec::new()));

        let jobs: Vec<Job> = (1..=10)
            .map(|i| {
                let ran = Arc::clone(&ran);
                async move {
                    if i == 4 {
                        return Err(CloudError::NotFound("backend set".to_string()));
                    }
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    ran.lock().unwrap().push(i);
                    Ok(())
                }
                .boxed()
            })
            .collect();

        let result = pool.run_all(&cancel, jobs).await;
        assert!(matches!(result, Err(CloudError::NotFound(_))));

        let after_return = ran.lock().unwrap().len();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(ran.lock().unwrap().len(), after_return);
        assert!(after_return < 9);
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_parent_cancellation_stops_workers() {
        let pool = WorkerPool::new(2);
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel::<Job>(1);

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        // The sender stays open, so only cancellation can end the run.
        let result = tokio::time::timeout(Duration::from_secs(1), pool.run(&cancel, rx))
            .await
            .expect("pool must observe cancellation");
        assert!(matches!(result, Err(CloudError::Cancelled)));
        drop(tx);
    }

    #[test]
    fn test_worker_count_floor() {
        assert_eq!(WorkerPool::new(0).workers(), 1);
        assert_eq!(WorkerPool::default().workers(), DEFAULT_WORKER_COUNT);
    }
}
