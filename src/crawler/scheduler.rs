//! Scheduler for bounding concurrent crawl work and reporting progress
//!
//! This module handles:
//! - An admission gate (semaphore) bounding concurrent sitemap units
//! - A fixed pool of workers draining a bounded queue of article units
//! - Atomic progress counters read by a periodic reporter task
//!
//! A failing unit is counted and never affects its siblings.

use crate::Result;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

/// Completed and failed counts for one run
#[derive(Debug, Default)]
pub struct Progress {
    total: usize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record(&self, ok: bool) {
        if ok {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn completed(&self) -> usize {
        self.succeeded.load(Ordering::Relaxed) + self.failed.load(Ordering::Relaxed)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            total: self.total,
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Outcome counts of a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Runs units of crawl work with bounded concurrency
#[derive(Debug, Clone)]
pub struct Scheduler {
    progress_interval: Duration,
}

impl Scheduler {
    /// Creates a scheduler reporting progress every `progress_interval`
    pub fn new(progress_interval: Duration) -> Self {
        Self {
            progress_interval: progress_interval.max(Duration::from_millis(1)),
        }
    }

    /// Launches every unit at once, admitting at most `limit` into `work` concurrently
    ///
    /// Completion order is not defined.
    ///
    /// # Arguments
    ///
    /// * `label` - Name of the stage, used in progress logs
    /// * `limit` - Admission gate size
    /// * `units` - Work items
    /// * `work` - The fetch-and-persist operation for one unit
    pub async fn run_gated<T, F, Fut>(
        &self,
        label: &'static str,
        limit: usize,
        units: Vec<T>,
        work: F,
    ) -> RunSummary
    where
        T: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let gate = Arc::new(Semaphore::new(limit.max(1)));
        let progress = Arc::new(Progress::new(units.len()));
        let work = Arc::new(work);
        let ticker = self.spawn_reporter(label, Arc::clone(&progress));

        tracing::info!(label, units = units.len(), limit, "Starting gated run");

        let mut tasks = JoinSet::new();
        for unit in units {
            let gate = Arc::clone(&gate);
            let work = Arc::clone(&work);
            let progress = Arc::clone(&progress);

            tasks.spawn(async move {
                let Ok(_permit) = gate.acquire_owned().await else {
                    progress.record(false);
                    return;
                };
                progress.record(work(unit).await.is_ok());
            });
        }

        Self::drain(label, &mut tasks, &progress).await;
        ticker.abort();
        Self::finish(label, &progress)
    }

    /// Feeds units through a bounded queue to a fixed pool of `workers`
    ///
    /// The producer waits while the queue holds `queue_capacity` units.
    /// Units are dequeued in FIFO order; completion order is not defined.
    pub async fn run_pool<T, F, Fut>(
        &self,
        label: &'static str,
        workers: usize,
        queue_capacity: usize,
        units: Vec<T>,
        work: F,
    ) -> RunSummary
    where
        T: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<T>(queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let progress = Arc::new(Progress::new(units.len()));
        let work = Arc::new(work);
        let ticker = self.spawn_reporter(label, Arc::clone(&progress));

        tracing::info!(label, units = units.len(), workers, "Starting worker pool");

        let mut tasks = JoinSet::new();
        for worker in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            let work = Arc::clone(&work);
            let progress = Arc::clone(&progress);

            tasks.spawn(async move {
                loop {
                    let next = rx.lock().await.recv().await;
                    let Some(unit) = next else {
                        break;
                    };
                    progress.record(work(unit).await.is_ok());
                }
                tracing::debug!(label, worker, "Worker finished");
            });
        }

        for unit in units {
            // Only fails once every worker is gone
            if tx.send(unit).await.is_err() {
                tracing::error!(label, "All workers exited, dropping remaining units");
                break;
            }
        }
        drop(tx);

        Self::drain(label, &mut tasks, &progress).await;
        ticker.abort();
        Self::finish(label, &progress)
    }

    async fn drain(label: &'static str, tasks: &mut JoinSet<()>, progress: &Progress) {
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(label, error = %e, "Task panicked");
                progress.record(false);
            }
        }
    }

    fn finish(label: &'static str, progress: &Progress) -> RunSummary {
        let summary = progress.summary();
        tracing::info!(
            label,
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Run complete"
        );
        summary
    }

    fn spawn_reporter(&self, label: &'static str, progress: Arc<Progress>) -> JoinHandle<()> {
        let period = self.progress_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                tracing::info!(
                    label,
                    completed = progress.completed(),
                    total = progress.total,
                    "Progress"
                );
            }
        })
    }
}
