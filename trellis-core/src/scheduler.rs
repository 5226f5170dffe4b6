//! Job Scheduler
//!
//! The scheduler batches re-execution work. Effects that should not run
//! inline (component render effects in particular) hand a [`Job`] to the
//! scheduler instead, and the scheduler runs it once, later.
//!
//! # Algorithm
//!
//! 1. `queue_job` appends the job unless the same job is already waiting.
//! 2. The first job queued in a turn schedules a flush. On a current-thread
//!    tokio runtime that is a spawned task, which runs after the current
//!    synchronous code yields (the microtask-equivalent tick). Elsewhere the
//!    host calls [`Scheduler::flush`] itself.
//! 3. `flush` pops jobs in FIFO order until the queue is empty, so jobs
//!    queued by other jobs run in the same flush.
//!
//! A job that keeps re-queuing itself is cut off after
//! [`RuntimeConfig::recursion_limit`] runs in one flush.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::config::RuntimeConfig;
use crate::error::{Error, Result};

/// Unique identifier for a job. Deduplication is by this identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(u64);

impl JobId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// A unit of deferred work.
///
/// Cloning a job keeps its identity, so the clones deduplicate against each
/// other in the queue.
#[derive(Clone)]
pub struct Job {
    id: JobId,
    run: Arc<dyn Fn() + Send + Sync>,
}

impl Job {
    /// Create a new job with a fresh identity.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            id: JobId::new(),
            run: Arc::new(run),
        }
    }

    /// Get the job's identity.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Run the job immediately.
    pub fn run(&self) {
        (self.run)();
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("id", &self.id).finish()
    }
}

/// Deduplicating FIFO job queue with deferred flushing.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    queue: Mutex<VecDeque<Job>>,
    flush_pending: AtomicBool,
    flushing: AtomicBool,
    config: RuntimeConfig,
}

/// Clears the flushing flag even if a job panics.
struct FlushGuard<'a>(&'a AtomicBool);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Scheduler {
    /// Create a scheduler with the given configuration.
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                queue: Mutex::new(VecDeque::new()),
                flush_pending: AtomicBool::new(false),
                flushing: AtomicBool::new(false),
                config,
            }),
        }
    }

    /// Queue a job for the next flush.
    ///
    /// Returns `false` if the same job was already waiting to run.
    pub fn queue_job(&self, job: Job) -> bool {
        {
            let mut queue = self.inner.queue.lock();
            if queue.iter().any(|queued| queued.id == job.id) {
                tracing::trace!(job = ?job.id, "job already queued");
                return false;
            }
            queue.push_back(job);
        }

        self.queue_flush();
        true
    }

    /// Remove a job that has not run yet.
    pub fn invalidate(&self, id: JobId) -> bool {
        let mut queue = self.inner.queue.lock();
        let before = queue.len();
        queue.retain(|job| job.id != id);
        before != queue.len()
    }

    /// Number of jobs waiting to run.
    pub fn pending(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Check whether a flush is running right now.
    pub fn is_flushing(&self) -> bool {
        self.inner.flushing.load(Ordering::SeqCst)
    }

    fn queue_flush(&self) {
        // A running flush drains everything queued behind it
        if self.is_flushing() {
            return;
        }
        if self.inner.flush_pending.swap(true, Ordering::SeqCst) {
            return;
        }
        if !self.inner.config.defer_flush {
            return;
        }

        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::CurrentThread => {
                tracing::trace!("deferring flush to the next tick");
                let scheduler = self.clone();
                handle.spawn(async move {
                    if let Err(err) = scheduler.flush() {
                        tracing::error!(%err, "deferred flush aborted");
                    }
                });
            }
            _ => tracing::trace!("no current-thread runtime, waiting for an explicit flush"),
        }
    }

    /// Run every queued job, including jobs queued while flushing.
    ///
    /// Returns the number of jobs that ran. A nested call made from inside a
    /// job returns `Ok(0)` immediately; the outer flush picks up the work.
    pub fn flush(&self) -> Result<usize> {
        if self.inner.flushing.swap(true, Ordering::SeqCst) {
            return Ok(0);
        }
        let _guard = FlushGuard(&self.inner.flushing);
        self.inner.flush_pending.store(false, Ordering::SeqCst);

        let limit = self.inner.config.recursion_limit;
        let mut runs: HashMap<JobId, usize> = HashMap::new();
        let mut ran = 0;

        loop {
            let Some(job) = self.inner.queue.lock().pop_front() else {
                break;
            };

            let count = runs.entry(job.id).or_insert(0);
            *count += 1;
            if *count > limit {
                let dropped = {
                    let mut queue = self.inner.queue.lock();
                    let dropped = queue.len();
                    queue.clear();
                    dropped
                };
                tracing::error!(job = ?job.id, limit, dropped, "recursive update limit exceeded");
                return Err(Error::RecursionLimit { limit });
            }

            job.run();
            ran += 1;
        }

        if ran > 0 {
            tracing::trace!(ran, "flushed jobs");
        }
        Ok(ran)
    }

    /// Yield to the async runtime once, then flush whatever is still queued.
    ///
    /// Awaiting this after a batch of writes guarantees their jobs have run.
    pub async fn tick(&self) -> Result<usize> {
        tokio::task::yield_now().await;
        self.flush()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.pending())
            .field("flushing", &self.is_flushing())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
