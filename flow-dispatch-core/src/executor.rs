//! Single-threaded cooperative executors
//!
//! A store never decides *when* deferred work runs. It hands jobs to an
//! [`Executor`], and the host drives that executor from its one execution
//! context (UI thread, event loop, test body).
//!
//! Two implementations are provided:
//!
//! - [`ManualExecutor`]: a plain FIFO queue drained explicitly. Used by
//!   tests and by hosts that already own an event loop.
//! - [`LocalExecutor`]: a tokio channel drained by a [`JobLoop`] future,
//!   meant to run inside a `tokio::task::LocalSet`.
//!
//! # Example
//!
//! ```ignore
//! let (executor, jobs) = LocalExecutor::new();
//! let store = Store::new(AppState::default(), AppAction::Init, reducer, executor);
//!
//! let local = tokio::task::LocalSet::new();
//! local.run_until(jobs.run_until_cancelled(shutdown)).await;
//! ```

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::process;
use std::rc::Rc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A unit of deferred work.
pub type Job = Box<dyn FnOnce() + 'static>;

/// A single-threaded execution context that runs jobs later, in order.
///
/// Implementations must never run `job` inline from inside `schedule`, and
/// must run jobs in the order they were scheduled.
pub trait Executor {
    /// Queue a job for a later cycle.
    fn schedule(&self, job: Job);
}

impl<E: Executor + ?Sized> Executor for Rc<E> {
    fn schedule(&self, job: Job) {
        (**self).schedule(job)
    }
}

/// Default upper bound for [`ManualExecutor::run_until_idle`].
pub const DEFAULT_MAX_CYCLES: usize = 1024;

/// A FIFO job queue driven explicitly by its owner.
///
/// Cloning yields another handle to the same queue, so a test can keep one
/// handle while the store owns another.
#[derive(Clone)]
pub struct ManualExecutor {
    queue: Rc<RefCell<VecDeque<Job>>>,
    max_cycles: Rc<Cell<usize>>,
}

impl Default for ManualExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualExecutor {
    /// Create an empty executor.
    pub fn new() -> Self {
        Self {
            queue: Rc::new(RefCell::new(VecDeque::new())),
            max_cycles: Rc::new(Cell::new(DEFAULT_MAX_CYCLES)),
        }
    }

    /// Limit how many cycles [`run_until_idle`](Self::run_until_idle) may take.
    pub fn with_max_cycles(self, max_cycles: usize) -> Self {
        self.max_cycles.set(max_cycles);
        self
    }

    /// Number of jobs waiting to run.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Whether the queue is empty.
    pub fn is_idle(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Run one cycle: the jobs that were queued when this call started.
    ///
    /// Jobs scheduled while the cycle runs wait for the next cycle.
    /// Returns the number of jobs that ran.
    pub fn run_pending(&self) -> usize {
        let batch = self.queue.borrow().len();
        let mut ran = 0;
        for _ in 0..batch {
            // The queue borrow must end before the job runs: jobs schedule more jobs.
            let job = self.queue.borrow_mut().pop_front();
            match job {
                Some(job) => job(),
                None => break,
            }
            ran += 1;
        }
        ran
    }

    /// Run cycles until no jobs are left. Returns the total number of jobs run.
    ///
    /// # Panics
    ///
    /// Panics when the queue is still busy after the configured number of
    /// cycles, which usually means two commands keep re-triggering each other.
    pub fn run_until_idle(&self) -> usize {
        let max_cycles = self.max_cycles.get();
        let mut total = 0;
        for _ in 0..max_cycles {
            if self.is_idle() {
                return total;
            }
            total += self.run_pending();
        }
        if !self.is_idle() {
            panic!(
                "executor still busy after {} cycles ({} jobs pending)",
                max_cycles,
                self.pending()
            );
        }
        total
    }
}

impl Executor for ManualExecutor {
    fn schedule(&self, job: Job) {
        self.queue.borrow_mut().push_back(job);
    }
}

impl fmt::Debug for ManualExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualExecutor")
            .field("pending", &self.pending())
            .field("max_cycles", &self.max_cycles.get())
            .finish()
    }
}

/// Tokio-backed executor handle. Jobs are delivered to the paired [`JobLoop`].
#[derive(Clone, Debug)]
pub struct LocalExecutor {
    job_tx: mpsc::UnboundedSender<Job>,
}

impl LocalExecutor {
    /// Create an executor handle and the loop that runs its jobs.
    pub fn new() -> (Self, JobLoop) {
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        (Self { job_tx }, JobLoop { job_rx })
    }
}

impl Executor for LocalExecutor {
    fn schedule(&self, job: Job) {
        if self.job_tx.send(job).is_err() {
            tracing::warn!("job loop is gone, dropping scheduled job");
        }
    }
}

/// Receiving side of a [`LocalExecutor`].
///
/// A job that panics aborts the process. The loop usually runs as a spawned
/// task, where tokio would otherwise catch the panic and leave the store
/// behind it half-reduced (for example after a reentrant dispatch).
pub struct JobLoop {
    job_rx: mpsc::UnboundedReceiver<Job>,
}

impl JobLoop {
    /// Run jobs until every [`LocalExecutor`] handle has been dropped.
    pub async fn run(mut self) {
        while let Some(job) = self.job_rx.recv().await {
            run_job(job);
        }
        tracing::trace!("all executor handles dropped, job loop finished");
    }

    /// Run jobs until `cancel` fires or every executor handle is dropped.
    ///
    /// Jobs still queued at cancellation are dropped without running.
    pub async fn run_until_cancelled(mut self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::trace!("job loop cancelled");
                    break;
                }
                job = self.job_rx.recv() => match job {
                    Some(job) => run_job(job),
                    None => break,
                },
            }
        }
    }

    /// Synchronously run every job that is ready right now, including jobs
    /// scheduled by the jobs themselves. Returns the number of jobs run.
    pub fn run_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(job) = self.job_rx.try_recv() {
            run_job(job);
            count += 1;
        }
        count
    }
}

fn run_job(job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        tracing::error!(
            panic = panic_message(payload.as_ref()),
            "deferred job panicked, aborting"
        );
        process::abort();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic>"
    }
}

impl fmt::Debug for JobLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobLoop").finish_non_exhaustive()
    }
}
