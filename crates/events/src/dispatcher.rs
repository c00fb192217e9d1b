//! Bounded worker pool with a single dispatch loop.
//!
//! ```text
//! send() ──rendezvous──▶ dispatch loop ──idle slot──▶ worker
//! ```
//!
//! `send` returns once the dispatch loop has accepted the job. The loop keeps
//! accepted jobs in a ready queue, or in a timer heap until their not-before
//! instant, and hands them out as workers register idle. The pool therefore
//! runs on exactly `workers + 1` threads regardless of backlog, and neither
//! the caller nor the loop blocks on worker availability.
//!
//! ## Shutdown
//!
//! - [`Dispatcher::close`] drains: no new jobs are accepted, every accepted
//!   job is delivered and run, then workers are stopped and joined.
//! - Cancelling the dispatcher's [`CancellationToken`] stops the loop and the
//!   workers after their current job. Jobs not yet handed to a worker are
//!   dropped and counted in [`DispatcherStats::dropped`].

use std::cmp;
use std::collections::{BinaryHeap, VecDeque};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Instant;

use crossbeam::channel::{self, Receiver, SendError, Sender};
use crossbeam::select;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::cancel::CancellationToken;
use crate::job::Job;
use crate::worker::Worker;

/// Number of workers used when none is configured: the processor count.
pub fn max_parallelism() -> usize {
    num_cpus::get().max(1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Name for logging and thread names.
    pub name: String,
    /// Pool size (at least one worker is always started).
    pub workers: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            name: "dispatcher".to_string(),
            workers: max_parallelism(),
        }
    }
}

impl DispatcherConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("dispatcher `{0}` is closed")]
    Closed(String),

    #[error("failed to spawn dispatcher thread: {0}")]
    Spawn(#[from] io::Error),
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) submitted: AtomicU64,
    pub(crate) executed: AtomicU64,
    pub(crate) dropped: AtomicU64,
}

/// Point-in-time dispatcher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    pub workers: usize,
    pub submitted: u64,
    pub executed: u64,
    pub dropped: u64,
}

/// Load-balances submitted closures across a fixed pool of worker threads.
pub struct Dispatcher {
    name: String,
    size: usize,
    jobs: Mutex<Option<Sender<Job>>>,
    stop: CancellationToken,
    cancel: CancellationToken,
    dispatch: Mutex<Option<thread::JoinHandle<()>>>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl Dispatcher {
    /// Start the workers and the dispatch loop.
    pub fn start(config: DispatcherConfig) -> Result<Self, DispatchError> {
        Self::start_with_cancellation(config, CancellationToken::new())
    }

    /// Start observing an externally owned cancellation token.
    pub fn start_with_cancellation(
        config: DispatcherConfig,
        cancel: CancellationToken,
    ) -> Result<Self, DispatchError> {
        let size = config.workers.max(1);
        let (idle_tx, idle_rx) = channel::bounded::<Sender<Job>>(size);
        let (job_tx, job_rx) = channel::bounded::<Job>(0);
        let stop = CancellationToken::new();
        let counters = Arc::new(Counters::default());

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let worker = Worker::new(
                id,
                idle_tx.clone(),
                stop.clone(),
                cancel.clone(),
                counters.clone(),
            );
            match worker.start(&config.name) {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    abort_start(&stop, workers);
                    return Err(e.into());
                }
            }
        }
        // Workers hold the only registration senders from here on.
        drop(idle_tx);

        let dispatch = {
            let name = config.name.clone();
            let cancel = cancel.clone();
            let counters = counters.clone();
            thread::Builder::new()
                .name(format!("{}-dispatch", config.name))
                .spawn(move || dispatch_loop(name, job_rx, idle_rx, cancel, counters))
        };
        let dispatch = match dispatch {
            Ok(handle) => handle,
            Err(e) => {
                abort_start(&stop, workers);
                return Err(e.into());
            }
        };

        info!(dispatcher = %config.name, workers = size, "dispatcher started");

        Ok(Self {
            name: config.name,
            size,
            jobs: Mutex::new(Some(job_tx)),
            stop,
            cancel,
            dispatch: Mutex::new(Some(dispatch)),
            workers: Mutex::new(workers),
            counters,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Submit a closure for execution on some worker.
    ///
    /// Blocks only until the dispatch loop accepts the job.
    pub fn send<F>(&self, task: F) -> Result<(), DispatchError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Job::new(task))
    }

    /// Submit a closure that must not start before `not_before`.
    ///
    /// Waiting happens in the dispatch loop's timer heap, not on a worker.
    pub fn send_at<F>(&self, task: F, not_before: Instant) -> Result<(), DispatchError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Job::not_before(task, not_before))
    }

    pub fn submit(&self, job: Job) -> Result<(), DispatchError> {
        let sender = self
            .jobs
            .lock()
            .clone()
            .ok_or_else(|| DispatchError::Closed(self.name.clone()))?;

        sender
            .send(job)
            .map_err(|_| DispatchError::Closed(self.name.clone()))?;
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            workers: self.size,
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            executed: self.counters.executed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.jobs.lock().is_none()
    }

    /// Graceful drain: run everything already accepted, then stop the pool.
    ///
    /// Blocks until every worker has exited. Calling it again is a no-op.
    pub fn close(&self) {
        let Some(sender) = self.jobs.lock().take() else {
            return;
        };
        drop(sender);

        if let Some(handle) = self.dispatch.lock().take() {
            if handle.join().is_err() {
                error!(dispatcher = %self.name, "dispatch loop panicked");
            }
        }

        self.stop.cancel();
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in workers {
            if handle.join().is_err() {
                error!(dispatcher = %self.name, "worker panicked while running a job");
            }
        }

        let stats = self.stats();
        info!(
            dispatcher = %self.name,
            submitted = stats.submitted,
            executed = stats.executed,
            dropped = stats.dropped,
            "dispatcher closed"
        );
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Not closed: stop accepting and let workers wind down without joining.
        if self.jobs.get_mut().take().is_some() {
            debug!(dispatcher = %self.name, "dispatcher dropped without close");
            self.stop.cancel();
        }
    }
}

impl core::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.name)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

fn abort_start(stop: &CancellationToken, workers: Vec<thread::JoinHandle<()>>) {
    stop.cancel();
    for handle in workers {
        let _ = handle.join();
    }
}

/// Jobs accepted by the dispatch loop but not yet handed to a worker.
#[derive(Default)]
struct Pending {
    ready: VecDeque<Job>,
    delayed: BinaryHeap<Scheduled>,
    seq: u64,
}

impl Pending {
    fn push(&mut self, job: Job, now: Instant) {
        match job.deadline() {
            Some(at) if at > now => {
                self.seq += 1;
                self.delayed.push(Scheduled { at, seq: self.seq, job });
            }
            _ => self.ready.push_back(job),
        }
    }

    /// Move every delayed job whose start time has passed onto the ready queue.
    fn promote_due(&mut self, now: Instant) {
        while self.delayed.peek().is_some_and(|s| s.at <= now) {
            if let Some(scheduled) = self.delayed.pop() {
                self.ready.push_back(scheduled.job);
            }
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.delayed.peek().map(|s| s.at)
    }

    fn is_empty(&self) -> bool {
        self.ready.is_empty() && self.delayed.is_empty()
    }

    fn len(&self) -> usize {
        self.ready.len() + self.delayed.len()
    }

    fn drop_all(&mut self, counters: &Counters, reason: &'static str) {
        let dropped = self.len();
        if dropped == 0 {
            return;
        }
        counters.dropped.fetch_add(dropped as u64, Ordering::Relaxed);
        warn!(dropped, reason, "pending jobs dropped");
        self.ready.clear();
        self.delayed.clear();
    }
}

/// Heap entry ordered so the earliest start time (then the earliest
/// submission) is at the top of a max-heap.
struct Scheduled {
    at: Instant,
    seq: u64,
    job: Job,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        other.at.cmp(&self.at).then_with(|| other.seq.cmp(&self.seq))
    }
}

fn dispatch_loop(
    name: String,
    jobs: Receiver<Job>,
    idle: Receiver<Sender<Job>>,
    cancel: CancellationToken,
    counters: Arc<Counters>,
) {
    let mut pending = Pending::default();
    let mut accepting = true;
    let no_jobs = channel::never::<Job>();
    let no_slots = channel::never::<Sender<Job>>();

    loop {
        pending.promote_due(Instant::now());
        if !accepting && pending.is_empty() {
            break;
        }

        let incoming = if accepting { &jobs } else { &no_jobs };
        // Only take an idle registration when there is a job to give it.
        let slots = if pending.ready.is_empty() { &no_slots } else { &idle };
        let timer = match pending.next_deadline() {
            Some(at) => channel::at(at),
            None => channel::never(),
        };

        select! {
            recv(incoming) -> job => match job {
                Ok(job) => pending.push(job, Instant::now()),
                // Every sender is gone: close() was called.
                Err(_) => accepting = false,
            },
            recv(slots) -> slot => match slot {
                Ok(slot) => {
                    if let Some(job) = pending.ready.pop_front() {
                        // The worker behind this registration has exited; retry with the next one.
                        if let Err(SendError(job)) = slot.send(job) {
                            pending.ready.push_front(job);
                        }
                    }
                }
                Err(_) => {
                    pending.drop_all(&counters, "no workers left");
                    break;
                }
            },
            recv(timer) -> _ => {},
            recv(cancel.signal()) -> _ => {
                info!(dispatcher = %name, "dispatch loop cancelled");
                pending.drop_all(&counters, "cancelled before a worker was free");
                break;
            }
        }
    }

    debug!(dispatcher = %name, "dispatch loop drained");
}
