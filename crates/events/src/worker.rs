//! Pool worker: one OS thread executing jobs handed to it by the dispatcher.

use std::io;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;

use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::select;
use tracing::debug;

use crate::cancel::CancellationToken;
use crate::dispatcher::Counters;
use crate::job::Job;

/// Where a worker announces it is idle: it publishes the sending half of its
/// private job slot, and whoever takes that sender owns the next handoff.
pub(crate) type IdleWorkers = Sender<Sender<Job>>;

pub(crate) struct Worker {
    id: usize,
    idle: IdleWorkers,
    slot_tx: Sender<Job>,
    slot_rx: Receiver<Job>,
    stop: CancellationToken,
    cancel: CancellationToken,
    counters: Arc<Counters>,
}

impl Worker {
    pub(crate) fn new(
        id: usize,
        idle: IdleWorkers,
        stop: CancellationToken,
        cancel: CancellationToken,
        counters: Arc<Counters>,
    ) -> Self {
        // Rendezvous slot: a handoff completes only when this worker takes it.
        let (slot_tx, slot_rx) = channel::bounded(0);
        Self {
            id,
            idle,
            slot_tx,
            slot_rx,
            stop,
            cancel,
            counters,
        }
    }

    pub(crate) fn start(self, pool: &str) -> io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("{pool}-worker-{}", self.id))
            .spawn(move || self.run())
    }

    fn run(self) {
        loop {
            // Capacity of the idle channel equals the pool size and each worker
            // holds at most one registration, so this never blocks. It fails
            // once the dispatcher side is gone.
            if self.idle.send(self.slot_tx.clone()).is_err() {
                break;
            }

            select! {
                recv(self.slot_rx) -> job => match job {
                    Ok(job) => {
                        job.run();
                        self.counters.executed.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(_) => break,
                },
                recv(self.stop.signal()) -> _ => break,
                recv(self.cancel.signal()) -> _ => break,
            }
        }
        debug!(worker = self.id, "worker stopped");
    }
}
