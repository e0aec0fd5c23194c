//! Single-worker FIFO job orchestrator.
//!
//! Fetch commands can block for minutes and must never run concurrently with
//! each other, so every job funnels through one long-lived worker thread.
//! Request threads only ever pay the cost of a channel send.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::sync::Mutex;
use std::thread;

use tracing::{debug, error, info};

type Thunk = Box<dyn FnOnce() + Send + 'static>;

struct Job {
    label: String,
    thunk: Thunk,
}

/// FIFO queue feeding a single lazily-started worker thread.
///
/// Jobs execute strictly one at a time in enqueue order. A panicking thunk is
/// caught and logged; the worker keeps going. If the worker ever dies (or was
/// never started), the next `enqueue` restarts it.
pub struct JobQueue {
    sender: Mutex<Option<Sender<Job>>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            sender: Mutex::new(None),
        }
    }

    /// Append a job to the queue, starting the worker on first use.
    pub fn enqueue(&self, label: impl Into<String>, thunk: impl FnOnce() + Send + 'static) {
        let job = Job {
            label: label.into(),
            thunk: Box::new(thunk),
        };

        let mut sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        let job = match sender.as_ref() {
            Some(tx) => match tx.send(job) {
                Ok(()) => return,
                // Receiver gone: the worker died. Fall through and respawn.
                Err(mpsc::SendError(job)) => job,
            },
            None => job,
        };

        let tx = Self::spawn_worker();
        debug!("Job worker started");
        if tx.send(job).is_err() {
            error!("Job worker exited immediately, job dropped");
        }
        *sender = Some(tx);
    }

    fn spawn_worker() -> Sender<Job> {
        let (tx, rx) = mpsc::channel::<Job>();
        let spawned = thread::Builder::new()
            .name("job-worker".to_string())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    info!("Running job: {}", job.label);
                    let label = job.label;
                    if catch_unwind(AssertUnwindSafe(job.thunk)).is_err() {
                        error!("Job panicked: {}", label);
                    }
                }
                debug!("Job worker stopped");
            });
        if let Err(e) = spawned {
            // The receiver died with the failed spawn; the caller's send will
            // fail and report the dropped job.
            error!("Failed to spawn job worker thread: {}", e);
        }
        tx
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}
