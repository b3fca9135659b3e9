//! Producer worker: generates items and inserts them into a buffer.

use std::fmt::Display;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::buffer::{BoundedBuffer, PutOutcome};
use crate::error::Result;
use crate::listener::WorkerListener;
use crate::signal::StopSignal;
use crate::worker::{Job, Worker, WorkerOptions, WorkerState};

/// A production step.
///
/// `Ok(None)` means nothing was produced this round; the loop continues.
pub trait Produce<T>: Send + 'static {
    /// Failure type, logged and otherwise ignored by the worker.
    type Error: Display;

    /// Produces the next item.
    ///
    /// # Errors
    ///
    /// Any error is logged and the loop moves on to the next step.
    fn produce(&mut self) -> std::result::Result<Option<T>, Self::Error>;
}

impl<T, E, F> Produce<T> for F
where
    F: FnMut() -> std::result::Result<Option<T>, E> + Send + 'static,
    E: Display,
{
    type Error = E;

    fn produce(&mut self) -> std::result::Result<Option<T>, E> {
        self()
    }
}

struct ProduceJob<T, P> {
    buffer: Arc<BoundedBuffer<T>>,
    step: P,
}

impl<T, P> Job for ProduceJob<T, P>
where
    T: Send + 'static,
    P: Produce<T>,
{
    fn run_once(&mut self, signal: &StopSignal, options: &WorkerOptions) -> bool {
        let item = match self.step.produce() {
            Ok(Some(item)) => item,
            Ok(None) => {
                trace!(worker = %options.name, "nothing produced");
                return false;
            }
            Err(e) => {
                if options.debug {
                    warn!(worker = %options.name, error = %e, "production failed");
                } else {
                    debug!(worker = %options.name, error = %e, "production failed");
                }
                return false;
            }
        };

        match self.buffer.put_or_cancel(item, signal) {
            PutOutcome::Inserted => true,
            PutOutcome::Dropped(_) => {
                debug!(worker = %options.name, "buffer full, item dropped");
                false
            }
            PutOutcome::Cancelled(_) => {
                debug!(worker = %options.name, "put cancelled by stop");
                false
            }
        }
    }
}

/// Runs a [`Produce`] step on a dedicated thread, feeding a shared buffer.
pub struct Producer<T, P>
where
    T: Send + 'static,
    P: Produce<T>,
{
    buffer: Arc<BoundedBuffer<T>>,
    worker: Worker<ProduceJob<T, P>>,
}

impl<T, P> Producer<T, P>
where
    T: Send + 'static,
    P: Produce<T>,
{
    /// Creates an idle producer named `producer`.
    pub fn new(buffer: Arc<BoundedBuffer<T>>, step: P) -> Self {
        let job = ProduceJob {
            buffer: Arc::clone(&buffer),
            step,
        };
        let waker = Arc::clone(&buffer);

        Self {
            buffer,
            worker: Worker::new(job, waker, WorkerOptions::new("producer")),
        }
    }

    /// Replaces the thread name, pacing and verbosity.
    #[must_use]
    pub fn with_options(mut self, options: WorkerOptions) -> Self {
        self.worker.set_options(options);
        self
    }

    /// Attaches lifecycle callbacks.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn WorkerListener>) -> Self {
        self.worker.set_listener(listener);
        self
    }

    /// Spawns the worker thread.
    ///
    /// # Errors
    ///
    /// Fails if the worker is already running, the thread cannot be spawned,
    /// or a previous run panicked.
    pub fn start(&mut self) -> Result<()> {
        self.worker.start()
    }

    /// Requests a stop, waking the producer if it is blocked on a full
    /// buffer. Calling it again is a no-op returning `false`.
    pub fn stop(&self) -> bool {
        self.worker.stop()
    }

    /// Waits for the worker thread to exit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Panicked`](crate::Error::Panicked) if the step panicked.
    pub fn join(&mut self) -> Result<()> {
        self.worker.join()
    }

    /// Stops the worker and waits for it.
    ///
    /// # Errors
    ///
    /// See [`join`](Self::join).
    pub fn stop_and_join(&mut self) -> Result<()> {
        self.stop();
        self.join()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.worker.state()
    }

    /// Whether the loop is active or about to be.
    pub fn is_running(&self) -> bool {
        matches!(self.state(), WorkerState::Starting | WorkerState::Running)
    }

    /// Items inserted so far, across restarts.
    pub fn loop_count(&self) -> u64 {
        self.worker.loop_count()
    }

    /// Thread name.
    pub fn name(&self) -> &str {
        &self.worker.options().name
    }

    /// The buffer being fed.
    pub const fn buffer(&self) -> &Arc<BoundedBuffer<T>> {
        &self.buffer
    }
}
