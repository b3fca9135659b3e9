//! Consumer worker: removes items from a buffer and processes them.

use std::fmt::Display;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::buffer::BoundedBuffer;
use crate::error::Result;
use crate::listener::WorkerListener;
use crate::signal::StopSignal;
use crate::worker::{Job, Worker, WorkerOptions, WorkerState};

/// A consumption step.
pub trait Consume<T>: Send + 'static {
    /// Failure type, logged by the worker. The item is not retried.
    type Error: Display;

    /// Processes one item.
    ///
    /// # Errors
    ///
    /// Any error is logged and the loop moves on to the next item.
    fn consume(&mut self, item: T) -> std::result::Result<(), Self::Error>;
}

impl<T, E, F> Consume<T> for F
where
    F: FnMut(T) -> std::result::Result<(), E> + Send + 'static,
    E: Display,
{
    type Error = E;

    fn consume(&mut self, item: T) -> std::result::Result<(), E> {
        self(item)
    }
}

struct ConsumeJob<T, C> {
    buffer: Arc<BoundedBuffer<T>>,
    step: C,
}

impl<T, C> Job for ConsumeJob<T, C>
where
    T: Send + 'static,
    C: Consume<T>,
{
    fn run_once(&mut self, signal: &StopSignal, options: &WorkerOptions) -> bool {
        let Some(item) = self.buffer.get_or_cancel(signal) else {
            trace!(worker = %options.name, "get cancelled by stop");
            return false;
        };

        match self.step.consume(item) {
            Ok(()) => true,
            Err(e) => {
                if options.debug {
                    warn!(worker = %options.name, error = %e, "consumption failed");
                } else {
                    debug!(worker = %options.name, error = %e, "consumption failed");
                }
                false
            }
        }
    }
}

/// Runs a [`Consume`] step on a dedicated thread, draining a shared buffer.
pub struct Consumer<T, C>
where
    T: Send + 'static,
    C: Consume<T>,
{
    buffer: Arc<BoundedBuffer<T>>,
    worker: Worker<ConsumeJob<T, C>>,
}

impl<T, C> Consumer<T, C>
where
    T: Send + 'static,
    C: Consume<T>,
{
    /// Creates an idle consumer named `consumer`.
    pub fn new(buffer: Arc<BoundedBuffer<T>>, step: C) -> Self {
        let job = ConsumeJob {
            buffer: Arc::clone(&buffer),
            step,
        };
        let waker = Arc::clone(&buffer);

        Self {
            buffer,
            worker: Worker::new(job, waker, WorkerOptions::new("consumer")),
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

    /// Requests a stop, waking the consumer if it is blocked on an empty
    /// buffer. Items still queued stay in the buffer. Calling it again is a
    /// no-op returning `false`.
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

    /// Items consumed successfully so far, across restarts.
    pub fn loop_count(&self) -> u64 {
        self.worker.loop_count()
    }

    /// Thread name.
    pub fn name(&self) -> &str {
        &self.worker.options().name
    }

    /// The buffer being drained.
    pub const fn buffer(&self) -> &Arc<BoundedBuffer<T>> {
        &self.buffer
    }
}
