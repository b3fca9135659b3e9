//! Dedicated-thread worker lifecycle shared by producers and consumers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::buffer::Wakeable;
use crate::error::{Error, Result};
use crate::listener::WorkerListener;
use crate::signal::StopSignal;

/// Lifecycle of a worker thread.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Never started.
    Idle = 0,
    /// Thread spawned, loop not yet entered.
    Starting = 1,
    /// Looping.
    Running = 2,
    /// Stop requested, loop not yet left.
    Stopping = 3,
    /// Loop left.
    Stopped = 4,
}

impl WorkerState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Starting,
            2 => Self::Running,
            3 => Self::Stopping,
            4 => Self::Stopped,
            _ => Self::Idle,
        }
    }
}

/// Naming, pacing and verbosity of a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOptions {
    /// Thread name, also used in log events.
    pub name: String,

    /// Pause after every step. `Duration::ZERO` disables pacing.
    pub sleep_interval: Duration,

    /// Log step failures at `warn` instead of `debug`.
    pub debug: bool,
}

impl WorkerOptions {
    /// Creates options with the given thread name and no pacing.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sleep_interval: Duration::ZERO,
            debug: false,
        }
    }

    /// Sets the pacing delay.
    #[must_use]
    pub const fn with_sleep_interval(mut self, sleep_interval: Duration) -> Self {
        self.sleep_interval = sleep_interval;
        self
    }

    /// Sets the verbosity switch.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// One iteration of a worker loop.
pub(crate) trait Job: Send + 'static {
    /// Runs a single step. Returns `true` if an item was processed.
    fn run_once(&mut self, signal: &StopSignal, options: &WorkerOptions) -> bool;
}

struct Shared {
    state: AtomicU8,
    loop_count: AtomicU64,
    signal: StopSignal,
}

impl Shared {
    fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn transition(&self, from: WorkerState, to: WorkerState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Owns the thread running a [`Job`] in a loop until stopped.
///
/// The job lives in a slot shared with the thread so it survives a stop and
/// can be started again.
pub(crate) struct Worker<J: Job> {
    options: WorkerOptions,
    shared: Arc<Shared>,
    job: Arc<Mutex<Option<J>>>,
    handle: Option<JoinHandle<()>>,
    waker: Arc<dyn Wakeable>,
    listener: Option<Arc<dyn WorkerListener>>,
}

impl<J: Job> Worker<J> {
    pub(crate) fn new(job: J, waker: Arc<dyn Wakeable>, options: WorkerOptions) -> Self {
        Self {
            options,
            shared: Arc::new(Shared {
                state: AtomicU8::new(WorkerState::Idle as u8),
                loop_count: AtomicU64::new(0),
                signal: StopSignal::new(),
            }),
            job: Arc::new(Mutex::new(Some(job))),
            handle: None,
            waker,
            listener: None,
        }
    }

    pub(crate) fn set_options(&mut self, options: WorkerOptions) {
        self.options = options;
    }

    pub(crate) fn set_listener(&mut self, listener: Arc<dyn WorkerListener>) {
        self.listener = Some(listener);
    }

    pub(crate) fn options(&self) -> &WorkerOptions {
        &self.options
    }

    pub(crate) fn state(&self) -> WorkerState {
        self.shared.state()
    }

    pub(crate) fn loop_count(&self) -> u64 {
        self.shared.loop_count.load(Ordering::Acquire)
    }

    pub(crate) fn start(&mut self) -> Result<()> {
        if self.handle.is_some() {
            let active = matches!(self.state(), WorkerState::Starting | WorkerState::Running);
            if active && !self.shared.signal.is_stopped() {
                return Err(Error::AlreadyRunning(self.options.name.clone()));
            }
            self.join()?;
        }

        if self.job.lock().is_none() {
            return Err(Error::Panicked(self.options.name.clone()));
        }

        self.shared.signal.reset();
        self.shared.set_state(WorkerState::Starting);

        let shared = Arc::clone(&self.shared);
        let job = Arc::clone(&self.job);
        let listener = self.listener.clone();
        let options = self.options.clone();

        let handle = thread::Builder::new()
            .name(self.options.name.clone())
            .spawn(move || run_loop(&job, &shared, listener.as_deref(), &options))
            .map_err(|source| {
                self.shared.set_state(WorkerState::Idle);
                Error::Spawn {
                    name: self.options.name.clone(),
                    source,
                }
            })?;

        self.handle = Some(handle);
        Ok(())
    }

    /// Requests a stop and wakes the buffer. Returns `false` if there was
    /// nothing to stop or a stop was already requested.
    pub(crate) fn stop(&self) -> bool {
        if matches!(self.state(), WorkerState::Idle | WorkerState::Stopped) {
            return false;
        }
        if !self.shared.signal.stop() {
            return false;
        }

        if !self.shared.transition(WorkerState::Running, WorkerState::Stopping) {
            self.shared
                .transition(WorkerState::Starting, WorkerState::Stopping);
        }
        self.waker.wake();

        debug!(worker = %self.options.name, "stop requested");
        true
    }

    /// Waits for the thread to leave its loop. Blocks forever if the worker
    /// is running and no stop was requested.
    pub(crate) fn join(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        if handle.join().is_err() {
            self.shared.set_state(WorkerState::Stopped);
            return Err(Error::Panicked(self.options.name.clone()));
        }

        Ok(())
    }
}

impl<J: Job> Drop for Worker<J> {
    fn drop(&mut self) {
        self.stop();
        if let Err(e) = self.join() {
            warn!(worker = %self.options.name, error = %e, "worker did not shut down cleanly");
        }
    }
}

fn run_loop<J: Job>(
    slot: &Mutex<Option<J>>,
    shared: &Shared,
    listener: Option<&dyn WorkerListener>,
    options: &WorkerOptions,
) {
    let Some(mut job) = slot.lock().take() else {
        shared.set_state(WorkerState::Stopped);
        return;
    };

    shared.transition(WorkerState::Starting, WorkerState::Running);
    if let Some(listener) = listener {
        listener.on_starting(&options.name);
    }
    info!(worker = %options.name, "worker started");

    while !shared.signal.is_stopped() {
        if job.run_once(&shared.signal, options) {
            shared.loop_count.fetch_add(1, Ordering::AcqRel);
        }

        if !options.sleep_interval.is_zero() && shared.signal.wait_timeout(options.sleep_interval)
        {
            break;
        }
    }

    *slot.lock() = Some(job);
    shared.set_state(WorkerState::Stopped);

    let loop_count = shared.loop_count.load(Ordering::Acquire);
    if let Some(listener) = listener {
        listener.on_finished(&options.name, loop_count);
    }
    info!(worker = %options.name, loop_count, "worker stopped");
}
