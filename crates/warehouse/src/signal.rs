//! Cooperative stop signal shared between a worker and its controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A one-way "please stop" flag that blocked parties can wait on.
///
/// Raising the signal never interrupts anything by force. Waiters observe it
/// on their own: [`wait_timeout`](Self::wait_timeout) wakes immediately, and
/// buffer operations taking a signal give up once the buffer wakes them.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: AtomicBool,
    lock: Mutex<()>,
    cond: Condvar,
}

impl StopSignal {
    /// Creates a signal in the "running" position.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a stop has been requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Requests a stop. Returns `true` only for the call that flipped the flag.
    pub fn stop(&self) -> bool {
        let _guard = self.lock.lock();
        let first = !self.stopped.swap(true, Ordering::AcqRel);
        self.cond.notify_all();
        first
    }

    /// Re-arms the signal for another run.
    pub(crate) fn reset(&self) {
        let _guard = self.lock.lock();
        self.stopped.store(false, Ordering::Release);
    }

    /// Sleeps for up to `timeout`, returning early once a stop is requested.
    ///
    /// Returns whether a stop has been requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if timeout.is_zero() {
            return self.is_stopped();
        }

        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();
        while !self.is_stopped() {
            if self.cond.wait_until(&mut guard, deadline).timed_out() {
                break;
            }
        }
        drop(guard);

        self.is_stopped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_stop_is_reported_once() {
        let signal = StopSignal::new();

        assert!(!signal.is_stopped());
        assert!(signal.stop());
        assert!(!signal.stop());
        assert!(signal.is_stopped());

        signal.reset();
        assert!(!signal.is_stopped());
    }

    #[test]
    fn test_wait_times_out_without_stop() {
        let signal = StopSignal::new();
        let started = Instant::now();

        assert!(!signal.wait_timeout(Duration::from_millis(20)));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_stop_interrupts_wait() {
        let signal = Arc::new(StopSignal::new());
        let waiter = Arc::clone(&signal);

        let handle = thread::spawn(move || {
            let started = Instant::now();
            let stopped = waiter.wait_timeout(Duration::from_secs(30));
            (stopped, started.elapsed())
        });

        thread::sleep(Duration::from_millis(20));
        signal.stop();

        let (stopped, elapsed) = handle.join().unwrap();
        assert!(stopped);
        assert!(elapsed < Duration::from_secs(5));
    }
}
