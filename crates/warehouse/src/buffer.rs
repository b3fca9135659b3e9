//! The shared FIFO buffer ("warehouse") coordinating producers and consumers.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::config::CapacityConfig;
use crate::error::Result;
use crate::listener::{BufferSnapshot, WarehouseListener};
use crate::signal::StopSignal;

/// Result of inserting an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome<T> {
    /// The item is now at the tail of the buffer.
    Inserted,
    /// The buffer was full and the policy forbade waiting. The item is handed back.
    Dropped(T),
    /// The wait for room was abandoned because a stop was requested.
    Cancelled(T),
}

impl<T> PutOutcome<T> {
    /// Whether the item made it into the buffer.
    #[must_use]
    pub const fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted)
    }

    /// Returns the rejected item, if any.
    pub fn into_rejected(self) -> Option<T> {
        match self {
            Self::Inserted => None,
            Self::Dropped(item) | Self::Cancelled(item) => Some(item),
        }
    }
}

/// How long an operation may block.
#[derive(Clone, Copy)]
enum Wait<'a> {
    Never,
    Forever,
    Until(&'a StopSignal),
}

struct State<T> {
    items: VecDeque<T>,
    capacity: usize,
    full: bool,
    empty: bool,
}

/// A thread-safe FIFO with a soft capacity, optional growth up to a hard
/// ceiling, and a configurable block-or-drop policy when full.
///
/// Puts wait on a not-full condition and gets wait on a not-empty condition;
/// the mutex is released while blocked.
pub struct BoundedBuffer<T> {
    state: Mutex<State<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    max_capacity: usize,
    growth_increment: usize,
    auto_grow: bool,
    waiting_disabled_on_full: bool,
    bounded: bool,
    listener: Option<Arc<dyn WarehouseListener<T>>>,
    debug: bool,
}

impl<T> BoundedBuffer<T> {
    /// Creates a buffer from a capacity configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if the
    /// configuration is inconsistent.
    pub fn new(config: CapacityConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(config.capacity),
                capacity: config.capacity,
                full: false,
                empty: true,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            max_capacity: config.max_capacity,
            growth_increment: config.effective_growth_increment(),
            auto_grow: config.auto_grow,
            waiting_disabled_on_full: config.waiting_disabled_on_full,
            bounded: !config.is_unbounded(),
            listener: None,
            debug: false,
        })
    }

    /// Creates a buffer that never reports full.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                capacity: 0,
                full: false,
                empty: true,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            max_capacity: 0,
            growth_increment: 0,
            auto_grow: false,
            waiting_disabled_on_full: false,
            bounded: false,
            listener: None,
            debug: false,
        }
    }

    /// Attaches a listener.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn WarehouseListener<T>>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Enables verbose tracing of full/empty transitions.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Inserts at the tail, waiting for room when full unless the policy
    /// says to drop.
    pub fn put(&self, item: T) -> PutOutcome<T> {
        self.insert(item, Wait::Forever)
    }

    /// Like [`put`](Self::put), but gives up with [`PutOutcome::Cancelled`]
    /// once `signal` is stopped and the buffer is woken.
    pub fn put_or_cancel(&self, item: T, signal: &StopSignal) -> PutOutcome<T> {
        self.insert(item, Wait::Until(signal))
    }

    /// Inserts only if there is room (after growth), never waiting.
    pub fn try_put(&self, item: T) -> PutOutcome<T> {
        self.insert(item, Wait::Never)
    }

    /// Removes the head, waiting until an item is available.
    pub fn get(&self) -> T {
        loop {
            if let Some(item) = self.take(Wait::Forever) {
                return item;
            }
        }
    }

    /// Removes the head, or returns `None` if the wait was abandoned because
    /// `signal` was stopped.
    pub fn get_or_cancel(&self, signal: &StopSignal) -> Option<T> {
        self.take(Wait::Until(signal))
    }

    /// Removes the head if one is present.
    pub fn try_get(&self) -> Option<T> {
        self.take(Wait::Never)
    }

    /// Removes every item, oldest first.
    pub fn drain(&self) -> Vec<T> {
        let mut state = self.state.lock();
        let items: Vec<T> = state.items.drain(..).collect();
        self.refresh(&mut state);
        self.not_full.notify_all();
        items
    }

    /// Removes the head without waiting.
    pub fn remove_first(&self) -> Option<T> {
        self.try_get()
    }

    /// Removes the most recently inserted item without waiting.
    pub fn remove_last(&self) -> Option<T> {
        let mut state = self.state.lock();
        let item = state.items.pop_back();
        if item.is_some() {
            self.refresh(&mut state);
            self.not_full.notify_one();
        }
        item
    }

    /// Number of items held.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Cached empty flag, as of the last put or get.
    pub fn is_empty(&self) -> bool {
        self.state.lock().empty
    }

    /// Cached full flag, as of the last put or get.
    pub fn is_full(&self) -> bool {
        self.state.lock().full
    }

    /// Current soft limit.
    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    /// Hard ceiling.
    pub const fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Whether the full check is active.
    pub const fn is_bounded(&self) -> bool {
        self.bounded
    }

    /// Point-in-time view of the buffer.
    pub fn snapshot(&self) -> BufferSnapshot {
        let state = self.state.lock();
        self.snapshot_of(&state)
    }

    /// Wakes every blocked putter and getter so they re-check their stop
    /// signals. Items are not touched.
    pub fn wake_all(&self) {
        let _state = self.state.lock();
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    fn insert(&self, item: T, wait: Wait<'_>) -> PutOutcome<T> {
        let mut state = self.state.lock();
        let mut reported = false;

        loop {
            self.refresh(&mut state);
            if state.full {
                self.grow(&mut state);
            }
            if !state.full {
                break;
            }

            let snapshot = self.snapshot_of(&state);
            if !reported {
                reported = true;
                if self.debug {
                    debug!(len = snapshot.len, capacity = snapshot.capacity, "buffer full");
                }
                if let Some(listener) = &self.listener {
                    listener.on_put_full(&snapshot, &item);
                }
            }

            let may_wait = !self.waiting_disabled_on_full
                && self
                    .listener
                    .as_ref()
                    .is_none_or(|listener| listener.on_put_waiting_enabled(&snapshot));

            match wait {
                Wait::Never => return PutOutcome::Dropped(item),
                _ if !may_wait => {
                    if self.debug {
                        debug!(len = snapshot.len, "buffer full, dropping item");
                    }
                    return PutOutcome::Dropped(item);
                }
                Wait::Forever => self.not_full.wait(&mut state),
                Wait::Until(signal) => {
                    if signal.is_stopped() {
                        trace!("put cancelled while waiting for room");
                        return PutOutcome::Cancelled(item);
                    }
                    self.not_full.wait(&mut state);
                }
            }
        }

        state.items.push_back(item);
        self.refresh(&mut state);
        self.not_empty.notify_one();
        PutOutcome::Inserted
    }

    fn take(&self, wait: Wait<'_>) -> Option<T> {
        let mut state = self.state.lock();
        let mut reported = false;

        loop {
            if let Some(item) = state.items.pop_front() {
                self.refresh(&mut state);
                self.not_full.notify_one();
                return Some(item);
            }
            state.empty = true;

            match wait {
                Wait::Never => return None,
                Wait::Until(signal) if signal.is_stopped() => {
                    trace!("get cancelled while waiting for an item");
                    return None;
                }
                Wait::Forever | Wait::Until(_) => {}
            }

            if !reported {
                reported = true;
                if self.debug {
                    debug!("buffer empty, waiting");
                }
                if let Some(listener) = &self.listener {
                    listener.on_get_empty(&self.snapshot_of(&state));
                }
            }
            self.not_empty.wait(&mut state);
        }
    }

    fn grow(&self, state: &mut State<T>) {
        if !self.auto_grow || !self.bounded || state.capacity >= self.max_capacity {
            return;
        }

        let previous = state.capacity;
        state.capacity = previous
            .saturating_add(self.growth_increment.max(1))
            .min(self.max_capacity);
        self.refresh(state);

        debug!(
            from = previous,
            to = state.capacity,
            max = self.max_capacity,
            "buffer capacity grown"
        );
    }

    fn refresh(&self, state: &mut State<T>) {
        let len = state.items.len();
        state.full = self.bounded && len >= state.capacity;
        state.empty = len == 0;
    }

    fn snapshot_of(&self, state: &State<T>) -> BufferSnapshot {
        BufferSnapshot {
            len: state.items.len(),
            capacity: state.capacity,
            max_capacity: self.max_capacity,
            full: state.full,
            empty: state.empty,
        }
    }
}

impl<T> fmt::Debug for BoundedBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("BoundedBuffer")
            .field("len", &snapshot.len)
            .field("capacity", &snapshot.capacity)
            .field("max_capacity", &self.max_capacity)
            .field("auto_grow", &self.auto_grow)
            .field("waiting_disabled_on_full", &self.waiting_disabled_on_full)
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}

/// Type-erased handle used by workers to wake a buffer on stop.
pub(crate) trait Wakeable: Send + Sync {
    fn wake(&self);
}

impl<T: Send> Wakeable for BoundedBuffer<T> {
    fn wake(&self) {
        self.wake_all();
    }
}
