//! Observer hooks for buffers and workers

/// Point-in-time view of a buffer, handed to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSnapshot {
    /// Items currently held.
    pub len: usize,
    /// Current soft limit.
    pub capacity: usize,
    /// Hard ceiling.
    pub max_capacity: usize,
    /// Cached full flag.
    pub full: bool,
    /// Cached empty flag.
    pub empty: bool,
}

/// Callbacks fired by a [`BoundedBuffer`](crate::BoundedBuffer).
///
/// Every callback runs on the calling thread while the buffer lock is held,
/// so implementations must return quickly and must not touch the buffer.
pub trait WarehouseListener<T>: Send + Sync {
    /// A put found the buffer full.
    fn on_put_full(&self, _snapshot: &BufferSnapshot, _item: &T) {}

    /// A get found the buffer empty and is about to wait.
    fn on_get_empty(&self, _snapshot: &BufferSnapshot) {}

    /// Whether the current put may wait for room. Returning `false` drops the
    /// item instead, which suits latency-sensitive callers.
    fn on_put_waiting_enabled(&self, _snapshot: &BufferSnapshot) -> bool {
        true
    }
}

/// Lifecycle callbacks of a producer or consumer worker.
pub trait WorkerListener: Send + Sync {
    /// The worker thread entered its loop.
    fn on_starting(&self, _name: &str) {}

    /// The worker thread left its loop.
    fn on_finished(&self, _name: &str, _loop_count: u64) {}
}
