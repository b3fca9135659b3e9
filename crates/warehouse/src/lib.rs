//! Bounded producer/consumer buffer with cooperatively stoppable workers.
//!
//! A [`BoundedBuffer`] holds items in FIFO order under a soft capacity that
//! may grow up to a hard ceiling. A full buffer either blocks the putter or
//! hands the item back, depending on policy. [`Producer`] and [`Consumer`]
//! run a step on a dedicated thread and stop cooperatively: `stop()` raises a
//! [`StopSignal`] and wakes the buffer, so a worker blocked on a full or empty
//! buffer returns without any placeholder item being inserted.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod buffer;
mod config;
mod consumer;
mod error;
mod listener;
mod producer;
mod signal;
mod worker;

pub use buffer::{BoundedBuffer, PutOutcome};
pub use config::{CapacityConfig, DEFAULT_CAPACITY, DEFAULT_MAX_CAPACITY};
pub use consumer::{Consume, Consumer};
pub use error::{Error, Result};
pub use listener::{BufferSnapshot, WarehouseListener, WorkerListener};
pub use producer::{Produce, Producer};
pub use signal::StopSignal;
pub use worker::{WorkerOptions, WorkerState};
