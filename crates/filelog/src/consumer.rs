//! Queue of pending lines and the consumption step that writes them.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;
use proven_warehouse::{BoundedBuffer, Consume};

use crate::error::Error;
use crate::rotation::RotatingFile;

/// Queue of text waiting for the consumer thread.
pub type LogBuffer = BoundedBuffer<String>;

/// The write-lock: every append, sync or async, goes through this mutex.
pub type SharedFile = Arc<Mutex<RotatingFile>>;

/// Writes dequeued text to the active log file.
///
/// A failed write is reported to the worker, which logs it. The text is not
/// re-enqueued.
#[derive(Debug, Clone)]
pub struct LogConsumer {
    file: SharedFile,
}

impl LogConsumer {
    /// Creates a consumer writing through `file`.
    pub const fn new(file: SharedFile) -> Self {
        Self { file }
    }
}

impl Consume<String> for LogConsumer {
    type Error = Error;

    fn consume(&mut self, text: String) -> Result<(), Error> {
        let written = self.file.lock().write(&text)?;
        trace!(bytes = written, "consumer wrote queued text");
        Ok(())
    }
}
