//! Asynchronous, rotating, append-only text log files.
//!
//! [`LogWriter`] decouples "line produced" from "line on disk". In async
//! mode appended text goes through a bounded [`LogBuffer`] to a consumer
//! thread; in sync mode it is written on the caller's thread. Both paths
//! share one write-lock around the active file, which is rotated when the
//! date changes or it grows past a size limit. A retention sweep keeps the
//! newest unlocked files.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod batch;
mod clock;
mod config;
mod consumer;
mod error;
mod file;
mod format;
mod naming;
mod retention;
mod rotation;
mod writer;

pub use batch::{DEFAULT_HARD_CEILING, DEFAULT_SOFT_THRESHOLD, LineBatch};
pub use clock::{Clock, DATE_FORMAT, LINE_TIME_FORMAT, ManualClock, SystemClock, TIMESTAMP_FORMAT};
pub use config::{DEFAULT_MAX_FILE_COUNT, DEFAULT_MAX_FILE_SIZE, LogWriterConfig, default_queue};
pub use consumer::{LogBuffer, LogConsumer, SharedFile};
pub use error::{Error, Result};
pub use file::LogFile;
pub use format::{LogLevel, format_error_chain, format_line, thread_info};
pub use naming::{
    DEFAULT_EXTENSION, FileNaming, LOCKED_MARKER, NamingMode, is_locked, is_locked_name,
    locked_path,
};
pub use retention::{LogFileEntry, list_log_files, sweep, sweep_in_background};
pub use rotation::{RotatingFile, RotationSettings};
pub use writer::{Delivery, LogWriter, LogWriterBuilder};
