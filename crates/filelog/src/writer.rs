//! The log writer: batching, sync/async write paths, rotation and retention.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use proven_warehouse::{Consumer, PutOutcome, WarehouseListener, WorkerListener, WorkerOptions};

use crate::batch::LineBatch;
use crate::clock::{Clock, SystemClock};
use crate::config::LogWriterConfig;
use crate::consumer::{LogBuffer, LogConsumer, SharedFile};
use crate::error::{Error, Result};
use crate::format::{self, LogLevel};
use crate::retention;
use crate::rotation::RotatingFile;

/// Name of the consumer thread.
const CONSUMER_THREAD_NAME: &str = "filelog-consumer";

/// What happened to appended text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Written to the active file on the caller's thread.
    Written(usize),
    /// Handed to the consumer thread.
    Queued,
    /// Held in the batch until it grows past its threshold.
    Buffered,
    /// Rejected by a full queue configured to drop.
    Dropped,
    /// Nothing to write.
    Skipped,
}

/// Builder for [`LogWriter`].
pub struct LogWriterBuilder {
    config: LogWriterConfig,
    clock: Option<Arc<dyn Clock>>,
    queue_listener: Option<Arc<dyn WarehouseListener<String>>>,
    worker_listener: Option<Arc<dyn WorkerListener>>,
}

impl LogWriterBuilder {
    /// Uses `clock` for file stamps and line timestamps.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Observes the consumer queue.
    #[must_use]
    pub fn queue_listener(mut self, listener: Arc<dyn WarehouseListener<String>>) -> Self {
        self.queue_listener = Some(listener);
        self
    }

    /// Observes the consumer thread lifecycle.
    #[must_use]
    pub fn worker_listener(mut self, listener: Arc<dyn WorkerListener>) -> Self {
        self.worker_listener = Some(listener);
        self
    }

    /// Builds the writer.
    ///
    /// A log directory that cannot be created yet is not fatal: every write
    /// fails with [`Error::CreateDir`] until it can be.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration is inconsistent.
    pub fn build(self) -> Result<LogWriter> {
        let config = self.config;
        config.validate()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let mut queue = LogBuffer::new(config.queue)?.with_debug(config.debug);
        if let Some(listener) = self.queue_listener {
            queue = queue.with_listener(listener);
        }

        let file = RotatingFile::new(config.rotation_settings(), Arc::clone(&clock));
        if let Err(e) = file.ensure_dir() {
            warn!(error = %e, "log directory unavailable");
        }

        if config.sweep_on_start
            && config.max_file_count > 0
            && let Err(e) =
                retention::sweep_in_background(config.dir.clone(), config.max_file_count, None)
        {
            warn!(error = %e, "failed to start retention sweep");
        }

        info!(
            dir = %config.dir.display(),
            async_mode = config.async_mode,
            buffer_mode = config.buffer_mode,
            "log writer ready"
        );

        Ok(LogWriter {
            batch: Mutex::new(LineBatch::new(
                config.batch_soft_threshold,
                config.batch_hard_ceiling,
            )),
            file: Arc::new(Mutex::new(file)),
            queue: Arc::new(queue),
            consumer: Mutex::new(None),
            worker_listener: self.worker_listener,
            shut_down: AtomicBool::new(false),
            clock,
            config,
        })
    }
}

/// Appends text to rotating log files, either on the caller's thread or
/// through a consumer thread fed by a bounded queue.
///
/// Both paths take the same write-lock around the active file.
pub struct LogWriter {
    config: LogWriterConfig,
    clock: Arc<dyn Clock>,
    file: SharedFile,
    queue: Arc<LogBuffer>,
    consumer: Mutex<Option<Consumer<String, LogConsumer>>>,
    worker_listener: Option<Arc<dyn WorkerListener>>,
    batch: Mutex<LineBatch>,
    shut_down: AtomicBool,
}

impl LogWriter {
    /// Starts building a writer.
    #[must_use]
    pub const fn builder(config: LogWriterConfig) -> LogWriterBuilder {
        LogWriterBuilder {
            config,
            clock: None,
            queue_listener: None,
            worker_listener: None,
        }
    }

    /// Builds a writer with the system clock and no listeners.
    ///
    /// # Errors
    ///
    /// See [`LogWriterBuilder::build`].
    pub fn new(config: LogWriterConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Active configuration.
    pub const fn config(&self) -> &LogWriterConfig {
        &self.config
    }

    /// Appends `text` as is.
    ///
    /// # Errors
    ///
    /// Returns the write failure of the sync path. Failures on the consumer
    /// thread are logged there, not reported here.
    pub fn append(&self, text: &str) -> Result<Delivery> {
        if text.is_empty() {
            return Ok(Delivery::Skipped);
        }

        if self.config.buffer_mode {
            let mut batch = self.batch.lock();
            batch.push(text);
            if !batch.should_flush() {
                return Ok(Delivery::Buffered);
            }
            return self.flush_batch(&mut batch);
        }

        self.deliver(text.to_string()).map_err(|(e, _)| e)
    }

    /// Appends `text`, newline-terminated in line mode.
    ///
    /// # Errors
    ///
    /// See [`append`](Self::append).
    pub fn append_line(&self, text: &str) -> Result<Delivery> {
        if self.config.line_mode {
            self.append(&format!("{text}\n"))
        } else {
            self.append(text)
        }
    }

    /// Appends a `<time> <thread> <L>/<tag>: <text>` line.
    ///
    /// # Errors
    ///
    /// See [`append`](Self::append).
    pub fn print_log(&self, level: LogLevel, tag: &str, text: &str) -> Result<Delivery> {
        let line = format::format_line(
            level,
            tag,
            text,
            &format::thread_info(),
            &self.clock.now(),
        );
        self.append_line(&line)
    }

    /// Like [`print_log`](Self::print_log), followed by `error` and one
    /// `Caused by:` line per error in its source chain.
    ///
    /// # Errors
    ///
    /// See [`append`](Self::append).
    pub fn print_error(
        &self,
        level: LogLevel,
        tag: &str,
        text: &str,
        error: &dyn std::error::Error,
    ) -> Result<Delivery> {
        let line = format::format_line(
            level,
            tag,
            text,
            &format::thread_info(),
            &self.clock.now(),
        );
        self.append_line(&format!("{line}\n{}", format::format_error_chain(error)))
    }

    /// Pushes batched text to the write path regardless of its size.
    ///
    /// # Errors
    ///
    /// Returns the sync write failure; the text stays batched unless that
    /// leaves the batch past its hard ceiling.
    pub fn flush(&self) -> Result<Delivery> {
        let mut batch = self.batch.lock();
        self.flush_batch(&mut batch)
    }

    /// Renames the active file with the locked marker so it survives the
    /// retention sweep, and continues in a fresh file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the rename fails.
    pub fn lock_current_file(&self) -> Result<Option<PathBuf>> {
        self.file.lock().lock_current()
    }

    /// Runs the date and size checks without writing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CreateDir`] if the directory is unavailable.
    pub fn rotate_if_needed(&self) -> Result<bool> {
        self.file.lock().rotate_if_needed()
    }

    /// Path of the active file, once one has been opened.
    pub fn current_path(&self) -> Option<PathBuf> {
        self.file.lock().current_path().map(PathBuf::from)
    }

    /// Names of the unlocked log files, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory cannot be read.
    pub fn log_file_names(&self) -> Result<Vec<String>> {
        Ok(retention::list_log_files(&self.config.dir)?
            .into_iter()
            .map(|entry| entry.name)
            .collect())
    }

    /// Number of unlocked log files.
    ///
    /// # Errors
    ///
    /// See [`log_file_names`](Self::log_file_names).
    pub fn log_file_count(&self) -> Result<usize> {
        Ok(retention::list_log_files(&self.config.dir)?.len())
    }

    /// Deletes the oldest unlocked files beyond the configured count on the
    /// caller's thread. Returns how many were deleted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory cannot be listed.
    pub fn sweep_retention(&self) -> Result<usize> {
        let keep = self.current_path();
        retention::sweep(&self.config.dir, self.config.max_file_count, keep.as_deref())
    }

    /// Like [`sweep_retention`](Self::sweep_retention), on a background thread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the thread cannot be spawned.
    pub fn sweep_retention_in_background(&self) -> Result<JoinHandle<usize>> {
        retention::sweep_in_background(
            self.config.dir.clone(),
            self.config.max_file_count,
            self.current_path(),
        )
    }

    /// Whether the consumer thread is running.
    pub fn is_consumer_running(&self) -> bool {
        self.consumer
            .lock()
            .as_ref()
            .is_some_and(Consumer::is_running)
    }

    /// Lines waiting for the consumer thread.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Stops the consumer thread and waits for it. Queued text stays queued
    /// until the next async append restarts the consumer or the writer shuts
    /// down.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Warehouse`] if the consumer thread panicked.
    pub fn stop_consumer(&self) -> Result<()> {
        if let Some(consumer) = self.consumer.lock().as_mut() {
            consumer.stop_and_join()?;
            debug!("consumer stopped");
        }
        Ok(())
    }

    /// Flushes everything and releases the file. Queued text is written on
    /// the caller's thread ahead of batched text. Later appends bypass the
    /// queue. Calling it again does nothing.
    ///
    /// # Errors
    ///
    /// Returns the first failure met; the remaining steps still run.
    pub fn shutdown(&self) -> Result<()> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let mut first_error = None;

        if let Some(mut consumer) = self.consumer.lock().take()
            && let Err(e) = consumer.stop_and_join()
        {
            warn!(error = %e, "consumer did not stop cleanly");
            first_error.get_or_insert(Error::from(e));
        }

        let leftover = self.queue.drain();
        if !leftover.is_empty() {
            debug!(count = leftover.len(), "writing queued text on shutdown");
        }
        {
            let mut file = self.file.lock();
            for text in leftover {
                if let Err(e) = file.write(&text) {
                    warn!(error = %e, "failed to write queued text");
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Err(e) = self.flush() {
            warn!(error = %e, "failed to flush batched text");
            first_error.get_or_insert(e);
        }

        if let Err(e) = self.file.lock().close() {
            first_error.get_or_insert(e);
        }

        info!(dir = %self.config.dir.display(), "log writer shut down");
        first_error.map_or(Ok(()), Err)
    }

    fn flush_batch(&self, batch: &mut LineBatch) -> Result<Delivery> {
        if batch.is_empty() {
            return Ok(Delivery::Skipped);
        }

        let pending = batch.take();
        self.deliver(pending).map_err(|(e, text)| {
            let discarded = batch.restore(text);
            if discarded > 0 {
                warn!(discarded, "batch past its hard ceiling, discarding");
            }
            e
        })
    }

    /// Hands text to the consumer queue, or writes it on this thread in sync
    /// mode, after shutdown, or when the consumer cannot be started. On
    /// failure the text is handed back.
    fn deliver(&self, text: String) -> std::result::Result<Delivery, (Error, String)> {
        let text = if self.config.async_mode {
            match self.enqueue(text) {
                Ok(delivery) => return Ok(delivery),
                Err(text) => text,
            }
        } else {
            text
        };

        let result = self.file.lock().write(&text);
        match result {
            Ok(written) => Ok(Delivery::Written(written)),
            Err(e) => Err((e, text)),
        }
    }

    /// Queues `text` for the consumer thread, starting it if needed. The
    /// consumer slot stays locked until the text is queued, so a concurrent
    /// shutdown either drains it or is seen here. Hands the text back after
    /// shutdown or when the consumer cannot be started.
    fn enqueue(&self, text: String) -> std::result::Result<Delivery, String> {
        let mut slot = self.consumer.lock();
        if self.shut_down.load(Ordering::Acquire) {
            return Err(text);
        }
        if let Err(e) = self.ensure_consumer(&mut slot) {
            warn!(error = %e, "consumer unavailable, writing on caller thread");
            return Err(text);
        }

        match self.queue.put(text) {
            PutOutcome::Inserted => Ok(Delivery::Queued),
            PutOutcome::Dropped(text) | PutOutcome::Cancelled(text) => {
                if self.config.debug {
                    debug!(bytes = text.len(), "queue full, text dropped");
                }
                Ok(Delivery::Dropped)
            }
        }
    }

    fn ensure_consumer(&self, slot: &mut Option<Consumer<String, LogConsumer>>) -> Result<()> {
        let consumer = slot.get_or_insert_with(|| {
            let consumer = Consumer::new(
                Arc::clone(&self.queue),
                LogConsumer::new(Arc::clone(&self.file)),
            )
            .with_options(WorkerOptions::new(CONSUMER_THREAD_NAME).with_debug(self.config.debug));

            match &self.worker_listener {
                Some(listener) => consumer.with_listener(Arc::clone(listener)),
                None => consumer,
            }
        });

        if !consumer.is_running() {
            consumer.start()?;
            debug!("consumer started");
        }
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "log writer shutdown failed");
        }
    }
}

impl std::fmt::Debug for LogWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogWriter")
            .field("config", &self.config)
            .field("queue", &self.queue)
            .field("consumer_running", &self.is_consumer_running())
            .field("shut_down", &self.shut_down.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use assert_matches::assert_matches;
    use chrono::{Local, TimeZone};
    use std::fs;
    use tempfile::TempDir;

    fn create_temp_dir() -> TempDir {
        TempDir::new().expect("Failed to create temp dir")
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Local.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        ))
    }

    fn sync_config(dir: &TempDir) -> LogWriterConfig {
        LogWriterConfig::new(dir.path())
            .with_async_mode(false)
            .with_sweep_on_start(false)
    }

    #[test]
    fn test_sync_append_writes_immediately() {
        let dir = create_temp_dir();
        let writer = LogWriter::builder(sync_config(&dir))
            .clock(clock())
            .build()
            .unwrap();

        assert_matches!(writer.append_line("hello"), Ok(Delivery::Written(6)));
        assert_matches!(writer.append(""), Ok(Delivery::Skipped));

        let path = writer.current_path().unwrap();
        assert_eq!(path, dir.path().join("20240601.txt"));
        assert_eq!(fs::read_to_string(path).unwrap(), "hello\n");
        assert!(!writer.is_consumer_running());
    }

    #[test]
    fn test_buffer_mode_holds_text_until_threshold() {
        let dir = create_temp_dir();
        let config = sync_config(&dir)
            .with_buffer_mode(true)
            .with_batch_limits(10, 100);
        let writer = LogWriter::builder(config).clock(clock()).build().unwrap();

        assert_matches!(writer.append("12345"), Ok(Delivery::Buffered));
        assert!(writer.current_path().is_none());

        assert_matches!(writer.append("678901"), Ok(Delivery::Written(11)));
        assert_matches!(writer.append("tail"), Ok(Delivery::Buffered));
        assert_matches!(writer.flush(), Ok(Delivery::Written(4)));
        assert_matches!(writer.flush(), Ok(Delivery::Skipped));

        let text = fs::read_to_string(writer.current_path().unwrap()).unwrap();
        assert_eq!(text, "12345678901tail");
    }

    #[test]
    fn test_async_append_starts_consumer_lazily() {
        let dir = create_temp_dir();
        let config = LogWriterConfig::new(dir.path()).with_sweep_on_start(false);
        let writer = LogWriter::builder(config).clock(clock()).build().unwrap();

        assert!(!writer.is_consumer_running());
        assert_matches!(writer.append_line("queued"), Ok(Delivery::Queued));
        assert!(writer.is_consumer_running());

        writer.shutdown().unwrap();
        assert!(!writer.is_consumer_running());

        let text = fs::read_to_string(dir.path().join("20240601.txt")).unwrap();
        assert_eq!(text, "queued\n");
    }

    #[test]
    fn test_writes_after_shutdown_bypass_queue() {
        let dir = create_temp_dir();
        let config = LogWriterConfig::new(dir.path()).with_sweep_on_start(false);
        let writer = LogWriter::builder(config).clock(clock()).build().unwrap();

        writer.shutdown().unwrap();
        assert_matches!(writer.append_line("late"), Ok(Delivery::Written(5)));
        assert!(!writer.is_consumer_running());
    }

    #[test]
    fn test_print_log_layout() {
        let dir = create_temp_dir();
        let writer = LogWriter::builder(sync_config(&dir))
            .clock(clock())
            .build()
            .unwrap();

        writer.print_log(LogLevel::I, "Boot", "ready").unwrap();

        let text = fs::read_to_string(writer.current_path().unwrap()).unwrap();
        assert!(text.starts_with("2024-06-01 12:00:00.000 "));
        assert!(text.ends_with(" I/Boot: ready\n"));
    }

    #[test]
    fn test_print_error_appends_source_chain() {
        let dir = create_temp_dir();
        let writer = LogWriter::builder(sync_config(&dir))
            .clock(clock())
            .build()
            .unwrap();

        let error = Error::io(
            dir.path().join("db.sqlite"),
            std::io::Error::other("disk full"),
        );
        writer
            .print_error(LogLevel::E, "Store", "commit failed", &error)
            .unwrap();

        let text = fs::read_to_string(writer.current_path().unwrap()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with(" E/Store: commit failed"));
        assert_eq!(lines[1], error.to_string());
        assert_eq!(lines[2], "Caused by: disk full");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = LogWriter::new(LogWriterConfig::new("logs").with_encoding("nope"));

        assert_matches!(result, Err(Error::InvalidConfig(_)));
    }
}
