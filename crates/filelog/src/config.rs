//! Configuration for [`LogWriter`](crate::LogWriter).

use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use serde::{Deserialize, Deserializer, Serialize};
use proven_warehouse::CapacityConfig;

use crate::batch::{DEFAULT_HARD_CEILING, DEFAULT_SOFT_THRESHOLD};
use crate::error::{Error, Result};
use crate::naming::{DEFAULT_EXTENSION, FileNaming, NamingMode};
use crate::rotation::RotationSettings;

/// Size after which the active file is rotated (5 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Unlocked files kept by the retention sweep.
pub const DEFAULT_MAX_FILE_COUNT: usize = 5;

/// Settings of a log writer.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogWriterConfig {
    /// Directory holding the log files.
    pub dir: PathBuf,

    /// Optional `prefix-` before every file stamp.
    pub prefix: Option<String>,

    /// File extension, with or without the leading dot.
    pub extension: String,

    /// Date (`YYYYMMDD`) or timestamp (`YYYYMMDD_HHMMSS`) file names.
    pub naming: NamingMode,

    /// Fixed file name. Disables the daily rotation check.
    pub file_name: Option<String>,

    /// Encoding label understood by `encoding_rs`, e.g. `utf-8` or `gbk`.
    pub encoding: String,

    /// Size limit of one file in bytes. Zero disables size rotation.
    pub max_file_size: u64,

    /// Unlocked files to keep. Zero disables the retention sweep.
    pub max_file_count: usize,

    /// Hand writes to a consumer thread instead of the caller's thread.
    pub async_mode: bool,

    /// Capacity policy of the consumer queue. Keys a `[queue]` table leaves
    /// out keep the values of [`default_queue`].
    #[serde(deserialize_with = "deserialize_queue")]
    pub queue: CapacityConfig,

    /// Accumulate appended text and flush it in batches.
    pub buffer_mode: bool,

    /// Batch size that triggers a flush.
    pub batch_soft_threshold: usize,

    /// Batch size past which unflushable text is discarded.
    pub batch_hard_ceiling: usize,

    /// Terminate every `append_line`/`print_log` entry with a newline.
    pub line_mode: bool,

    /// Verbose tracing of queue and worker activity.
    pub debug: bool,

    /// Run a retention sweep when the writer is built.
    pub sweep_on_start: bool,
}

/// Queue policy of a default writer: capacity 10, growing up to 100.
#[must_use]
pub fn default_queue() -> CapacityConfig {
    CapacityConfig::default().with_auto_grow(true)
}

/// A `[queue]` table where every key is optional.
#[derive(Deserialize)]
struct QueueTable {
    capacity: Option<usize>,
    max_capacity: Option<usize>,
    growth_increment: Option<usize>,
    auto_grow: Option<bool>,
    waiting_disabled_on_full: Option<bool>,
}

fn deserialize_queue<'de, D>(deserializer: D) -> std::result::Result<CapacityConfig, D::Error>
where
    D: Deserializer<'de>,
{
    let table = QueueTable::deserialize(deserializer)?;
    let defaults = default_queue();

    Ok(CapacityConfig {
        capacity: table.capacity.unwrap_or(defaults.capacity),
        max_capacity: table.max_capacity.unwrap_or(defaults.max_capacity),
        growth_increment: table.growth_increment.unwrap_or(defaults.growth_increment),
        auto_grow: table.auto_grow.unwrap_or(defaults.auto_grow),
        waiting_disabled_on_full: table
            .waiting_disabled_on_full
            .unwrap_or(defaults.waiting_disabled_on_full),
    })
}

impl Default for LogWriterConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            prefix: None,
            extension: DEFAULT_EXTENSION.to_string(),
            naming: NamingMode::Date,
            file_name: None,
            encoding: "utf-8".to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_file_count: DEFAULT_MAX_FILE_COUNT,
            async_mode: true,
            queue: default_queue(),
            buffer_mode: false,
            batch_soft_threshold: DEFAULT_SOFT_THRESHOLD,
            batch_hard_ceiling: DEFAULT_HARD_CEILING,
            line_mode: true,
            debug: false,
            sweep_on_start: true,
        }
    }
}

impl LogWriterConfig {
    /// Default configuration writing into `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] on malformed TOML and
    /// [`Error::InvalidConfig`] if the values are inconsistent.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise see
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Checks that the values describe a usable writer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.dir.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("log directory is empty".to_string()));
        }
        if Encoding::for_label(self.encoding.as_bytes()).is_none() {
            return Err(Error::InvalidConfig(format!(
                "unknown encoding `{}`",
                self.encoding
            )));
        }
        if let Some(name) = &self.file_name
            && (name.contains('/') || name.contains('\\'))
        {
            return Err(Error::InvalidConfig(format!(
                "file name `{name}` must not contain a path separator"
            )));
        }
        if self.buffer_mode && self.batch_soft_threshold == 0 {
            return Err(Error::InvalidConfig(
                "batch_soft_threshold must be positive in buffer mode".to_string(),
            ));
        }
        self.queue
            .validate()
            .map_err(|e| Error::InvalidConfig(format!("queue: {e}")))?;

        Ok(())
    }

    /// The configured encoding, falling back to UTF-8 for unknown labels.
    pub fn resolved_encoding(&self) -> &'static Encoding {
        Encoding::for_label(self.encoding.as_bytes()).unwrap_or(encoding_rs::UTF_8)
    }

    /// Rotation settings derived from this configuration.
    pub fn rotation_settings(&self) -> RotationSettings {
        RotationSettings {
            dir: self.dir.clone(),
            naming: FileNaming::new(self.naming)
                .with_prefix(self.prefix.as_deref())
                .with_extension(&self.extension)
                .with_custom_name(self.file_name.as_deref()),
            max_file_size: self.max_file_size,
            max_file_count: self.max_file_count,
            encoding: self.resolved_encoding(),
        }
    }

    /// Sets the file stamp prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets the file extension.
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Sets the naming mode.
    #[must_use]
    pub const fn with_naming(mut self, naming: NamingMode) -> Self {
        self.naming = naming;
        self
    }

    /// Uses a fixed file name.
    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Sets the encoding label.
    #[must_use]
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Sets the size rotation limit.
    #[must_use]
    pub const fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Sets the retention count.
    #[must_use]
    pub const fn with_max_file_count(mut self, max_file_count: usize) -> Self {
        self.max_file_count = max_file_count;
        self
    }

    /// Selects the async (consumer thread) or sync write path.
    #[must_use]
    pub const fn with_async_mode(mut self, async_mode: bool) -> Self {
        self.async_mode = async_mode;
        self
    }

    /// Sets the queue capacity policy.
    #[must_use]
    pub const fn with_queue(mut self, queue: CapacityConfig) -> Self {
        self.queue = queue;
        self
    }

    /// Enables or disables batching.
    #[must_use]
    pub const fn with_buffer_mode(mut self, buffer_mode: bool) -> Self {
        self.buffer_mode = buffer_mode;
        self
    }

    /// Sets the batch thresholds.
    #[must_use]
    pub const fn with_batch_limits(mut self, soft_threshold: usize, hard_ceiling: usize) -> Self {
        self.batch_soft_threshold = soft_threshold;
        self.batch_hard_ceiling = hard_ceiling;
        self
    }

    /// Enables or disables newline termination.
    #[must_use]
    pub const fn with_line_mode(mut self, line_mode: bool) -> Self {
        self.line_mode = line_mode;
        self
    }

    /// Enables or disables verbose tracing.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Enables or disables the startup sweep.
    #[must_use]
    pub const fn with_sweep_on_start(mut self, sweep_on_start: bool) -> Self {
        self.sweep_on_start = sweep_on_start;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_defaults() {
        let config = LogWriterConfig::default();

        assert_eq!(config.max_file_size, 5 * 1024 * 1024);
        assert_eq!(config.max_file_count, 5);
        assert_eq!(config.queue.capacity, 10);
        assert_eq!(config.queue.max_capacity, 100);
        assert!(config.queue.auto_grow);
        assert!(config.async_mode);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = LogWriterConfig::from_toml_str(
            r#"
            dir = "/var/log/app"
            prefix = "app"
            naming = "timestamp"
            max_file_size = 1024
            async_mode = false

            [queue]
            capacity = 2
            waiting_disabled_on_full = true
            "#,
        )
        .unwrap();

        assert_eq!(config.dir, PathBuf::from("/var/log/app"));
        assert_eq!(config.naming, NamingMode::Timestamp);
        assert_eq!(config.max_file_size, 1024);
        assert!(!config.async_mode);
        assert_eq!(config.queue.capacity, 2);
        assert!(config.queue.waiting_disabled_on_full);
        assert_eq!(config.max_file_count, DEFAULT_MAX_FILE_COUNT);
    }

    #[test]
    fn test_partial_queue_table_keeps_growth() {
        let config = LogWriterConfig::from_toml_str(
            r#"
            [queue]
            capacity = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.queue.capacity, 4);
        assert_eq!(config.queue.max_capacity, 100);
        assert!(config.queue.auto_grow);

        let config = LogWriterConfig::from_toml_str("[queue]\nauto_grow = false").unwrap();
        assert!(!config.queue.auto_grow);
        assert_eq!(config.queue.capacity, 10);
    }

    #[test]
    fn test_malformed_toml() {
        assert_matches!(
            LogWriterConfig::from_toml_str("max_file_size = \"big\""),
            Err(Error::Parse(_))
        );
    }

    #[test]
    fn test_invalid_values() {
        assert_matches!(
            LogWriterConfig::new("logs").with_encoding("klingon").validate(),
            Err(Error::InvalidConfig(_))
        );
        assert_matches!(
            LogWriterConfig::new("").validate(),
            Err(Error::InvalidConfig(_))
        );
        assert_matches!(
            LogWriterConfig::new("logs")
                .with_file_name("a/b.txt")
                .validate(),
            Err(Error::InvalidConfig(_))
        );
        assert_matches!(
            LogWriterConfig::new("logs")
                .with_queue(CapacityConfig::new(50).with_max_capacity(5))
                .validate(),
            Err(Error::InvalidConfig(_))
        );
    }

    #[test]
    fn test_rotation_settings() {
        let settings = LogWriterConfig::new("logs")
            .with_prefix("svc")
            .with_extension("log")
            .with_encoding("windows-1252")
            .rotation_settings();

        assert_eq!(settings.naming.extension(), ".log");
        assert_eq!(settings.encoding, encoding_rs::WINDOWS_1252);
    }
}
