//! Pipes standard input into rotating log files.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use proven_filelog::{Delivery, LogLevel, LogWriter, LogWriterConfig, NamingMode};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding the log files
    #[arg(long, env = "FILELOG_DIR")]
    dir: Option<PathBuf>,

    /// TOML configuration file; flags override its values
    #[arg(long, env = "FILELOG_CONFIG")]
    config: Option<PathBuf>,

    /// Prefix placed before every file stamp
    #[arg(long)]
    prefix: Option<String>,

    /// Name files by start time instead of by day
    #[arg(long, default_value_t = false)]
    timestamp_names: bool,

    /// Write on the reading thread instead of a consumer thread
    #[arg(long, default_value_t = false)]
    sync: bool,

    /// Size in bytes after which a new file is started (0 disables)
    #[arg(long)]
    max_file_size: Option<u64>,

    /// Unlocked files to keep (0 disables the sweep)
    #[arg(long)]
    max_files: Option<usize>,

    /// Batch input and write it in larger chunks
    #[arg(long, default_value_t = false)]
    buffer: bool,

    /// Drop lines instead of blocking when the queue is full
    #[arg(long, default_value_t = false)]
    drop_on_full: bool,

    /// Format every line as `<time> <thread> <level>/<tag>: <text>` with this tag
    #[arg(long)]
    tag: Option<String>,

    /// Level used with `--tag`
    #[arg(long, default_value = "i")]
    level: LogLevel,

    /// Lock the file written to once input ends
    #[arg(long, default_value_t = false)]
    lock: bool,

    /// Verbose queue and worker tracing
    #[arg(long, default_value_t = false)]
    debug: bool,
}

impl Args {
    fn into_config(self) -> Result<LogWriterConfig> {
        let mut config = match &self.config {
            Some(path) => LogWriterConfig::from_file(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            None => LogWriterConfig::default(),
        };

        if let Some(dir) = self.dir {
            config.dir = dir;
        }
        if let Some(prefix) = self.prefix {
            config.prefix = Some(prefix);
        }
        if self.timestamp_names {
            config.naming = NamingMode::Timestamp;
        }
        if self.sync {
            config.async_mode = false;
        }
        if let Some(max_file_size) = self.max_file_size {
            config.max_file_size = max_file_size;
        }
        if let Some(max_files) = self.max_files {
            config.max_file_count = max_files;
        }
        if self.buffer {
            config.buffer_mode = true;
        }
        if self.drop_on_full {
            config.queue.waiting_disabled_on_full = true;
        }
        if self.debug {
            config.debug = true;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let tag = args.tag.clone();
    let level = args.level;
    let lock = args.lock;
    let config = args.into_config()?;

    let writer = LogWriter::new(config).context("Failed to create log writer")?;
    info!(dir = %writer.config().dir.display(), "writing stdin to log files");

    let mut dropped = 0u64;
    let mut lines = 0u64;
    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let delivery = match &tag {
            Some(tag) => writer.print_log(level, tag, &line),
            None => writer.append_line(&line),
        };

        match delivery {
            Ok(Delivery::Dropped) => dropped += 1,
            Ok(_) => lines += 1,
            Err(e) => warn!(error = %e, "failed to write line"),
        }
    }

    writer.shutdown().context("Failed to shut down log writer")?;

    if lock {
        match writer.lock_current_file()? {
            Some(path) => info!(path = %path.display(), "locked log file"),
            None => debug!("nothing to lock"),
        }
    }

    info!(lines, dropped, "input finished");
    Ok(())
}
