//! The active log file and its date/size rotation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use encoding_rs::{Encoding, UTF_8};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::file::LogFile;
use crate::naming::{self, FileNaming};
use crate::retention;

/// Upper bound on `_N` suffixes tried for one stamp.
const MAX_SEQUENCE: u32 = 10_000;

/// Where and how log files are created and rotated.
#[derive(Debug, Clone)]
pub struct RotationSettings {
    /// Directory holding every log file.
    pub dir: PathBuf,
    /// File naming rules.
    pub naming: FileNaming,
    /// Size after which the active file is replaced. Zero disables it.
    pub max_file_size: u64,
    /// Unlocked files kept by the retention sweep. Zero disables it.
    pub max_file_count: usize,
    /// Encoding of written text.
    pub encoding: &'static Encoding,
}

impl RotationSettings {
    /// Settings for `dir` with default naming and no limits.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            naming: FileNaming::default(),
            max_file_size: 0,
            max_file_count: 0,
            encoding: UTF_8,
        }
    }
}

/// Owns the active [`LogFile`] and swaps it out when the date changes or
/// the size limit is crossed.
///
/// Every rotation triggers a background retention sweep.
#[derive(Debug)]
pub struct RotatingFile {
    settings: RotationSettings,
    clock: Arc<dyn Clock>,
    current: Option<LogFile>,
}

impl RotatingFile {
    /// Creates a rotating file. Nothing touches the disk until the first write.
    pub fn new(settings: RotationSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            clock,
            current: None,
        }
    }

    /// Rotation settings.
    pub const fn settings(&self) -> &RotationSettings {
        &self.settings
    }

    /// Path of the active file, once one has been opened.
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(LogFile::path)
    }

    /// Size of the active file as tracked by its handle.
    pub fn current_len(&self) -> u64 {
        self.current.as_ref().map_or(0, LogFile::length)
    }

    /// Creates the log directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CreateDir`] if the directory cannot be created.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.settings.dir).map_err(|source| Error::CreateDir {
            path: self.settings.dir.clone(),
            source,
        })
    }

    /// Opens the active file if none is open yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CreateDir`] if the directory cannot be created.
    pub fn ensure_file(&mut self) -> Result<&mut LogFile> {
        self.ensure_dir()?;

        let file = match self.current.take() {
            Some(file) => file,
            None => {
                let name = self.settings.naming.initial_name(self.clock.as_ref());
                let file = self.open_file(self.settings.dir.join(name));
                debug!(path = %file.path().display(), "opened log file");
                file
            }
        };

        Ok(self.current.insert(file))
    }

    /// Appends `text` to the active file, rotating first if the date changed
    /// and afterwards if the file grew past the size limit.
    ///
    /// # Errors
    ///
    /// Returns the directory or write failure. A failed rotation after a
    /// successful write is only logged.
    pub fn write(&mut self, text: &str) -> Result<usize> {
        self.rotate_if_new_day()?;
        let written = self.ensure_file()?.write(text, true)?;

        if let Err(e) = self.rotate_if_oversized() {
            warn!(error = %e, "size rotation failed");
        }

        Ok(written)
    }

    /// Runs both rotation checks without writing. Returns whether a new
    /// file was created.
    ///
    /// # Errors
    ///
    /// Returns the failure to create the new file or its directory.
    pub fn rotate_if_needed(&mut self) -> Result<bool> {
        let by_date = self.rotate_if_new_day()?;
        let by_size = self.rotate_if_oversized()?;
        Ok(by_date || by_size)
    }

    /// Renames the active file with the locked marker so the retention sweep
    /// skips it. The next write opens a fresh file. Returns the locked path,
    /// or `None` if there was nothing on disk to lock.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the rename fails.
    pub fn lock_current(&mut self) -> Result<Option<PathBuf>> {
        let Some(mut file) = self.current.take() else {
            return Ok(None);
        };
        if !file.exists() {
            return Ok(None);
        }
        if file.is_locked() {
            let path = file.path().to_path_buf();
            self.current = Some(file);
            return Ok(Some(path));
        }

        let target = naming::locked_path(file.path());
        if let Err(e) = file.rename_to(&target) {
            self.current = Some(file);
            return Err(e);
        }

        info!(path = %target.display(), "locked log file");
        Ok(Some(target))
    }

    /// Flushes and releases the active handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if buffered bytes cannot be flushed.
    pub fn close(&mut self) -> Result<()> {
        self.current.as_mut().map_or(Ok(()), LogFile::close)
    }

    fn rotate_if_new_day(&mut self) -> Result<bool> {
        if !self.settings.naming.rotates_daily() {
            return Ok(false);
        }
        let Some(current) = &self.current else {
            return Ok(false);
        };

        let today = self.clock.date_stamp();
        if current.file_name().contains(&today) {
            return Ok(false);
        }

        let naming = self.settings.naming.clone();
        let clock = Arc::clone(&self.clock);
        self.rotate(|sequence| naming.daily_name(clock.as_ref(), sequence), "date")?;
        Ok(true)
    }

    fn rotate_if_oversized(&mut self) -> Result<bool> {
        let limit = self.settings.max_file_size;
        if limit == 0 || self.current_len() <= limit {
            return Ok(false);
        }

        let naming = self.settings.naming.clone();
        let clock = Arc::clone(&self.clock);
        self.rotate(|sequence| naming.rotated_name(clock.as_ref(), sequence), "size")?;
        Ok(true)
    }

    fn rotate(&mut self, name_for: impl Fn(u32) -> String, reason: &str) -> Result<()> {
        self.ensure_dir()?;
        let path = self.next_free_path(name_for)?;

        if let Some(mut previous) = self.current.take()
            && let Err(e) = previous.close()
        {
            warn!(error = %e, "failed to flush rotated log file");
        }

        let mut file = self.open_file(path);
        let created = file.touch();
        let keep = file.path().to_path_buf();
        self.current = Some(file);
        created?;
        info!(path = %keep.display(), reason, "rotated log file");

        if self.settings.max_file_count > 0
            && let Err(e) = retention::sweep_in_background(
                self.settings.dir.clone(),
                self.settings.max_file_count,
                Some(keep),
            )
        {
            warn!(error = %e, "failed to start retention sweep");
        }

        Ok(())
    }

    /// First candidate name not taken by a non-empty file.
    fn next_free_path(&self, name_for: impl Fn(u32) -> String) -> Result<PathBuf> {
        let active = self.current_path();

        for sequence in 0..=MAX_SEQUENCE {
            let path = self.settings.dir.join(name_for(sequence));
            let taken = active == Some(path.as_path())
                || fs::metadata(&path).is_ok_and(|m| m.len() > 0);
            if !taken {
                return Ok(path);
            }
        }

        Err(Error::InvalidConfig(format!(
            "no free log file name in {} after {MAX_SEQUENCE} attempts",
            self.settings.dir.display()
        )))
    }

    fn open_file(&self, path: PathBuf) -> LogFile {
        LogFile::open(path).with_encoding(self.settings.encoding)
    }
}
