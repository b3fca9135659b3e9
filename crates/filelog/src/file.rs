//! A single text log file with an incrementally tracked size.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8};
use tracing::debug;

use crate::error::{Error, Result};
use crate::naming;

/// A text file written in append (or truncate) mode.
///
/// The size is read from disk once, when the file is opened, and then
/// advanced by every write. The handle is opened lazily and flushed after
/// every write.
pub struct LogFile {
    path: PathBuf,
    size: u64,
    encoding: &'static Encoding,
    writer: Option<BufWriter<File>>,
}

impl LogFile {
    /// Binds to `path` without touching the file. An existing file's size is
    /// picked up from its metadata.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

        Self {
            path,
            size,
            encoding: UTF_8,
            writer: None,
        }
    }

    /// Creates (or truncates) the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be created.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let mut file = Self::open(path);
        file.clear()?;
        Ok(file)
    }

    /// Sets the encoding text is converted to before it hits the disk.
    #[must_use]
    pub const fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Writes `text`, appending or replacing the current content. Returns
    /// the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be opened or written.
    pub fn write(&mut self, text: &str, append: bool) -> Result<usize> {
        if !append {
            self.clear()?;
        }

        let (bytes, _, _) = self.encoding.encode(text);
        let written = {
            let writer = self.writer()?;
            writer.write_all(&bytes).and_then(|()| writer.flush())
        };
        written.map_err(|e| Error::io(&self.path, e))?;

        self.size += bytes.len() as u64;
        Ok(bytes.len())
    }

    /// Writes each line followed by a newline.
    ///
    /// # Errors
    ///
    /// See [`write`](Self::write).
    pub fn write_lines<S: AsRef<str>>(&mut self, lines: &[S], append: bool) -> Result<usize> {
        let mut text = String::new();
        for line in lines {
            text.push_str(line.as_ref());
            text.push('\n');
        }
        self.write(&text, append)
    }

    /// Opens the handle, creating an empty file if none exists. Existing
    /// content is kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be created.
    pub fn touch(&mut self) -> Result<()> {
        self.writer().map(|_| ())
    }

    /// Truncates the file to zero length, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be created.
    pub fn clear(&mut self) -> Result<()> {
        self.writer = None;
        File::create(&self.path).map_err(|e| Error::io(&self.path, e))?;
        self.size = 0;
        Ok(())
    }

    /// Size in bytes as tracked by this handle.
    #[must_use]
    pub const fn length(&self) -> u64 {
        self.size
    }

    /// Path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name component of the path.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Whether the file exists on disk.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Whether the file name carries the locked marker.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        naming::is_locked(&self.path)
    }

    /// Reads and decodes the whole file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read.
    pub fn read_text(&self) -> Result<String> {
        let bytes = fs::read(&self.path).map_err(|e| Error::io(&self.path, e))?;
        let (text, _, _) = self.encoding.decode(&bytes);
        Ok(text.into_owned())
    }

    /// Reads and decodes the whole file, split into lines.
    ///
    /// # Errors
    ///
    /// See [`read_text`](Self::read_text).
    pub fn read_lines(&self) -> Result<Vec<String>> {
        Ok(self.read_text()?.lines().map(ToString::to_string).collect())
    }

    /// Moves the file. Later writes go to the new path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the rename fails; the handle keeps its old path.
    pub fn rename_to(&mut self, new_path: impl Into<PathBuf>) -> Result<()> {
        let new_path = new_path.into();
        self.close()?;
        fs::rename(&self.path, &new_path).map_err(|e| Error::io(&self.path, e))?;

        debug!(from = %self.path.display(), to = %new_path.display(), "renamed log file");
        self.path = new_path;
        Ok(())
    }

    /// Removes the file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be removed.
    pub fn delete(mut self) -> Result<()> {
        self.writer = None;
        fs::remove_file(&self.path).map_err(|e| Error::io(&self.path, e))
    }

    /// Flushes and releases the handle. The next write reopens it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if buffered bytes cannot be flushed.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| Error::io(&self.path, e))?;
        }
        Ok(())
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)
                    .map_err(|e| Error::io(&self.path, e))?;
                BufWriter::new(file)
            }
        };

        Ok(self.writer.insert(writer))
    }
}

impl std::fmt::Debug for LogFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogFile")
            .field("path", &self.path)
            .field("size", &self.size)
            .field("encoding", &self.encoding.name())
            .field("open", &self.writer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_tracks_length() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut file = LogFile::open(dir.path().join("a.txt"));

        assert!(!file.exists());
        assert_eq!(file.write("hello\n", true).unwrap(), 6);
        assert_eq!(file.write("world\n", true).unwrap(), 6);

        assert!(file.exists());
        assert_eq!(file.length(), 12);
        assert_eq!(file.read_lines().unwrap(), vec!["hello", "world"]);
    }

    #[test]
    fn test_overwrite_resets_length() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut file = LogFile::open(dir.path().join("a.txt"));

        file.write("first line\n", true).unwrap();
        file.write("x", false).unwrap();

        assert_eq!(file.length(), 1);
        assert_eq!(file.read_text().unwrap(), "x");
    }

    #[test]
    fn test_open_picks_up_existing_size() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("a.txt");
        fs::write(&path, "0123456789").unwrap();

        let mut file = LogFile::open(&path);
        assert_eq!(file.length(), 10);

        file.write_lines(&["ab", "cd"], true).unwrap();
        assert_eq!(file.length(), 16);
    }

    #[test]
    fn test_rename_keeps_writing_to_new_path() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut file = LogFile::create(dir.path().join("a.txt")).unwrap();
        file.write("one\n", true).unwrap();

        file.rename_to(dir.path().join("b.txt")).unwrap();
        file.write("two\n", true).unwrap();

        assert!(!dir.path().join("a.txt").exists());
        assert_eq!(file.file_name(), "b.txt");
        assert_eq!(file.read_lines().unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn test_encoding_round_trip() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut file =
            LogFile::open(dir.path().join("a.txt")).with_encoding(encoding_rs::WINDOWS_1252);

        file.write("café\n", true).unwrap();

        assert_eq!(file.length(), 5);
        assert_eq!(fs::read(file.path()).unwrap(), b"caf\xe9\n");
        assert_eq!(file.read_text().unwrap(), "café\n");
    }

    #[test]
    fn test_touch_creates_without_truncating() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut fresh = LogFile::open(dir.path().join("new.txt"));
        fresh.touch().unwrap();

        assert!(fresh.exists());
        assert_eq!(fs::metadata(fresh.path()).unwrap().len(), 0);

        let path = dir.path().join("old.txt");
        fs::write(&path, "kept").unwrap();
        let mut existing = LogFile::open(&path);
        existing.touch().unwrap();

        assert_eq!(existing.length(), 4);
        assert_eq!(fs::read_to_string(&path).unwrap(), "kept");
    }

    #[test]
    fn test_delete_removes_file() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("a.txt");
        let mut file = LogFile::open(&path);
        file.write("x", true).unwrap();

        file.delete().unwrap();
        assert!(!path.exists());
    }
}
