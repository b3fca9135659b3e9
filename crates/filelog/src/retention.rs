//! Retention sweep: keeps at most N unlocked log files in a directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::naming;

/// A log file found in the log directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileEntry {
    /// Full path.
    pub path: PathBuf,
    /// File name.
    pub name: String,
    /// Last modification time.
    pub modified: SystemTime,
    /// Size in bytes.
    pub len: u64,
}

/// Lists the unlocked regular files in `dir`, oldest first.
///
/// A missing directory has no files.
///
/// # Errors
///
/// Returns [`Error::Io`] if the directory exists but cannot be read.
pub fn list_log_files(dir: &Path) -> Result<Vec<LogFileEntry>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io(dir, e)),
    };

    let mut files: Vec<LogFileEntry> = entries
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            if !metadata.is_file() {
                return None;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if naming::is_locked_name(&name) {
                return None;
            }
            Some(LogFileEntry {
                path: entry.path(),
                name,
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                len: metadata.len(),
            })
        })
        .collect();

    files.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.name.cmp(&b.name)));
    Ok(files)
}

/// Deletes the oldest unlocked files in `dir` until at most `max_files`
/// remain. `keep` (the active file) is never deleted. `max_files == 0`
/// disables the sweep. Returns how many files were deleted.
///
/// A file that cannot be deleted is logged and skipped.
///
/// # Errors
///
/// Returns [`Error::Io`] if the directory cannot be listed.
pub fn sweep(dir: &Path, max_files: usize, keep: Option<&Path>) -> Result<usize> {
    if max_files == 0 {
        return Ok(0);
    }

    let files = list_log_files(dir)?;
    let excess = files.len().saturating_sub(max_files);
    if excess == 0 {
        return Ok(0);
    }

    let mut deleted = 0;
    for file in files
        .iter()
        .filter(|file| keep.is_none_or(|keep| file.path != keep))
        .take(excess)
    {
        match fs::remove_file(&file.path) {
            Ok(()) => {
                deleted += 1;
                debug!(path = %file.path.display(), "removed old log file");
            }
            Err(e) => {
                warn!(path = %file.path.display(), error = %e, "failed to remove old log file");
            }
        }
    }

    if deleted > 0 {
        info!(dir = %dir.display(), deleted, max_files, "retention sweep finished");
    }
    Ok(deleted)
}

/// Runs [`sweep`] on a short-lived background thread.
///
/// # Errors
///
/// Returns [`Error::Io`] if the thread cannot be spawned.
pub fn sweep_in_background(
    dir: PathBuf,
    max_files: usize,
    keep: Option<PathBuf>,
) -> Result<JoinHandle<usize>> {
    let spawn_dir = dir.clone();
    thread::Builder::new()
        .name("filelog-retention".to_string())
        .spawn(move || match sweep(&dir, max_files, keep.as_deref()) {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!(error = %e, "retention sweep failed");
                0
            }
        })
        .map_err(|e| Error::io(spawn_dir, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = TempDir::new().expect("Failed to create temp dir");

        assert!(list_log_files(&dir.path().join("nope")).unwrap().is_empty());
        assert_eq!(sweep(&dir.path().join("nope"), 1, None).unwrap(), 0);
    }

    #[test]
    fn test_zero_disables_sweep() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        for i in 0..4 {
            fs::write(dir.path().join(format!("{i}.txt")), "x").unwrap();
        }

        assert_eq!(sweep(dir.path(), 0, None).unwrap(), 0);
        assert_eq!(list_log_files(dir.path()).unwrap().len(), 4);
    }

    #[test]
    fn test_directories_and_locked_files_are_not_listed() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("locked_1.txt"), "x").unwrap();
        fs::write(dir.path().join("2.txt"), "x").unwrap();

        let names: Vec<_> = list_log_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["2.txt"]);
    }
}
