//! Log file naming: date or timestamp stamps, optional prefix, locked marker.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::clock::Clock;

/// Default file extension.
pub const DEFAULT_EXTENSION: &str = ".txt";

/// Marker segment that protects a file from the retention sweep.
pub const LOCKED_MARKER: &str = "locked";

/// Which stamp a new log file is named after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingMode {
    /// `YYYYMMDD`: one file per day.
    #[default]
    Date,
    /// `YYYYMMDD_HHMMSS`: one file per start.
    Timestamp,
}

/// Builds log file names from a clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNaming {
    prefix: Option<String>,
    extension: String,
    mode: NamingMode,
    custom: Option<String>,
}

impl Default for FileNaming {
    fn default() -> Self {
        Self {
            prefix: None,
            extension: DEFAULT_EXTENSION.to_string(),
            mode: NamingMode::Date,
            custom: None,
        }
    }
}

impl FileNaming {
    /// Creates naming rules for the given mode with the default extension.
    #[must_use]
    pub fn new(mode: NamingMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Puts `prefix-` before every stamp. Blank prefixes are ignored.
    #[must_use]
    pub fn with_prefix(mut self, prefix: Option<&str>) -> Self {
        self.prefix = prefix
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(ToString::to_string);
        self
    }

    /// Sets the extension. A missing leading dot is added.
    #[must_use]
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = normalize_extension(extension);
        self
    }

    /// Uses a fixed file name instead of a stamp. Disables the date check.
    #[must_use]
    pub fn with_custom_name(mut self, name: Option<&str>) -> Self {
        self.custom = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(ToString::to_string);
        self
    }

    /// Naming mode.
    #[must_use]
    pub const fn mode(&self) -> NamingMode {
        self.mode
    }

    /// Extension, including the leading dot.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Fixed file name, if configured.
    #[must_use]
    pub fn custom_name(&self) -> Option<&str> {
        self.custom.as_deref()
    }

    /// Whether a date change should rotate the active file.
    #[must_use]
    pub const fn rotates_daily(&self) -> bool {
        self.custom.is_none()
    }

    /// Name of the file a fresh writer should open.
    #[must_use]
    pub fn initial_name(&self, clock: &dyn Clock) -> String {
        if let Some(custom) = &self.custom {
            return custom.clone();
        }

        let stamp = match self.mode {
            NamingMode::Date => clock.date_stamp(),
            NamingMode::Timestamp => clock.timestamp(),
        };
        self.stamped(&stamp, 0)
    }

    /// Name for a file opened after the size limit was crossed.
    ///
    /// Always timestamp-based; `sequence > 0` appends `_N`.
    #[must_use]
    pub fn rotated_name(&self, clock: &dyn Clock, sequence: u32) -> String {
        self.stamped(&clock.timestamp(), sequence)
    }

    /// Name for a file opened after a date change.
    #[must_use]
    pub fn daily_name(&self, clock: &dyn Clock, sequence: u32) -> String {
        let stamp = match self.mode {
            NamingMode::Date => clock.date_stamp(),
            NamingMode::Timestamp => clock.timestamp(),
        };
        self.stamped(&stamp, sequence)
    }

    fn stamped(&self, stamp: &str, sequence: u32) -> String {
        let mut name = String::new();
        if let Some(prefix) = &self.prefix {
            name.push_str(prefix);
            name.push('-');
        }
        name.push_str(stamp);
        if sequence > 0 {
            name.push('_');
            name.push_str(&sequence.to_string());
        }
        name.push_str(&self.extension);
        name
    }
}

fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim();
    if trimmed.is_empty() || trimmed.starts_with('.') {
        trimmed.to_string()
    } else {
        format!(".{trimmed}")
    }
}

/// Whether a file name carries the locked marker as one of its segments.
#[must_use]
pub fn is_locked_name(name: &str) -> bool {
    name.split(['_', '-', '.'])
        .any(|segment| segment.eq_ignore_ascii_case(LOCKED_MARKER))
}

/// Whether the file at `path` is locked.
#[must_use]
pub fn is_locked(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(is_locked_name)
}

/// Path the file at `path` is renamed to when locked.
#[must_use]
pub fn locked_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{LOCKED_MARKER}_{name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Local, TimeZone};

    fn clock() -> ManualClock {
        ManualClock::new(Local.with_ymd_and_hms(2024, 5, 17, 13, 4, 59).unwrap())
    }

    #[test]
    fn test_date_and_timestamp_names() {
        let clock = clock();

        assert_eq!(FileNaming::default().initial_name(&clock), "20240517.txt");
        assert_eq!(
            FileNaming::new(NamingMode::Timestamp).initial_name(&clock),
            "20240517_130459.txt"
        );
    }

    #[test]
    fn test_prefix_and_extension() {
        let clock = clock();
        let naming = FileNaming::default()
            .with_prefix(Some(" app "))
            .with_extension("log");

        assert_eq!(naming.initial_name(&clock), "app-20240517.log");
        assert_eq!(naming.rotated_name(&clock, 0), "app-20240517_130459.log");
        assert_eq!(naming.rotated_name(&clock, 2), "app-20240517_130459_2.log");
    }

    #[test]
    fn test_blank_prefix_is_ignored() {
        let naming = FileNaming::default().with_prefix(Some("   "));

        assert_eq!(naming.initial_name(&clock()), "20240517.txt");
    }

    #[test]
    fn test_custom_name_disables_daily_rotation() {
        let naming = FileNaming::default().with_custom_name(Some("fixed.log"));

        assert_eq!(naming.initial_name(&clock()), "fixed.log");
        assert!(!naming.rotates_daily());
        assert!(FileNaming::default().rotates_daily());
    }

    #[test]
    fn test_locked_marker() {
        assert!(is_locked_name("locked_20240517.txt"));
        assert!(is_locked_name("app-20240517-locked.txt"));
        assert!(!is_locked_name("unlocked20240517.txt"));
        assert!(!is_locked_name("20240517.txt"));

        let path = Path::new("/tmp/logs/20240517.txt");
        assert_eq!(locked_path(path), Path::new("/tmp/logs/locked_20240517.txt"));
        assert!(is_locked(&locked_path(path)));
    }
}
